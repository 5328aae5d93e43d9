use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub tmdb: TmdbConfig,

    #[serde(default)]
    pub recognizer: RecognizerConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Mount point of the remote share. Scans fail fast when unset.
    #[serde(default)]
    pub share_path: Option<PathBuf>,

    /// Folders under the share to scan (empty = the whole share)
    #[serde(default)]
    pub root_folders: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("~/.local/share/scenecatalog/catalog.sqlite")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Resolution tasks allowed in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Attempts per task before it is dropped as failed
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before a failed task is re-enqueued
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_max_concurrency() -> usize {
    4
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Confidence thresholds for the resolution tiers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    #[serde(default = "default_exact_threshold")]
    pub exact_threshold: f64,

    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Minimum recognizer confidence before its clean title is re-searched
    #[serde(default = "default_recognizer_threshold")]
    pub recognizer_threshold: f64,

    #[serde(default = "default_ai_threshold")]
    pub ai_threshold: f64,

    #[serde(default = "default_web_threshold")]
    pub web_threshold: f64,

    /// Anything below this is reported as failed
    #[serde(default = "default_acceptance_floor")]
    pub acceptance_floor: f64,
}

fn default_exact_threshold() -> f64 {
    0.85
}
fn default_fuzzy_threshold() -> f64 {
    0.6
}
fn default_recognizer_threshold() -> f64 {
    0.5
}
fn default_ai_threshold() -> f64 {
    0.4
}
fn default_web_threshold() -> f64 {
    0.4
}
fn default_acceptance_floor() -> f64 {
    0.4
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            exact_threshold: default_exact_threshold(),
            fuzzy_threshold: default_fuzzy_threshold(),
            recognizer_threshold: default_recognizer_threshold(),
            ai_threshold: default_ai_threshold(),
            web_threshold: default_web_threshold(),
            acceptance_floor: default_acceptance_floor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    /// TMDB v3 API key (or `SCENECATALOG_TMDB_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
}

fn default_language() -> String {
    "en-US".to_string()
}
fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            language: default_language(),
            base_url: default_tmdb_base_url(),
        }
    }
}

/// OpenAI-compatible chat endpoint used to clean up hard filenames.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecognizerConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_recognizer_endpoint")]
    pub endpoint: String,

    /// Bearer token (or `SCENECATALOG_RECOGNIZER_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_recognizer_model")]
    pub model: String,

    #[serde(default = "default_recognizer_timeout")]
    pub timeout_secs: u64,
}

fn default_recognizer_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_recognizer_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_recognizer_timeout() -> u64 {
    30
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_recognizer_endpoint(),
            api_key: None,
            model: default_recognizer_model(),
            timeout_secs: default_recognizer_timeout(),
        }
    }
}

/// How file fingerprints are computed. One strategy per catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintStrategy {
    /// Hash of the file size and a bounded prefix of its bytes
    #[default]
    Content,
    /// Hash of path, size, and modification time
    Metadata,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub strategy: FingerprintStrategy,

    /// Bytes read from the start of a file by the content strategy
    #[serde(default = "default_prefix_bytes")]
    pub prefix_bytes: usize,

    /// Community hash registry base URL (disabled when unset)
    #[serde(default)]
    pub registry_url: Option<String>,

    #[serde(default = "default_submit_min_confidence")]
    pub submit_min_confidence: f64,
}

fn default_true() -> bool {
    true
}
fn default_prefix_bytes() -> usize {
    64 * 1024
}
fn default_submit_min_confidence() -> f64 {
    0.7
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: FingerprintStrategy::default(),
            prefix_bytes: default_prefix_bytes(),
            registry_url: None,
            submit_min_confidence: default_submit_min_confidence(),
        }
    }
}
