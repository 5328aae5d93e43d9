mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const TMDB_API_KEY_ENV: &str = "SCENECATALOG_TMDB_API_KEY";
const RECOGNIZER_API_KEY_ENV: &str = "SCENECATALOG_RECOGNIZER_API_KEY";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    prepare(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./scenecatalog.toml",
        "./config.toml",
        "~/.config/scenecatalog/config.toml",
        "/etc/scenecatalog/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    prepare(&mut config);
    Ok(config)
}

/// Expand `~` in paths and apply secrets from the environment.
fn prepare(config: &mut Config) {
    config.database.path = expand(&config.database.path);
    if let Some(ref share) = config.storage.share_path {
        config.storage.share_path = Some(expand(share));
    }

    if let Some(key) = env_secret(TMDB_API_KEY_ENV) {
        config.tmdb.api_key = Some(key);
    }
    if let Some(key) = env_secret(RECOGNIZER_API_KEY_ENV) {
        config.recognizer.api_key = Some(key);
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.scheduler.max_concurrency == 0 {
        anyhow::bail!("scheduler.max_concurrency must be at least 1");
    }
    if config.scheduler.max_retries == 0 {
        anyhow::bail!("scheduler.max_retries must be at least 1");
    }

    let thresholds = [
        ("resolver.exact_threshold", config.resolver.exact_threshold),
        ("resolver.fuzzy_threshold", config.resolver.fuzzy_threshold),
        (
            "resolver.recognizer_threshold",
            config.resolver.recognizer_threshold,
        ),
        ("resolver.ai_threshold", config.resolver.ai_threshold),
        ("resolver.web_threshold", config.resolver.web_threshold),
        ("resolver.acceptance_floor", config.resolver.acceptance_floor),
        (
            "identity.submit_min_confidence",
            config.identity.submit_min_confidence,
        ),
    ];
    for (name, value) in thresholds {
        if !(0.0..=1.0).contains(&value) {
            anyhow::bail!("{} must be between 0 and 1 (got {})", name, value);
        }
    }

    if config.identity.prefix_bytes == 0 {
        anyhow::bail!("identity.prefix_bytes must be greater than 0");
    }

    if let Some(ref share) = config.storage.share_path {
        if !share.exists() {
            tracing::warn!("Share path does not exist: {:?}", share);
        }
    }

    if config.tmdb.api_key.is_none() {
        tracing::warn!("No TMDB API key configured; metadata lookups will be skipped");
    }

    if config.recognizer.enabled && config.recognizer.endpoint.is_empty() {
        anyhow::bail!("recognizer is enabled but has no endpoint");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.scheduler.max_concurrency, 4);
        assert_eq!(config.scheduler.retry_delay_ms, 1000);
        assert_eq!(config.resolver.exact_threshold, 0.85);
        assert_eq!(config.identity.strategy, FingerprintStrategy::Content);
        assert_eq!(config.identity.prefix_bytes, 65536);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            share_path = "/mnt/media"
            root_folders = ["Movies", "TV"]

            [scheduler]
            max_concurrency = 2

            [identity]
            strategy = "metadata"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.root_folders, vec!["Movies", "TV"]);
        assert_eq!(config.scheduler.max_concurrency, 2);
        assert_eq!(config.scheduler.max_retries, 3);
        assert_eq!(config.identity.strategy, FingerprintStrategy::Metadata);
        assert_eq!(config.tmdb.language, "en-US");
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.scheduler.max_concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_retries() {
        let mut config = Config::default();
        config.scheduler.max_retries = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let mut config = Config::default();
        config.resolver.fuzzy_threshold = 1.5;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("resolver.fuzzy_threshold"));
    }
}
