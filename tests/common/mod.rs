//! Shared harness for integration tests.
//!
//! [`TestShare`] lays out a fake media share in a temp dir, backed by an
//! in-memory DB, and builds a [`ScanOrchestrator`] over it. Metadata comes
//! from [`CatalogProvider`], a canned provider that answers exact
//! (cleaned) title lookups.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use scenecatalog::config::{Config, FingerprintStrategy};
use scenecatalog::identity::fingerprint::Fingerprinter;
use scenecatalog::identity::IdentityService;
use scenecatalog::metadata::scoring::clean_title;
use scenecatalog::metadata::{
    MatchResolver, MediaDetails, MetadataProvider, ProviderRegistry, Recognition, Recognizer,
    SearchHit,
};
use scenecatalog::scanner::ScanOrchestrator;
use scenecatalog::state::EventBus;
use scenecatalog::storage::{LocalShareStorage, StorageProvider};
use scenecatalog_common::MediaKind;
use scenecatalog_db::models::CatalogItem;
use scenecatalog_db::pool::{get_conn, init_memory_pool, DbPool, PooledConnection};
use scenecatalog_db::queries::items;

/// Metadata provider with a fixed catalog.
#[derive(Default)]
pub struct CatalogProvider {
    hits: Vec<SearchHit>,
    searches: AtomicUsize,
}

impl CatalogProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn movie(self, id: &str, title: &str, year: u16) -> Self {
        self.with_hit(id, title, Some(year), MediaKind::Movie)
    }

    pub fn show(self, id: &str, title: &str, year: u16) -> Self {
        self.with_hit(id, title, Some(year), MediaKind::Tv)
    }

    fn with_hit(mut self, id: &str, title: &str, year: Option<u16>, kind: MediaKind) -> Self {
        self.hits.push(SearchHit {
            id: id.to_string(),
            title: title.to_string(),
            year,
            kind,
            overview: None,
            poster_path: None,
            backdrop_path: None,
            rating: None,
            provider_name: "catalog".to_string(),
        });
        self
    }

    /// Number of search calls served so far.
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    fn search(&self, title: &str, kind: MediaKind) -> Vec<SearchHit> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let wanted = clean_title(title);
        self.hits
            .iter()
            .filter(|hit| hit.kind == kind && clean_title(&hit.title) == wanted)
            .cloned()
            .collect()
    }

    fn details(&self, id: &str) -> anyhow::Result<MediaDetails> {
        let hit = self
            .hits
            .iter()
            .find(|hit| hit.id == id)
            .ok_or_else(|| anyhow::anyhow!("unknown id {id}"))?;

        let mut provider_ids = BTreeMap::new();
        provider_ids.insert("imdb".to_string(), format!("tt{id}"));
        Ok(MediaDetails {
            title: hit.title.clone(),
            original_title: None,
            overview: Some(format!("All about {}", hit.title)),
            genres: vec!["Drama".to_string()],
            year: hit.year,
            rating: Some(7.5),
            poster_url: Some(format!("https://img.example/{id}/poster.jpg")),
            backdrop_url: None,
            provider_ids,
        })
    }
}

#[async_trait]
impl MetadataProvider for CatalogProvider {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn search_movie(&self, title: &str, _year: Option<u16>) -> anyhow::Result<Vec<SearchHit>> {
        Ok(self.search(title, MediaKind::Movie))
    }

    async fn search_tv(&self, title: &str, _year: Option<u16>) -> anyhow::Result<Vec<SearchHit>> {
        Ok(self.search(title, MediaKind::Tv))
    }

    async fn movie_details(&self, provider_id: &str) -> anyhow::Result<MediaDetails> {
        self.details(provider_id)
    }

    async fn tv_details(&self, provider_id: &str) -> anyhow::Result<MediaDetails> {
        self.details(provider_id)
    }
}

/// Recognizer answering from a file-name lookup table.
#[derive(Default)]
pub struct StubRecognizer {
    answers: HashMap<String, Recognition>,
}

impl StubRecognizer {
    pub fn answer(
        mut self,
        file_name: &str,
        clean_title: &str,
        kind: MediaKind,
        year: Option<u16>,
        confidence: f64,
    ) -> Self {
        self.answers.insert(
            file_name.to_string(),
            Recognition {
                clean_title: clean_title.to_string(),
                media_type: kind,
                year,
                confidence,
                alternative_names: Vec::new(),
            },
        );
        self
    }
}

#[async_trait]
impl Recognizer for StubRecognizer {
    async fn recognize(&self, file_name: &str, _path: Option<&str>) -> anyhow::Result<Recognition> {
        self.answers
            .get(file_name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("cannot recognize {file_name}"))
    }
}

/// A fake share on disk plus the catalog database.
pub struct TestShare {
    pub dir: TempDir,
    pub pool: DbPool,
    pub events: Arc<EventBus>,
    pub config: Config,
}

impl TestShare {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let pool = init_memory_pool().expect("failed to create in-memory pool");

        let mut config = Config::default();
        config.storage.share_path = Some(dir.path().to_path_buf());
        config.scheduler.max_concurrency = 2;
        config.scheduler.max_retries = 2;
        config.scheduler.retry_delay_ms = 1;

        Self {
            dir,
            pool,
            events: Arc::new(EventBus::default()),
            config,
        }
    }

    /// Write a file under the share, creating parent folders.
    pub fn add_file(&self, relative: &str, contents: &[u8]) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create folders");
        }
        fs::write(path, contents).expect("failed to write file");
    }

    pub fn storage(&self) -> Arc<dyn StorageProvider> {
        Arc::new(LocalShareStorage::new(self.dir.path()))
    }

    pub fn orchestrator(
        &self,
        provider: Arc<CatalogProvider>,
        recognizer: Option<Arc<dyn Recognizer>>,
    ) -> ScanOrchestrator {
        let mut registry = ProviderRegistry::new();
        registry.register(provider);
        let resolver =
            MatchResolver::from_config(&self.config.resolver, Arc::new(registry), recognizer, None);

        ScanOrchestrator::new(
            &self.config,
            self.storage(),
            self.pool.clone(),
            Arc::new(resolver),
            Arc::clone(&self.events),
        )
    }

    pub fn identity(&self) -> Arc<IdentityService> {
        let fingerprinter = Fingerprinter::new(self.storage(), FingerprintStrategy::Content, 4096);
        Arc::new(IdentityService::new(self.pool.clone(), fingerprinter, Arc::clone(&self.events)))
    }

    pub fn conn(&self) -> PooledConnection {
        get_conn(&self.pool).expect("failed to get db connection")
    }

    /// All catalog items ordered by title.
    pub fn items(&self) -> Vec<CatalogItem> {
        let conn = self.conn();
        let mut all = items::list_items(&conn, None).expect("failed to list items");
        all.sort_by(|a, b| a.title.cmp(&b.title));
        all
    }

    pub fn item_at(&self, relative: &str) -> CatalogItem {
        let wanted = self.dir.path().join(relative);
        let wanted = wanted.to_string_lossy().replace('\\', "/");
        self.items()
            .into_iter()
            .find(|item| item.primary_path == wanted || item.episodes.iter().any(|e| e.path == wanted))
            .unwrap_or_else(|| panic!("no item for {relative}"))
    }
}
