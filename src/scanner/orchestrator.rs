//! Scan state machine.
//!
//! A scan walks `Idle → Connecting → Discovering → Processing → Scraping →
//! Completed`, dropping to `Error` on the first fatal problem. Per-folder and
//! per-item problems are collected in the status instead of aborting. When
//! the scan ends, an identity sweep is started in the background over every
//! item the scan touched.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use scenecatalog_common::ItemId;
use scenecatalog_db::models::CatalogItem;
use scenecatalog_db::pool::{get_conn, DbPool};
use scenecatalog_db::queries::items;
use scenecatalog_db::queries::scan_runs::{self, NewScanRun};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::grouper::MediaGrouper;
use crate::config::{Config, SchedulerConfig, StorageConfig};
use crate::identity::{IdentityService, SweepReport};
use crate::metadata::providers::TmdbProvider;
use crate::metadata::{ChatRecognizer, MatchResolver, ProviderRegistry, Recognizer, ResolutionHandler};
use crate::scheduler::{Priority, SchedulerError, SchedulerEvent, Task, TaskScheduler};
use crate::state::{Event, EventBus, ScanEvent, ScanPhase, ScanStatus};
use crate::storage::{LocalShareStorage, RawFile, StorageError, StorageProvider};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("No share path configured")]
    NotConfigured,

    #[error("Share unreachable: {0}")]
    ShareUnreachable(#[source] StorageError),

    #[error("A scan is already running ({0})")]
    AlreadyRunning(ScanPhase),

    #[error("scan cancelled")]
    Cancelled,

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: ScanPhase, to: ScanPhase },

    #[error(transparent)]
    Database(#[from] scenecatalog_common::Error),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Summary of one scan run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub status: ScanStatus,
    pub files_discovered: u64,
    pub files_skipped: u64,
    pub items_processed: u64,
    pub items_scheduled: u64,
    pub items_resolved: u64,
    pub items_failed: u64,
    pub run_id: Option<i64>,
    #[serde(skip)]
    pub item_ids: Vec<ItemId>,
}

impl ScanReport {
    pub fn succeeded(&self) -> bool {
        self.status.phase == ScanPhase::Completed
    }
}

pub struct ScanOrchestrator {
    storage_config: StorageConfig,
    scheduler_config: SchedulerConfig,
    storage: Arc<dyn StorageProvider>,
    pool: DbPool,
    resolver: Arc<MatchResolver>,
    identity: Option<Arc<IdentityService>>,
    events: Arc<EventBus>,
    grouper: MediaGrouper,
    status: RwLock<ScanStatus>,
    sweep: Mutex<Option<JoinHandle<SweepReport>>>,
}

impl ScanOrchestrator {
    pub fn new(
        config: &Config,
        storage: Arc<dyn StorageProvider>,
        pool: DbPool,
        resolver: Arc<MatchResolver>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            storage_config: config.storage.clone(),
            scheduler_config: config.scheduler.clone(),
            storage,
            pool,
            resolver,
            identity: None,
            events,
            grouper: config
                .storage
                .share_path
                .as_ref()
                .map(MediaGrouper::with_root)
                .unwrap_or_default(),
            status: RwLock::new(ScanStatus::default()),
            sweep: Mutex::new(None),
        }
    }

    /// Wire up the standard stack from configuration: local share storage,
    /// TMDB when an API key is set, the recognizer when enabled, and the
    /// identity service when enabled.
    pub fn from_config(config: &Config, pool: DbPool, events: Arc<EventBus>) -> anyhow::Result<Self> {
        let storage: Arc<dyn StorageProvider> = match config.storage.share_path {
            Some(ref share) => Arc::new(LocalShareStorage::new(share)),
            None => Arc::new(LocalShareStorage::new(PathBuf::new())),
        };

        let mut registry = ProviderRegistry::new();
        match config.tmdb.api_key {
            Some(ref key) => {
                let tmdb = TmdbProvider::new(key.clone(), config.tmdb.language.clone())?
                    .with_base_url(config.tmdb.base_url.clone());
                registry.register(Arc::new(tmdb));
            }
            None => warn!("No TMDB API key configured, provider tiers will find nothing"),
        }

        let recognizer: Option<Arc<dyn Recognizer>> = if config.recognizer.enabled {
            Some(Arc::new(ChatRecognizer::new(&config.recognizer)?))
        } else {
            None
        };

        let resolver =
            MatchResolver::from_config(&config.resolver, Arc::new(registry), recognizer, None);
        info!(tiers = ?resolver.methods(), "Resolver ready");

        let mut orchestrator = Self::new(
            config,
            Arc::clone(&storage),
            pool.clone(),
            Arc::new(resolver),
            Arc::clone(&events),
        );
        if config.identity.enabled {
            let identity = IdentityService::from_config(&config.identity, pool, storage, events)?;
            orchestrator = orchestrator.with_identity(Arc::new(identity));
        }
        Ok(orchestrator)
    }

    pub fn with_identity(mut self, identity: Arc<IdentityService>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Snapshot of the live status.
    pub fn status(&self) -> ScanStatus {
        self.status.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Return a finished scan to `Idle`. Returns false while a scan is active.
    pub fn reset(&self) -> bool {
        let mut status = self.status.write();
        if status.phase == ScanPhase::Idle {
            return true;
        }
        if !status.phase.can_transition_to(ScanPhase::Idle) {
            return false;
        }
        *status = ScanStatus::default();
        true
    }

    /// Run one full scan. Failures end the scan in the `Error` phase and are
    /// reported through the returned status rather than as an `Err`.
    pub async fn scan(&self, cancel: CancellationToken) -> ScanReport {
        let started_at = Utc::now();
        let mut report = ScanReport::default();

        if let Err(e) = self.begin(started_at) {
            warn!(error = %e, "Scan not started");
            report.status = self.status();
            return report;
        }

        match self.run(&cancel, &mut report).await {
            Ok(()) => {
                let status = self.transition(ScanPhase::Completed).map(|_| self.status());
                match status {
                    Ok(status) => {
                        info!(
                            files = report.files_discovered,
                            items = report.items_processed,
                            resolved = report.items_resolved,
                            failed = report.items_failed,
                            "Scan completed"
                        );
                        self.events.broadcast(ScanEvent::ScanCompleted { status });
                    }
                    Err(e) => self.fail(&e),
                }
            }
            Err(e) => self.fail(&e),
        }

        report.status = self.status();
        report.run_id = self.record_run(started_at, &report);
        self.spawn_identity_sweep(report.item_ids.clone());
        report
    }

    /// Wait for the identity sweep started by the last scan, if any.
    pub async fn wait_for_identity_sweep(&self) -> Option<SweepReport> {
        let handle = self.sweep.lock().take()?;
        match handle.await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Identity sweep task failed");
                None
            }
        }
    }

    fn begin(&self, started_at: DateTime<Utc>) -> Result<(), ScanError> {
        let snapshot = {
            let mut status = self.status.write();
            if status.phase != ScanPhase::Idle && !status.phase.is_terminal() {
                return Err(ScanError::AlreadyRunning(status.phase));
            }
            *status = ScanStatus {
                phase: ScanPhase::Connecting,
                start_time: Some(started_at),
                ..ScanStatus::default()
            };
            status.clone()
        };

        info!("Scan started");
        self.events.broadcast(ScanEvent::ScanStarted {
            status: snapshot.clone(),
        });
        self.events.broadcast(ScanEvent::PhaseChanged {
            from: ScanPhase::Idle,
            to: ScanPhase::Connecting,
            status: snapshot,
        });
        Ok(())
    }

    async fn run(&self, cancel: &CancellationToken, report: &mut ScanReport) -> Result<(), ScanError> {
        self.connect().await?;
        checkpoint(cancel)?;

        self.transition(ScanPhase::Discovering)?;
        let files = self.discover(cancel).await?;
        report.files_discovered = files.len() as u64;
        checkpoint(cancel)?;

        self.transition(ScanPhase::Processing)?;
        let pending = self.process(&files, cancel, report)?;
        checkpoint(cancel)?;

        self.transition(ScanPhase::Scraping)?;
        self.scrape(pending, cancel, report).await
    }

    async fn connect(&self) -> Result<(), ScanError> {
        let share = self
            .storage_config
            .share_path
            .as_ref()
            .ok_or(ScanError::NotConfigured)?;
        let shares = self
            .storage
            .discover_shares()
            .await
            .map_err(ScanError::ShareUnreachable)?;
        info!(
            share = %share.display(),
            storage = self.storage.name(),
            shares = shares.len(),
            "Connected to share"
        );
        Ok(())
    }

    async fn discover(&self, cancel: &CancellationToken) -> Result<Vec<RawFile>, ScanError> {
        let roots = if self.storage_config.root_folders.is_empty() {
            vec![String::new()]
        } else {
            self.storage_config.root_folders.clone()
        };
        self.update(|s| s.total = roots.len() as u64);

        let mut files = Vec::new();
        for root in &roots {
            checkpoint(cancel)?;
            let label = if root.is_empty() { "/" } else { root.as_str() };
            self.update(|s| s.current_item = Some(label.to_string()));

            match self.storage.scan_media_files(root).await {
                Ok(found) => {
                    debug!(root = label, files = found.len(), "Discovered folder");
                    files.extend(found);
                }
                Err(e) => {
                    warn!(root = label, error = %e, "Failed to scan folder");
                    self.push_error(format!("{label}: {e}"));
                }
            }
            self.update(|s| s.current += 1);
        }

        info!(folders = roots.len(), files = files.len(), "Discovery finished");
        Ok(files)
    }

    /// Group discovered files and merge them into the catalog. Returns the
    /// items that still need metadata.
    fn process(
        &self,
        files: &[RawFile],
        cancel: &CancellationToken,
        report: &mut ScanReport,
    ) -> Result<Vec<CatalogItem>, ScanError> {
        let grouping = self.grouper.group(files);
        report.files_skipped = grouping.skipped;
        self.update(|s| s.total = grouping.items.len() as u64);

        let conn = get_conn(&self.pool)?;
        let mut pending = Vec::new();

        for scanned in &grouping.items {
            checkpoint(cancel)?;
            self.update(|s| s.current_item = Some(scanned.title.clone()));

            match persist_scanned(&conn, scanned) {
                Ok(stored) => {
                    report.items_processed += 1;
                    report.item_ids.push(stored.id);
                    if !stored.is_enriched() {
                        pending.push(stored);
                    }
                }
                Err(e) => {
                    warn!(path = %scanned.primary_path, error = %e, "Failed to store item");
                    self.push_error(format!("{}: {e}", scanned.primary_path));
                }
            }
            self.update(|s| s.current += 1);
        }

        info!(
            items = report.items_processed,
            pending = pending.len(),
            skipped = report.files_skipped,
            "Processing finished"
        );
        Ok(pending)
    }

    async fn scrape(
        &self,
        pending: Vec<CatalogItem>,
        cancel: &CancellationToken,
        report: &mut ScanReport,
    ) -> Result<(), ScanError> {
        report.items_scheduled = pending.len() as u64;
        self.update(|s| s.total = pending.len() as u64);
        if pending.is_empty() {
            return Ok(());
        }

        let handler = Arc::new(ResolutionHandler::new(
            Arc::clone(&self.resolver),
            self.pool.clone(),
            Arc::clone(&self.events),
            cancel.clone(),
            self.scheduler_config.max_retries,
        ));
        let scheduler: TaskScheduler<CatalogItem> =
            TaskScheduler::new(self.scheduler_config.clone(), handler.clone());
        let mut progress = scheduler.subscribe();

        let mut titles = HashMap::with_capacity(pending.len());
        for item in pending {
            let priority = priority_for(&item);
            let task_id = item.id.to_string();
            titles.insert(task_id.clone(), item.title.clone());
            scheduler.submit(Task::new(task_id, item, priority));
        }

        let started = Instant::now();
        scheduler.start();

        let drained = scheduler.wait_until_drained();
        tokio::pin!(drained);
        let mut progress_open = true;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    let dropped = scheduler.clear_pending();
                    scheduler.stop();
                    info!(dropped, "Scraping cancelled");
                    return Err(ScanError::Cancelled);
                }
                result = &mut drained => {
                    result?;
                    break;
                }
                event = progress.recv(), if progress_open => match event {
                    Ok(SchedulerEvent::TaskStarted { task_id, .. }) => {
                        let title = titles.get(&task_id).cloned();
                        self.update(|s| s.current_item = title);
                    }
                    Ok(SchedulerEvent::TaskCompleted { .. })
                    | Ok(SchedulerEvent::TaskFailed { will_retry: false, .. }) => {
                        self.record_progress(&scheduler, started);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "Progress events lagged"),
                    Err(RecvError::Closed) => progress_open = false,
                },
            }
        }

        scheduler.stop();
        self.record_progress(&scheduler, started);

        for result in handler.results() {
            if result.success {
                report.items_resolved += 1;
            } else {
                report.items_failed += 1;
            }
        }
        info!(
            resolved = report.items_resolved,
            failed = report.items_failed,
            "Scraping finished"
        );
        Ok(())
    }

    fn record_progress(&self, scheduler: &TaskScheduler<CatalogItem>, started: Instant) {
        let counters = scheduler.status();
        let done = counters.completed + counters.failed;
        let elapsed = started.elapsed().as_secs_f64();

        self.update(|s| {
            s.current = done.min(s.total);
            s.estimated_time_remaining = (done > 0).then(|| {
                let per_item = elapsed / done as f64;
                (per_item * s.total.saturating_sub(done) as f64).round() as u64
            });
        });
    }

    fn transition(&self, to: ScanPhase) -> Result<(), ScanError> {
        let (from, snapshot) = {
            let mut status = self.status.write();
            let from = status.phase;
            if !from.can_transition_to(to) {
                return Err(ScanError::InvalidTransition { from, to });
            }
            status.phase = to;
            if to != ScanPhase::Completed {
                status.current = 0;
                status.total = 0;
            }
            status.current_item = None;
            status.estimated_time_remaining = None;
            (from, status.clone())
        };

        debug!(%from, %to, "Scan phase changed");
        self.events.broadcast(ScanEvent::PhaseChanged {
            from,
            to,
            status: snapshot,
        });
        Ok(())
    }

    fn fail(&self, error: &ScanError) {
        let (from, snapshot) = {
            let mut status = self.status.write();
            let from = status.phase;
            if from.can_transition_to(ScanPhase::Error) {
                status.phase = ScanPhase::Error;
            }
            status.errors.push(error.to_string());
            status.current_item = None;
            status.estimated_time_remaining = None;
            (from, status.clone())
        };

        warn!(phase = %from, error = %error, "Scan failed");
        if from != snapshot.phase {
            self.events.broadcast(ScanEvent::PhaseChanged {
                from,
                to: snapshot.phase,
                status: snapshot.clone(),
            });
        }
        self.events.broadcast(ScanEvent::ScanError {
            error: error.to_string(),
            status: snapshot,
        });
    }

    fn record_run(&self, started_at: DateTime<Utc>, report: &ScanReport) -> Option<i64> {
        let phase = report.status.phase.to_string();
        let run = NewScanRun {
            phase: &phase,
            started_at,
            finished_at: Utc::now(),
            files_discovered: report.files_discovered,
            items_processed: report.items_processed,
            items_resolved: report.items_resolved,
            items_failed: report.items_failed,
            errors: &report.status.errors,
        };

        let recorded = get_conn(&self.pool).and_then(|conn| scan_runs::record_scan_run(&conn, &run));
        match recorded {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Failed to record scan run");
                None
            }
        }
    }

    fn spawn_identity_sweep(&self, item_ids: Vec<ItemId>) {
        let Some(identity) = self.identity.clone() else {
            return;
        };
        if item_ids.is_empty() {
            return;
        }

        debug!(items = item_ids.len(), "Starting identity sweep");
        let handle = tokio::spawn(async move { identity.sweep(&item_ids).await });
        *self.sweep.lock() = Some(handle);
    }

    fn update(&self, f: impl FnOnce(&mut ScanStatus)) {
        f(&mut self.status.write());
    }

    fn push_error(&self, error: String) {
        self.status.write().errors.push(error);
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), ScanError> {
    if cancel.is_cancelled() {
        Err(ScanError::Cancelled)
    } else {
        Ok(())
    }
}

/// Known kinds with a year are the easiest to match, so they go first.
fn priority_for(item: &CatalogItem) -> Priority {
    match (item.kind.is_known(), item.year) {
        (true, Some(_)) => Priority::High,
        (true, None) => Priority::Medium,
        _ => Priority::Low,
    }
}

/// Merge a freshly scanned item into its stored row, keeping enrichment.
fn persist_scanned(
    conn: &rusqlite::Connection,
    scanned: &CatalogItem,
) -> scenecatalog_common::Result<CatalogItem> {
    let stored = match items::get_item(conn, scanned.id)? {
        Some(mut existing) => {
            existing.absorb_rescan(scanned);
            existing
        }
        None => scanned.clone(),
    };
    items::upsert_item(conn, &stored)?;
    Ok(stored)
}
