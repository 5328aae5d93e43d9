//! Scheduler handler that resolves catalog items and persists accepted
//! metadata.
//!
//! Only accepted results touch the catalog. A result that fails for the last
//! time marks the item's `match_method` as failed but leaves it enrichable,
//! so the next scan tries again.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use scenecatalog_common::{ItemId, MatchMethod};
use scenecatalog_db::models::CatalogItem;
use scenecatalog_db::pool::{get_conn, DbPool};
use scenecatalog_db::queries::items;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::resolver::{MatchResolver, ResolutionResult};
use crate::scheduler::{Task, TaskHandler};
use crate::state::{EventBus, ScanEvent};

/// Task payload for resolution work.
pub type ResolutionTask = Task<CatalogItem>;

pub struct ResolutionHandler {
    resolver: Arc<MatchResolver>,
    pool: DbPool,
    events: Arc<EventBus>,
    cancel: CancellationToken,
    max_attempts: u32,
    results: DashMap<ItemId, ResolutionResult>,
}

impl ResolutionHandler {
    pub fn new(
        resolver: Arc<MatchResolver>,
        pool: DbPool,
        events: Arc<EventBus>,
        cancel: CancellationToken,
        max_attempts: u32,
    ) -> Self {
        Self {
            resolver,
            pool,
            events,
            cancel,
            max_attempts,
            results: DashMap::new(),
        }
    }

    /// Latest result per item.
    pub fn results(&self) -> Vec<ResolutionResult> {
        self.results.iter().map(|r| r.value().clone()).collect()
    }

    pub fn result(&self, id: ItemId) -> Option<ResolutionResult> {
        self.results.get(&id).map(|r| r.value().clone())
    }

    /// Merge an accepted result into the stored item.
    fn persist_accepted(&self, item: &CatalogItem, result: &ResolutionResult) -> Result<CatalogItem> {
        let conn = get_conn(&self.pool)?;
        let mut current = items::get_item(&conn, item.id)?.unwrap_or_else(|| item.clone());

        if let Some(ref patch) = result.metadata {
            current.apply_patch(patch);
        }
        current.match_confidence = Some(result.confidence);
        current.match_method = Some(result.method);
        items::upsert_item(&conn, &current)?;
        Ok(current)
    }

    fn mark_failed(&self, item: &CatalogItem) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        if let Some(mut current) = items::get_item(&conn, item.id)? {
            if !current.is_enriched() {
                current.match_method = Some(MatchMethod::Failed);
                items::upsert_item(&conn, &current)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TaskHandler<CatalogItem> for ResolutionHandler {
    async fn run(&self, task: &ResolutionTask) -> Result<()> {
        let item = &task.payload;
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        self.events.broadcast(ScanEvent::ItemStarted {
            item_id: item.id,
            title: item.title.clone(),
        });

        let result = self.resolver.resolve(item).await;

        if self.cancel.is_cancelled() {
            debug!(item_id = %item.id, "Scan cancelled, discarding resolution");
            return Ok(());
        }

        if result.success {
            let stored = self.persist_accepted(item, &result)?;
            self.events.broadcast(ScanEvent::ItemCompleted {
                item_id: item.id,
                title: stored.title,
                confidence: result.confidence,
                method: result.method,
            });
            self.results.insert(item.id, result);
            return Ok(());
        }

        let max_attempts = task.max_attempts.unwrap_or(self.max_attempts);
        let will_retry = task.attempt + 1 < max_attempts;
        let error = result
            .error
            .clone()
            .unwrap_or_else(|| "unresolved".to_string());

        if !will_retry {
            if let Err(e) = self.mark_failed(item) {
                warn!(item_id = %item.id, error = %e, "Failed to record resolution failure");
            }
        }

        self.events.broadcast(ScanEvent::ItemFailed {
            item_id: item.id,
            title: item.title.clone(),
            error: error.clone(),
            will_retry,
        });
        self.results.insert(item.id, result);

        Err(anyhow::anyhow!(error))
    }
}
