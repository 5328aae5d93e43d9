//! File identity: fingerprints, local and community lookups, duplicate
//! reports.
//!
//! Identity work never blocks a scan. The orchestrator spawns
//! [`IdentityService::sweep`] once a scan ends; every failure inside it is
//! logged and counted, never propagated.

pub mod community;
pub mod fingerprint;

use std::sync::Arc;

use scenecatalog_common::{ItemId, MatchMethod};
use scenecatalog_db::models::{CatalogItem, DuplicateReport, FingerprintRecord, MetadataPatch};
use scenecatalog_db::pool::{get_conn, DbPool};
use scenecatalog_db::queries::{fingerprints, items};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::IdentityConfig;
use crate::state::{EventBus, ScanEvent};
use crate::storage::{StorageError, StorageProvider};
use community::{CommunityMatch, CommunityRegistry, CommunityRegistryClient, Submission};
use fingerprint::Fingerprinter;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Cannot fingerprint file: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Database(#[from] scenecatalog_common::Error),

    #[error("Community registry error: {0}")]
    Community(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupSource {
    Local,
    Community,
}

/// Result of a fingerprint lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityMatch {
    pub source: LookupSource,
    pub fingerprint: String,
    pub media_id: Option<ItemId>,
    pub title: Option<String>,
    /// Metadata supplied by the community registry.
    pub metadata: Option<MetadataPatch>,
    pub confidence: Option<f64>,
}

/// Outcome of one identity sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub fingerprinted: u64,
    pub skipped: u64,
    pub community_hits: u64,
    /// Unresolved items that took over an identification from a fingerprint
    /// match, local or community.
    pub adopted: u64,
    pub submitted: u64,
    pub duplicates: Vec<DuplicateReport>,
}

pub struct IdentityService {
    pool: DbPool,
    fingerprinter: Fingerprinter,
    community: Option<Arc<dyn CommunityRegistry>>,
    submit_min_confidence: f64,
    events: Arc<EventBus>,
}

impl IdentityService {
    pub fn new(pool: DbPool, fingerprinter: Fingerprinter, events: Arc<EventBus>) -> Self {
        Self {
            pool,
            fingerprinter,
            community: None,
            submit_min_confidence: 0.7,
            events,
        }
    }

    pub fn from_config(
        config: &IdentityConfig,
        pool: DbPool,
        storage: Arc<dyn StorageProvider>,
        events: Arc<EventBus>,
    ) -> anyhow::Result<Self> {
        let fingerprinter = Fingerprinter::new(storage, config.strategy, config.prefix_bytes);
        let mut service = Self::new(pool, fingerprinter, events)
            .with_submit_min_confidence(config.submit_min_confidence);

        if let Some(ref url) = config.registry_url {
            service = service.with_community(Arc::new(CommunityRegistryClient::new(url)?));
        }
        Ok(service)
    }

    pub fn with_community(mut self, community: Arc<dyn CommunityRegistry>) -> Self {
        self.community = Some(community);
        self
    }

    pub fn with_submit_min_confidence(mut self, confidence: f64) -> Self {
        self.submit_min_confidence = confidence;
        self
    }

    pub async fn fingerprint(&self, path: &str) -> Result<String, IdentityError> {
        Ok(self.fingerprinter.fingerprint(path).await?)
    }

    /// Local store first, then the community registry.
    ///
    /// A community hit fills in the local record when that record is missing
    /// or incomplete.
    pub async fn lookup(&self, fingerprint: &str) -> Result<Option<IdentityMatch>, IdentityError> {
        let local = {
            let conn = get_conn(&self.pool)?;
            fingerprints::get_fingerprint(&conn, fingerprint)?
        };

        if let Some(ref record) = local {
            if record.is_complete() {
                return Ok(Some(local_match(record)));
            }
        }

        let Some(ref community) = self.community else {
            return Ok(local.as_ref().map(local_match));
        };

        match community.lookup(fingerprint).await {
            Ok(Some(found)) => {
                let media_id = local.as_ref().and_then(|r| r.media_id);
                self.record_community_hit(fingerprint, media_id, &found)?;
                Ok(Some(IdentityMatch {
                    source: LookupSource::Community,
                    fingerprint: fingerprint.to_string(),
                    media_id,
                    title: Some(found.title.clone()),
                    metadata: Some(found.to_patch()),
                    confidence: found.confidence,
                }))
            }
            Ok(None) => Ok(local.as_ref().map(local_match)),
            Err(e) => {
                warn!(fingerprint, error = %e, "Community lookup failed");
                Ok(local.as_ref().map(local_match))
            }
        }
    }

    fn record_community_hit(
        &self,
        fingerprint: &str,
        media_id: Option<ItemId>,
        found: &CommunityMatch,
    ) -> Result<(), IdentityError> {
        let conn = get_conn(&self.pool)?;
        let record = FingerprintRecord::new(fingerprint, media_id, Some(found.title.clone()));
        fingerprints::upsert_fingerprint(&conn, &record)?;
        Ok(())
    }

    /// Contribute an identification. Returns `false` when the gate rejects it
    /// (confidence too low, incomplete metadata, or no registry configured).
    pub async fn submit(
        &self,
        fingerprint: &str,
        metadata: &MetadataPatch,
        confidence: f64,
    ) -> Result<bool, IdentityError> {
        let Some(ref community) = self.community else {
            return Ok(false);
        };
        if confidence < self.submit_min_confidence || !metadata.is_complete() {
            debug!(fingerprint, confidence, "Submission gated");
            return Ok(false);
        }

        community
            .submit(&Submission {
                fingerprint,
                metadata,
                confidence,
            })
            .await
            .map_err(|e| IdentityError::Community(format!("{e:#}")))?;
        Ok(true)
    }

    /// Items sharing a fingerprint with at least one other item.
    pub fn duplicates(&self) -> Result<Vec<DuplicateReport>, IdentityError> {
        let conn = get_conn(&self.pool)?;
        Ok(items::find_duplicates(&conn)?)
    }

    /// Full identity pass over the given items.
    ///
    /// Items are re-read from the store so accepted metadata from the scan
    /// that just finished is taken into account. Enriched items go first so
    /// their duplicates can adopt them in the same pass.
    pub async fn sweep(&self, item_ids: &[ItemId]) -> SweepReport {
        let mut report = SweepReport::default();

        let mut loaded = Vec::with_capacity(item_ids.len());
        for &id in item_ids {
            match self.load(id) {
                Ok(Some(item)) => loaded.push(item),
                Ok(None) => {}
                Err(e) => {
                    warn!(item_id = %id, error = %e, "Skipping item in identity sweep");
                    report.skipped += 1;
                }
            }
        }
        loaded.sort_by_key(|item| !item.is_enriched());

        for item in &loaded {
            let id = item.id;
            if let Err(e) = self.sweep_item(item, &mut report).await {
                warn!(item_id = %id, error = %e, "Identity sweep failed for item");
                report.skipped += 1;
            }
        }

        match self.duplicates() {
            Ok(duplicates) => {
                for duplicate in &duplicates {
                    self.events.broadcast(ScanEvent::DuplicatesFound {
                        fingerprint: duplicate.fingerprint.clone(),
                        item_ids: duplicate.items.iter().map(|i| i.id).collect(),
                    });
                }
                report.duplicates = duplicates;
            }
            Err(e) => warn!(error = %e, "Duplicate detection failed"),
        }

        info!(
            fingerprinted = report.fingerprinted,
            skipped = report.skipped,
            community_hits = report.community_hits,
            adopted = report.adopted,
            submitted = report.submitted,
            duplicates = report.duplicates.len(),
            "Identity sweep finished"
        );
        self.events.broadcast(ScanEvent::IdentitySweepCompleted {
            fingerprinted: report.fingerprinted,
            submitted: report.submitted,
            duplicates: report.duplicates.len() as u64,
        });
        report
    }

    fn load(&self, id: ItemId) -> Result<Option<CatalogItem>, IdentityError> {
        let conn = get_conn(&self.pool)?;
        Ok(items::get_item(&conn, id)?)
    }

    async fn sweep_item(&self, item: &CatalogItem, report: &mut SweepReport) -> Result<(), IdentityError> {
        let fingerprint = match item.fingerprint {
            Some(ref fp) => fp.clone(),
            None => {
                let fp = self.fingerprint(item.primary_file()).await?;
                let conn = get_conn(&self.pool)?;
                items::set_fingerprint(&conn, item.id, &fp)?;
                report.fingerprinted += 1;
                fp
            }
        };

        let known = {
            let conn = get_conn(&self.pool)?;
            fingerprints::get_fingerprint(&conn, &fingerprint)?
        };
        if let Some(record) = known.as_ref().filter(|r| r.is_complete()) {
            let foreign = record.media_id != Some(item.id);
            if !item.is_enriched() && foreign && self.adopt_local(item.id, record)? {
                report.adopted += 1;
            }
            return Ok(());
        }

        if item.is_enriched() {
            {
                let conn = get_conn(&self.pool)?;
                let record = FingerprintRecord::new(&fingerprint, Some(item.id), Some(item.title.clone()));
                fingerprints::upsert_fingerprint(&conn, &record)?;
            }

            let confidence = item.match_confidence.unwrap_or_default();
            match self.submit(&fingerprint, &item_patch(item), confidence).await {
                Ok(true) => report.submitted += 1,
                Ok(false) => {}
                Err(e) => warn!(item_id = %item.id, error = %e, "Submission failed"),
            }
        } else {
            {
                let conn = get_conn(&self.pool)?;
                fingerprints::upsert_fingerprint(&conn, &FingerprintRecord::new(&fingerprint, Some(item.id), None))?;
            }
            if let Some(found) = self.lookup(&fingerprint).await? {
                if found.source == LookupSource::Community {
                    report.community_hits += 1;
                    if let Some(ref patch) = found.metadata {
                        let confidence = found.confidence.unwrap_or(self.submit_min_confidence);
                        if self.adopt(item.id, patch, confidence, MatchMethod::Community)? {
                            report.adopted += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Copy the identification of the enriched item a fingerprint record
    /// points at.
    fn adopt_local(&self, id: ItemId, record: &FingerprintRecord) -> Result<bool, IdentityError> {
        let Some(source_id) = record.media_id else {
            return Ok(false);
        };
        let Some(source) = self.load(source_id)? else {
            return Ok(false);
        };
        let Some(confidence) = source.match_confidence else {
            return Ok(false);
        };
        let method = source.match_method.unwrap_or(MatchMethod::Exact);
        self.adopt(id, &item_patch(&source), confidence, method)
    }

    /// Apply an identification to a stored item that has none yet.
    fn adopt(
        &self,
        id: ItemId,
        patch: &MetadataPatch,
        confidence: f64,
        method: MatchMethod,
    ) -> Result<bool, IdentityError> {
        let conn = get_conn(&self.pool)?;
        let Some(mut item) = items::get_item(&conn, id)? else {
            return Ok(false);
        };
        if item.is_enriched() {
            return Ok(false);
        }

        item.apply_patch(patch);
        item.match_confidence = Some(confidence);
        item.match_method = Some(method);
        items::upsert_item(&conn, &item)?;
        debug!(item_id = %id, title = %item.title, %method, "Adopted identification");
        Ok(true)
    }
}

fn local_match(record: &FingerprintRecord) -> IdentityMatch {
    IdentityMatch {
        source: LookupSource::Local,
        fingerprint: record.value.clone(),
        media_id: record.media_id,
        title: record.title.clone(),
        metadata: None,
        confidence: None,
    }
}

/// The metadata an item would contribute to the registry.
fn item_patch(item: &CatalogItem) -> MetadataPatch {
    MetadataPatch {
        title: Some(item.title.clone()),
        year: item.year,
        kind: Some(item.kind),
        overview: item.overview.clone(),
        poster_ref: item.poster_ref.clone(),
        backdrop_ref: item.backdrop_ref.clone(),
        genres: item.genres.clone(),
        rating: item.rating,
        external_ids: item.external_ids.clone(),
    }
}
