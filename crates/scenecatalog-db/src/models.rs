//! Catalog models matching the database schema.
//!
//! `CatalogItem` is the unit the scanner produces and the resolver enriches.
//! Updates from metadata sources are expressed as a [`MetadataPatch`] and
//! merged with [`CatalogItem::apply_patch`], where new non-empty values win
//! and missing values never erase what is already stored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use scenecatalog_common::{ItemId, MatchMethod, MediaKind};
use serde::{Deserialize, Serialize};

/// One episode file belonging to a `tv` item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeRef {
    pub path: String,
    pub season: u32,
    pub episode: Option<u32>,
    pub name: String,
}

impl EpisodeRef {
    /// Identity of the episode within its series.
    ///
    /// Episodes are unique by (season, episode); files without an episode
    /// number fall back to their path.
    pub fn key(&self) -> (u32, Option<u32>, &str) {
        match self.episode {
            Some(episode) => (self.season, Some(episode), ""),
            None => (self.season, None, self.path.as_str()),
        }
    }
}

/// A catalogued movie, series, or unidentified file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    pub year: Option<u16>,
    pub kind: MediaKind,
    pub primary_path: String,
    pub episodes: Vec<EpisodeRef>,
    pub poster_ref: Option<String>,
    pub backdrop_ref: Option<String>,
    pub overview: Option<String>,
    pub genres: Vec<String>,
    pub rating: Option<f64>,
    pub fingerprint: Option<String>,
    pub external_ids: BTreeMap<String, String>,
    pub match_confidence: Option<f64>,
    pub match_method: Option<MatchMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Create an item whose id is derived from `primary_path`.
    pub fn new(
        title: impl Into<String>,
        year: Option<u16>,
        kind: MediaKind,
        primary_path: impl Into<String>,
    ) -> Self {
        let primary_path = primary_path.into();
        let now = Utc::now();
        Self {
            id: ItemId::from_path(&primary_path),
            title: title.into(),
            year,
            kind,
            primary_path,
            episodes: Vec::new(),
            poster_ref: None,
            backdrop_ref: None,
            overview: None,
            genres: Vec::new(),
            rating: None,
            fingerprint: None,
            external_ids: BTreeMap::new(),
            match_confidence: None,
            match_method: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a previous resolution was accepted for this item.
    pub fn is_enriched(&self) -> bool {
        self.match_confidence.is_some()
    }

    /// Title, year, known kind, and an overview or external id.
    pub fn has_complete_metadata(&self) -> bool {
        !self.title.trim().is_empty()
            && self.year.is_some()
            && self.kind.is_known()
            && (self.overview.as_deref().is_some_and(|o| !o.is_empty())
                || !self.external_ids.is_empty())
    }

    /// Path of the file that represents this item on disk.
    ///
    /// For series this is the first episode file; `primary_path` is the
    /// series folder.
    pub fn primary_file(&self) -> &str {
        self.episodes
            .first()
            .map(|e| e.path.as_str())
            .unwrap_or(&self.primary_path)
    }

    /// Merge `incoming` episodes, keeping existing entries for known keys.
    ///
    /// Returns the number of episodes added.
    pub fn merge_episodes(&mut self, incoming: &[EpisodeRef]) -> usize {
        let mut added = 0;
        for episode in incoming {
            let exists = self.episodes.iter().any(|e| e.key() == episode.key());
            if !exists {
                self.episodes.push(episode.clone());
                added += 1;
            }
        }
        self.sort_episodes();
        added
    }

    /// Order episodes by (season, episode, path).
    pub fn sort_episodes(&mut self) {
        self.episodes.sort_by(|a, b| {
            (a.season, a.episode, &a.path).cmp(&(b.season, b.episode, &b.path))
        });
    }

    /// Fold a freshly scanned version of this item into the stored one.
    ///
    /// Episodes are merged. Parsed fields are refreshed only while the item
    /// has not been enriched, so accepted metadata survives rescans.
    pub fn absorb_rescan(&mut self, scanned: &CatalogItem) {
        self.merge_episodes(&scanned.episodes);
        if !self.is_enriched() {
            self.title = scanned.title.clone();
            self.year = scanned.year.or(self.year);
            self.kind = scanned.kind;
        }
        self.updated_at = Utc::now();
    }

    /// Apply a metadata patch: new non-empty values override, missing values
    /// never erase.
    pub fn apply_patch(&mut self, patch: &MetadataPatch) {
        if let Some(title) = patch.title.as_ref().filter(|t| !t.trim().is_empty()) {
            self.title = title.clone();
        }
        if patch.year.is_some() {
            self.year = patch.year;
        }
        if let Some(kind) = patch.kind.filter(|k| k.is_known()) {
            self.kind = kind;
        }
        if patch.overview.is_some() {
            self.overview = patch.overview.clone();
        }
        if patch.poster_ref.is_some() {
            self.poster_ref = patch.poster_ref.clone();
        }
        if patch.backdrop_ref.is_some() {
            self.backdrop_ref = patch.backdrop_ref.clone();
        }
        if !patch.genres.is_empty() {
            self.genres = patch.genres.clone();
        }
        if patch.rating.is_some() {
            self.rating = patch.rating;
        }
        for (provider, id) in &patch.external_ids {
            self.external_ids.insert(provider.clone(), id.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Partial metadata update produced by a metadata source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub year: Option<u16>,
    pub kind: Option<MediaKind>,
    pub overview: Option<String>,
    pub poster_ref: Option<String>,
    pub backdrop_ref: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub external_ids: BTreeMap<String, String>,
}

impl MetadataPatch {
    /// Same completeness rule as [`CatalogItem::has_complete_metadata`].
    pub fn is_complete(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
            && self.year.is_some()
            && self.kind.is_some_and(|k| k.is_known())
            && (self.overview.as_deref().is_some_and(|o| !o.is_empty())
                || !self.external_ids.is_empty())
    }
}

/// Persisted fingerprint mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintRecord {
    pub value: String,
    pub media_id: Option<ItemId>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FingerprintRecord {
    pub fn new(value: impl Into<String>, media_id: Option<ItemId>, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            value: value.into(),
            media_id,
            title,
            created_at: now,
            updated_at: now,
        }
    }

    /// A record knows both which item and which title it maps to.
    pub fn is_complete(&self) -> bool {
        self.media_id.is_some() && self.title.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Items sharing one fingerprint. Reported, never merged automatically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuplicateReport {
    pub fingerprint: String,
    pub items: Vec<CatalogItem>,
}

/// One finished scan, as recorded in `scan_runs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanRun {
    pub id: i64,
    pub phase: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files_discovered: u64,
    pub items_processed: u64,
    pub items_resolved: u64,
    pub items_failed: u64,
    pub errors: Vec<String>,
}
