//! Trait definition and types for metadata providers.
//!
//! A [`MetadataProvider`] wraps one external catalogue (TMDB today) and exposes
//! search and detail lookups. Providers are unreliable: empty results and
//! transient errors are ordinary outcomes that callers must tolerate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use scenecatalog_common::MediaKind;
use scenecatalog_db::models::MetadataPatch;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// A single result returned from a metadata search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Provider-specific identifier (e.g. TMDB numeric ID).
    pub id: String,
    pub title: String,
    pub year: Option<u16>,
    /// Whether the hit came from a movie or a TV search.
    pub kind: MediaKind,
    pub overview: Option<String>,
    /// Full URL of the poster image, if available.
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub rating: Option<f64>,
    /// Name of the provider that returned this hit (e.g. "tmdb").
    pub provider_name: String,
}

impl SearchHit {
    /// Metadata carried by the hit itself, used when the detail lookup fails.
    pub fn to_patch(&self) -> MetadataPatch {
        let mut external_ids = BTreeMap::new();
        external_ids.insert(self.provider_name.clone(), self.id.clone());

        MetadataPatch {
            title: Some(self.title.clone()),
            year: self.year,
            kind: Some(self.kind),
            overview: self.overview.clone(),
            poster_ref: self.poster_path.clone(),
            backdrop_ref: self.backdrop_path.clone(),
            genres: Vec::new(),
            rating: self.rating,
            external_ids,
        }
    }
}

// ---------------------------------------------------------------------------
// Details
// ---------------------------------------------------------------------------

/// Full metadata for a movie or TV show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDetails {
    pub title: String,
    /// Original-language title, if different from `title`.
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub genres: Vec<String>,
    /// Year the media was first released or premiered.
    pub year: Option<u16>,
    /// Community rating, typically 0.0 - 10.0.
    pub rating: Option<f64>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    /// External ids keyed by provider name (`{"tmdb": "27205", "imdb": "tt1375666"}`).
    pub provider_ids: BTreeMap<String, String>,
}

impl MediaDetails {
    pub fn into_patch(self, kind: MediaKind) -> MetadataPatch {
        MetadataPatch {
            title: Some(self.title).filter(|t| !t.is_empty()),
            year: self.year,
            kind: Some(kind),
            overview: self.overview.filter(|o| !o.is_empty()),
            poster_ref: self.poster_url,
            backdrop_ref: self.backdrop_url,
            genres: self.genres,
            rating: self.rating,
            external_ids: self.provider_ids,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Async trait that all metadata providers must implement.
///
/// Providers are shared across resolution tasks behind an `Arc`.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"tmdb"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider is configured and ready to serve requests.
    fn is_available(&self) -> bool;

    /// Search for movies matching `title`, optionally constrained by `year`.
    async fn search_movie(&self, title: &str, year: Option<u16>) -> anyhow::Result<Vec<SearchHit>>;

    /// Search for TV shows matching `title`, optionally constrained by first-air year.
    async fn search_tv(&self, title: &str, year: Option<u16>) -> anyhow::Result<Vec<SearchHit>>;

    /// Fetch full metadata for a movie identified by `provider_id`.
    async fn movie_details(&self, provider_id: &str) -> anyhow::Result<MediaDetails>;

    /// Fetch full metadata for a TV show identified by `provider_id`.
    async fn tv_details(&self, provider_id: &str) -> anyhow::Result<MediaDetails>;
}
