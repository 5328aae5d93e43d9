//! TMDB (The Movie Database) metadata provider.
//!
//! Implements [`MetadataProvider`] by querying the TMDB v3 REST API.
//!
//! Features:
//! - Token-bucket rate limiting at 4 requests / second via [`governor`].
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - 30-second request timeout.

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use scenecatalog_common::MediaKind;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::metadata::provider::{MediaDetails, MetadataProvider, SearchHit};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/original";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const REQUESTS_PER_SECOND: u32 = 4;

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieSearchResult {
    id: u64,
    title: Option<String>,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvSearchResult {
    id: u64,
    name: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetail {
    id: u64,
    title: Option<String>,
    original_title: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    genres: Option<Vec<TmdbGenre>>,
    imdb_id: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvDetail {
    id: u64,
    name: Option<String>,
    original_name: Option<String>,
    overview: Option<String>,
    first_air_date: Option<String>,
    vote_average: Option<f64>,
    genres: Option<Vec<TmdbGenre>>,
    external_ids: Option<TmdbExternalIds>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbExternalIds {
    imdb_id: Option<String>,
    tvdb_id: Option<u64>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// TMDB metadata provider.
///
/// # Examples
///
/// ```no_run
/// use scenecatalog::metadata::providers::TmdbProvider;
///
/// let provider = TmdbProvider::new("your-api-key".into(), "en-US".into()).unwrap();
/// ```
pub struct TmdbProvider {
    client: reqwest::Client,
    api_key: String,
    language: String,
    base_url: String,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TmdbProvider {
    /// Create a new TMDB provider with the given API key and language
    /// (an ISO-639-1 tag such as `"en-US"`).
    pub fn new(api_key: String, language: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build reqwest client")?;

        let quota = Quota::per_second(NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            api_key,
            language,
            base_url: TMDB_BASE_URL.to_string(),
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    /// Point the provider at a different API root (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// GET `path` with rate limiting and 429-retry logic, decoding JSON.
    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> anyhow::Result<T> {
        let url = format!("{}{path}", self.base_url);
        let mut retries = 0u32;

        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .get(&url)
                .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
                .query(params)
                .send()
                .await
                .with_context(|| format!("TMDB request failed: {path}"))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    "TMDB returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let resp = resp
                .error_for_status()
                .with_context(|| format!("TMDB request returned error: {path}"))?;

            return resp
                .json()
                .await
                .with_context(|| format!("failed to parse TMDB response: {path}"));
        }
    }
}

/// Extract a four-digit year from a date string like `"2023-04-15"`.
fn parse_year(date: Option<&str>) -> Option<u16> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse::<u16>().ok())
}

/// Convert a TMDB image path fragment to a full URL.
fn image_url(path: &str) -> String {
    format!("{TMDB_IMAGE_BASE}{path}")
}

fn genre_names(genres: Option<Vec<TmdbGenre>>) -> Vec<String> {
    genres
        .unwrap_or_default()
        .into_iter()
        .map(|g| g.name)
        .collect()
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search_movie(&self, title: &str, year: Option<u16>) -> anyhow::Result<Vec<SearchHit>> {
        let year_str = year.map(|y| y.to_string());
        let mut params = vec![("query", title)];
        if let Some(ref y) = year_str {
            params.push(("year", y.as_str()));
        }

        debug!(title, ?year, "TMDB search movie");
        let body: TmdbSearchResponse<TmdbMovieSearchResult> = self.get("/search/movie", &params).await?;

        Ok(body
            .results
            .into_iter()
            .map(|r| SearchHit {
                id: r.id.to_string(),
                title: r.title.unwrap_or_default(),
                year: parse_year(r.release_date.as_deref()),
                kind: MediaKind::Movie,
                overview: r.overview,
                poster_path: r.poster_path.map(|p| image_url(&p)),
                backdrop_path: r.backdrop_path.map(|p| image_url(&p)),
                rating: r.vote_average,
                provider_name: "tmdb".to_string(),
            })
            .collect())
    }

    async fn search_tv(&self, title: &str, year: Option<u16>) -> anyhow::Result<Vec<SearchHit>> {
        let year_str = year.map(|y| y.to_string());
        let mut params = vec![("query", title)];
        if let Some(ref y) = year_str {
            params.push(("first_air_date_year", y.as_str()));
        }

        debug!(title, ?year, "TMDB search TV");
        let body: TmdbSearchResponse<TmdbTvSearchResult> = self.get("/search/tv", &params).await?;

        Ok(body
            .results
            .into_iter()
            .map(|r| SearchHit {
                id: r.id.to_string(),
                title: r.name.unwrap_or_default(),
                year: parse_year(r.first_air_date.as_deref()),
                kind: MediaKind::Tv,
                overview: r.overview,
                poster_path: r.poster_path.map(|p| image_url(&p)),
                backdrop_path: r.backdrop_path.map(|p| image_url(&p)),
                rating: r.vote_average,
                provider_name: "tmdb".to_string(),
            })
            .collect())
    }

    async fn movie_details(&self, provider_id: &str) -> anyhow::Result<MediaDetails> {
        debug!(provider_id, "TMDB get movie details");
        let detail: TmdbMovieDetail = self.get(&format!("/movie/{provider_id}"), &[]).await?;

        let mut provider_ids = BTreeMap::new();
        provider_ids.insert("tmdb".to_string(), detail.id.to_string());
        if let Some(imdb) = detail.imdb_id.filter(|id| !id.is_empty()) {
            provider_ids.insert("imdb".to_string(), imdb);
        }

        Ok(MediaDetails {
            title: detail.title.unwrap_or_default(),
            original_title: detail.original_title,
            overview: detail.overview,
            genres: genre_names(detail.genres),
            year: parse_year(detail.release_date.as_deref()),
            rating: detail.vote_average,
            poster_url: detail.poster_path.map(|p| image_url(&p)),
            backdrop_url: detail.backdrop_path.map(|p| image_url(&p)),
            provider_ids,
        })
    }

    async fn tv_details(&self, provider_id: &str) -> anyhow::Result<MediaDetails> {
        debug!(provider_id, "TMDB get TV details");
        let detail: TmdbTvDetail = self
            .get(
                &format!("/tv/{provider_id}"),
                &[("append_to_response", "external_ids")],
            )
            .await?;

        let mut provider_ids = BTreeMap::new();
        provider_ids.insert("tmdb".to_string(), detail.id.to_string());
        if let Some(ext) = detail.external_ids {
            if let Some(imdb) = ext.imdb_id.filter(|id| !id.is_empty()) {
                provider_ids.insert("imdb".to_string(), imdb);
            }
            if let Some(tvdb) = ext.tvdb_id {
                provider_ids.insert("tvdb".to_string(), tvdb.to_string());
            }
        }

        Ok(MediaDetails {
            title: detail.name.unwrap_or_default(),
            original_title: detail.original_name,
            overview: detail.overview,
            genres: genre_names(detail.genres),
            year: parse_year(detail.first_air_date.as_deref()),
            rating: detail.vote_average,
            poster_url: detail.poster_path.map(|p| image_url(&p)),
            backdrop_url: detail.backdrop_path.map(|p| image_url(&p)),
            provider_ids,
        })
    }
}
