//! Resolution tiers.
//!
//! Each tier is a [`ResolutionStrategy`]; the resolver walks them in order and
//! stops at the first outcome that clears its threshold.

use std::sync::Arc;

use async_trait::async_trait;
use scenecatalog_common::{ItemId, MatchMethod, MediaKind};
use scenecatalog_db::models::MetadataPatch;
use tracing::{debug, warn};

use super::recognizer::Recognizer;
use super::registry::ProviderRegistry;
use super::scoring::{best_candidate, MatchCandidate, MatchQuery};
use super::web::WebSearch;

/// Everything a tier may look at.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub item_id: ItemId,
    pub query: MatchQuery,
    /// File name of the item's primary file
    pub file_name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    pub metadata: MetadataPatch,
    pub confidence: f64,
}

#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    fn method(&self) -> MatchMethod;

    fn threshold(&self) -> f64;

    /// Try to resolve. `Ok(None)` means the tier found nothing worth using;
    /// `Err` means a collaborator failed and the caller should move on.
    async fn attempt(&self, ctx: &ResolutionContext) -> anyhow::Result<Option<StrategyOutcome>>;
}

// ---------------------------------------------------------------------------
// Shared search helper
// ---------------------------------------------------------------------------

/// Searches the metadata sources and turns the best hit into metadata.
#[derive(Clone)]
pub struct CandidateSearch {
    registry: Arc<ProviderRegistry>,
}

impl CandidateSearch {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Best scoring hit for `query`. Unknown kinds search movies, then TV.
    pub async fn best_match(&self, query: &MatchQuery) -> anyhow::Result<Option<MatchCandidate>> {
        if query.title.trim().is_empty() {
            return Ok(None);
        }

        let hits = match query.kind {
            MediaKind::Movie => self.registry.search_movie(&query.title, query.year).await?,
            MediaKind::Tv => self.registry.search_tv(&query.title, query.year).await?,
            MediaKind::Unknown => {
                let movies = self.registry.search_movie(&query.title, query.year).await;
                let shows = self.registry.search_tv(&query.title, query.year).await;
                match (movies, shows) {
                    (Err(e), Err(_)) => return Err(e),
                    (movies, shows) => {
                        let mut hits = movies.unwrap_or_default();
                        hits.extend(shows.unwrap_or_default());
                        hits
                    }
                }
            }
        };

        Ok(best_candidate(query, hits))
    }

    /// Detailed metadata for a chosen candidate, degrading to the hit itself.
    pub async fn metadata_for(&self, candidate: &MatchCandidate) -> MetadataPatch {
        let hit = &candidate.hit;
        match self.registry.details(hit).await {
            Ok(details) => {
                let fallback = hit.to_patch();
                let mut patch = details.into_patch(hit.kind);
                patch.title = patch.title.or(fallback.title);
                patch.year = patch.year.or(fallback.year);
                patch.overview = patch.overview.or(fallback.overview);
                patch.poster_ref = patch.poster_ref.or(fallback.poster_ref);
                patch.backdrop_ref = patch.backdrop_ref.or(fallback.backdrop_ref);
                patch.rating = patch.rating.or(fallback.rating);
                for (provider, id) in fallback.external_ids {
                    patch.external_ids.entry(provider).or_insert(id);
                }
                patch
            }
            Err(e) => {
                warn!(
                    provider = %hit.provider_name,
                    provider_id = %hit.id,
                    error = %e,
                    "Detail lookup failed, using search hit"
                );
                hit.to_patch()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tier 1: exact
// ---------------------------------------------------------------------------

pub struct ExactStrategy {
    search: CandidateSearch,
    threshold: f64,
}

impl ExactStrategy {
    pub fn new(search: CandidateSearch, threshold: f64) -> Self {
        Self { search, threshold }
    }
}

#[async_trait]
impl ResolutionStrategy for ExactStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::Exact
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> anyhow::Result<Option<StrategyOutcome>> {
        let Some(candidate) = self.search.best_match(&ctx.query).await? else {
            return Ok(None);
        };
        let confidence = candidate.score.confidence;
        if confidence < self.threshold {
            debug!(item_id = %ctx.item_id, confidence, "Exact match below threshold");
            return Ok(None);
        }

        Ok(Some(StrategyOutcome {
            metadata: self.search.metadata_for(&candidate).await,
            confidence,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tier 2: fuzzy
// ---------------------------------------------------------------------------

pub struct FuzzyStrategy {
    search: CandidateSearch,
    threshold: f64,
}

impl FuzzyStrategy {
    pub fn new(search: CandidateSearch, threshold: f64) -> Self {
        Self { search, threshold }
    }
}

/// Alternative spellings of a title: punctuation stripped, last word
/// dropped, first two words only. The original title is never included.
pub fn title_variants(title: &str) -> Vec<String> {
    let stripped: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    let words: Vec<&str> = stripped.split_whitespace().collect();

    let mut variants = vec![words.join(" ")];
    if words.len() >= 2 {
        variants.push(words[..words.len() - 1].join(" "));
    }
    if words.len() >= 3 {
        variants.push(words[..2].join(" "));
    }

    let original = title.trim().to_lowercase();
    let mut unique: Vec<String> = Vec::new();
    for variant in variants {
        let lowered = variant.to_lowercase();
        if variant.is_empty()
            || lowered == original
            || unique.iter().any(|u| u.to_lowercase() == lowered)
        {
            continue;
        }
        unique.push(variant);
    }
    unique
}

#[async_trait]
impl ResolutionStrategy for FuzzyStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::Fuzzy
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> anyhow::Result<Option<StrategyOutcome>> {
        let mut best: Option<MatchCandidate> = None;

        for variant in title_variants(&ctx.query.title) {
            let query = MatchQuery::new(variant, ctx.query.year, ctx.query.kind);
            let candidate = match self.search.best_match(&query).await {
                Ok(Some(candidate)) => candidate,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        item_id = %ctx.item_id,
                        variant = %query.title,
                        error = %e,
                        "Variant search failed"
                    );
                    continue;
                }
            };
            let better = best
                .as_ref()
                .map_or(true, |b| candidate.score.confidence > b.score.confidence);
            if better {
                best = Some(candidate);
            }
        }

        let Some(candidate) = best.filter(|c| c.score.confidence >= self.threshold) else {
            return Ok(None);
        };

        Ok(Some(StrategyOutcome {
            metadata: self.search.metadata_for(&candidate).await,
            confidence: candidate.score.confidence,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tier 3: AI-enhanced
// ---------------------------------------------------------------------------

/// Bonus added to a re-search hit found through the recognizer.
const AI_BONUS: f64 = 0.1;
/// Re-search hits never claim more than this.
const AI_CONFIDENCE_CAP: f64 = 0.9;

pub struct AiEnhancedStrategy {
    recognizer: Arc<dyn Recognizer>,
    search: CandidateSearch,
    recognizer_threshold: f64,
    threshold: f64,
}

impl AiEnhancedStrategy {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        search: CandidateSearch,
        recognizer_threshold: f64,
        threshold: f64,
    ) -> Self {
        Self {
            recognizer,
            search,
            recognizer_threshold,
            threshold,
        }
    }
}

#[async_trait]
impl ResolutionStrategy for AiEnhancedStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::AiEnhanced
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> anyhow::Result<Option<StrategyOutcome>> {
        let recognition = self
            .recognizer
            .recognize(&ctx.file_name, Some(&ctx.path))
            .await?;
        if recognition.clean_title.trim().is_empty() {
            return Ok(None);
        }

        let kind = if recognition.media_type.is_known() {
            recognition.media_type
        } else {
            ctx.query.kind
        };
        let year = recognition.year.or(ctx.query.year);

        if recognition.confidence > self.recognizer_threshold {
            let titles = std::iter::once(&recognition.clean_title)
                .chain(recognition.alternative_names.iter());

            for title in titles {
                let query = MatchQuery::new(title.clone(), year, kind);
                match self.search.best_match(&query).await {
                    Ok(Some(candidate)) if candidate.score.confidence >= self.threshold => {
                        let confidence = (candidate.score.confidence + AI_BONUS).min(AI_CONFIDENCE_CAP);
                        return Ok(Some(StrategyOutcome {
                            metadata: self.search.metadata_for(&candidate).await,
                            confidence,
                        }));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(item_id = %ctx.item_id, title = %title, error = %e, "Re-search failed");
                    }
                }
            }
        }

        // Fall back to the recognizer's own guess.
        let guess = MetadataPatch {
            title: Some(recognition.clean_title),
            year: recognition.year,
            kind: Some(kind).filter(|k| k.is_known()),
            ..MetadataPatch::default()
        };
        Ok(Some(StrategyOutcome {
            metadata: guess,
            confidence: recognition.confidence,
        })
        .filter(|o| o.confidence >= self.threshold))
    }
}

// ---------------------------------------------------------------------------
// Tier 4: web
// ---------------------------------------------------------------------------

pub struct WebStrategy {
    web: Arc<dyn WebSearch>,
    threshold: f64,
}

impl WebStrategy {
    pub fn new(web: Arc<dyn WebSearch>, threshold: f64) -> Self {
        Self { web, threshold }
    }
}

#[async_trait]
impl ResolutionStrategy for WebStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::Web
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> anyhow::Result<Option<StrategyOutcome>> {
        if ctx.query.title.trim().is_empty() {
            return Ok(None);
        }
        let text = match ctx.query.year {
            Some(year) => format!("{} {year}", ctx.query.title),
            None => ctx.query.title.clone(),
        };

        let hits = self.web.search(&text).await?;
        debug!(backend = self.web.name(), hits = hits.len(), "Web search answered");

        let Some(candidate) = best_candidate(&ctx.query, hits)
            .filter(|c| c.score.confidence >= self.threshold)
        else {
            return Ok(None);
        };

        // Web hits carry no catalogue ids.
        let mut metadata = candidate.hit.to_patch();
        metadata.external_ids.clear();
        Ok(Some(StrategyOutcome {
            metadata,
            confidence: candidate.score.confidence,
        }))
    }
}
