//! Multi-tier metadata resolution.
//!
//! [`MatchResolver::resolve`] runs the configured tiers in order and returns
//! the first outcome that clears both the tier's threshold and the global
//! acceptance floor. Tier errors are logged and treated as "no match".

use std::path::Path;
use std::sync::Arc;

use scenecatalog_common::{ItemId, MatchMethod};
use scenecatalog_db::models::{CatalogItem, MetadataPatch};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::recognizer::Recognizer;
use super::registry::ProviderRegistry;
use super::scoring::MatchQuery;
use super::strategies::{
    AiEnhancedStrategy, CandidateSearch, ExactStrategy, FuzzyStrategy, ResolutionContext,
    ResolutionStrategy, WebStrategy,
};
use super::web::WebSearch;
use crate::config::ResolverConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub item_id: ItemId,
    pub success: bool,
    pub metadata: Option<MetadataPatch>,
    pub confidence: f64,
    pub method: MatchMethod,
    pub error: Option<String>,
}

impl ResolutionResult {
    fn failed(item_id: ItemId, error: String) -> Self {
        Self {
            item_id,
            success: false,
            metadata: None,
            confidence: 0.0,
            method: MatchMethod::Failed,
            error: Some(error),
        }
    }
}

pub struct MatchResolver {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
    acceptance_floor: f64,
}

impl MatchResolver {
    /// A resolver with no tiers. Add them with [`push_strategy`](Self::push_strategy).
    pub fn new(acceptance_floor: f64) -> Self {
        Self {
            strategies: Vec::new(),
            acceptance_floor,
        }
    }

    /// Standard tier chain: exact, fuzzy, then AI and web when available.
    pub fn from_config(
        config: &ResolverConfig,
        registry: Arc<ProviderRegistry>,
        recognizer: Option<Arc<dyn Recognizer>>,
        web: Option<Arc<dyn WebSearch>>,
    ) -> Self {
        let search = CandidateSearch::new(registry);
        let mut resolver = Self::new(config.acceptance_floor);

        resolver.push_strategy(Box::new(ExactStrategy::new(
            search.clone(),
            config.exact_threshold,
        )));
        resolver.push_strategy(Box::new(FuzzyStrategy::new(
            search.clone(),
            config.fuzzy_threshold,
        )));
        if let Some(recognizer) = recognizer {
            resolver.push_strategy(Box::new(AiEnhancedStrategy::new(
                recognizer,
                search,
                config.recognizer_threshold,
                config.ai_threshold,
            )));
        }
        if let Some(web) = web {
            resolver.push_strategy(Box::new(WebStrategy::new(web, config.web_threshold)));
        }
        resolver
    }

    pub fn push_strategy(&mut self, strategy: Box<dyn ResolutionStrategy>) {
        self.strategies.push(strategy);
    }

    /// Methods of the configured tiers, in order.
    pub fn methods(&self) -> Vec<MatchMethod> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    pub async fn resolve(&self, item: &CatalogItem) -> ResolutionResult {
        let ctx = context_for(item);
        let mut last_error = None;

        for strategy in &self.strategies {
            let method = strategy.method();
            match strategy.attempt(&ctx).await {
                Ok(Some(outcome)) => {
                    let confidence = outcome.confidence.clamp(0.0, 1.0);
                    if confidence >= strategy.threshold() && confidence >= self.acceptance_floor {
                        info!(
                            item_id = %item.id,
                            title = %item.title,
                            method = %method,
                            confidence,
                            "Item resolved"
                        );
                        return ResolutionResult {
                            item_id: item.id,
                            success: true,
                            metadata: Some(outcome.metadata),
                            confidence,
                            method,
                            error: None,
                        };
                    }
                    debug!(item_id = %item.id, method = %method, confidence, "Outcome below threshold");
                }
                Ok(None) => {
                    debug!(item_id = %item.id, method = %method, "Tier found nothing");
                }
                Err(e) => {
                    warn!(item_id = %item.id, method = %method, error = %e, "Tier failed");
                    last_error = Some(format!("{method}: {e:#}"));
                }
            }
        }

        let error = last_error.unwrap_or_else(|| {
            format!(
                "no match at or above confidence {:.2}",
                self.acceptance_floor
            )
        });
        debug!(item_id = %item.id, %error, "Item unresolved");
        ResolutionResult::failed(item.id, error)
    }
}

fn context_for(item: &CatalogItem) -> ResolutionContext {
    let file = item.primary_file();
    let file_name = Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string());

    ResolutionContext {
        item_id: item.id,
        query: MatchQuery::new(item.title.clone(), item.year, item.kind),
        file_name,
        path: item.primary_path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::strategies::StrategyOutcome;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use scenecatalog_common::MediaKind;

    struct Fixed {
        method: MatchMethod,
        threshold: f64,
        outcome: Option<f64>,
        fail: bool,
        calls: Arc<Mutex<Vec<MatchMethod>>>,
    }

    #[async_trait]
    impl ResolutionStrategy for Fixed {
        fn method(&self) -> MatchMethod {
            self.method
        }

        fn threshold(&self) -> f64 {
            self.threshold
        }

        async fn attempt(&self, _ctx: &ResolutionContext) -> anyhow::Result<Option<StrategyOutcome>> {
            self.calls.lock().push(self.method);
            if self.fail {
                anyhow::bail!("source timed out");
            }
            Ok(self.outcome.map(|confidence| StrategyOutcome {
                metadata: MetadataPatch {
                    title: Some(format!("{}", self.method)),
                    ..MetadataPatch::default()
                },
                confidence,
            }))
        }
    }

    fn tier(
        calls: &Arc<Mutex<Vec<MatchMethod>>>,
        method: MatchMethod,
        threshold: f64,
        outcome: Option<f64>,
    ) -> Box<dyn ResolutionStrategy> {
        Box::new(Fixed {
            method,
            threshold,
            outcome,
            fail: false,
            calls: calls.clone(),
        })
    }

    fn item() -> CatalogItem {
        CatalogItem::new("Heat", Some(1995), MediaKind::Movie, "/share/Movies/Heat.1995.mkv")
    }

    #[tokio::test]
    async fn stops_at_first_accepted_tier() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut resolver = MatchResolver::new(0.4);
        resolver.push_strategy(tier(&calls, MatchMethod::Exact, 0.85, Some(0.7)));
        resolver.push_strategy(tier(&calls, MatchMethod::Fuzzy, 0.6, Some(0.7)));
        resolver.push_strategy(tier(&calls, MatchMethod::Web, 0.4, Some(0.9)));

        let result = resolver.resolve(&item()).await;
        assert!(result.success);
        assert_eq!(result.method, MatchMethod::Fuzzy);
        assert_eq!(*calls.lock(), [MatchMethod::Exact, MatchMethod::Fuzzy]);
    }

    #[tokio::test]
    async fn tier_error_falls_through() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut resolver = MatchResolver::new(0.4);
        resolver.push_strategy(Box::new(Fixed {
            method: MatchMethod::Exact,
            threshold: 0.85,
            outcome: None,
            fail: true,
            calls: calls.clone(),
        }));
        resolver.push_strategy(tier(&calls, MatchMethod::Fuzzy, 0.6, Some(0.65)));

        let result = resolver.resolve(&item()).await;
        assert!(result.success);
        assert_eq!(result.method, MatchMethod::Fuzzy);
    }

    #[tokio::test]
    async fn floor_rejects_low_confidence() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut resolver = MatchResolver::new(0.4);
        // A tier with a permissive threshold still cannot go below the floor.
        resolver.push_strategy(tier(&calls, MatchMethod::Web, 0.1, Some(0.3)));

        let result = resolver.resolve(&item()).await;
        assert!(!result.success);
        assert_eq!(result.method, MatchMethod::Failed);
        assert!(result.metadata.is_none());
        assert!(result.confidence < 0.4);
    }

    #[tokio::test]
    async fn no_tiers_fails() {
        let resolver = MatchResolver::new(0.4);
        let result = resolver.resolve(&item()).await;
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn context_uses_first_episode_file() {
        let mut show = CatalogItem::new("Show", None, MediaKind::Tv, "/share/TV/Show");
        show.episodes.push(scenecatalog_db::models::EpisodeRef {
            path: "/share/TV/Show/Show.S01E01.mkv".into(),
            season: 1,
            episode: Some(1),
            name: "Show.S01E01.mkv".into(),
        });
        let ctx = context_for(&show);
        assert_eq!(ctx.file_name, "Show.S01E01.mkv");
        assert_eq!(ctx.path, "/share/TV/Show");
    }

    #[test]
    fn standard_chain_without_optional_tiers() {
        let resolver = MatchResolver::from_config(
            &ResolverConfig::default(),
            Arc::new(ProviderRegistry::new()),
            None,
            None,
        );
        assert_eq!(resolver.methods(), [MatchMethod::Exact, MatchMethod::Fuzzy]);
    }
}
