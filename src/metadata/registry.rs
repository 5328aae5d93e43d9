//! Provider registry for managing multiple [`MetadataProvider`] implementations.
//!
//! The [`ProviderRegistry`] aggregates metadata providers and exposes a unified
//! interface for searching across all configured backends. Results from
//! multiple providers are concatenated in registration order and deduplicated.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use scenecatalog_common::MediaKind;
use tracing::warn;

use super::provider::{MediaDetails, MetadataProvider, SearchHit};

/// A registry that manages multiple [`MetadataProvider`] implementations.
///
/// Providers are stored in registration order. A search queries every
/// *available* provider and merges the hits, dropping later entries that
/// share a (case-insensitive) title and year with an earlier one. One failing
/// provider does not hide the others' results; the search only fails when
/// every available provider failed.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use scenecatalog::metadata::registry::ProviderRegistry;
///
/// let mut registry = ProviderRegistry::new();
/// registry.register(Arc::new(my_provider));
///
/// let hits = registry.search_movie("Interstellar", Some(2014)).await?;
/// ```
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MetadataProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry with no providers.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Register a new metadata provider. Searches follow registration order.
    pub fn register(&mut self, provider: Arc<dyn MetadataProvider>) {
        self.providers.push(provider);
    }

    /// Providers that are currently available.
    pub fn available(&self) -> Vec<&dyn MetadataProvider> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.as_ref())
            .collect()
    }

    pub async fn search_movie(&self, title: &str, year: Option<u16>) -> Result<Vec<SearchHit>> {
        self.search(MediaKind::Movie, title, year).await
    }

    pub async fn search_tv(&self, title: &str, year: Option<u16>) -> Result<Vec<SearchHit>> {
        self.search(MediaKind::Tv, title, year).await
    }

    async fn search(&self, kind: MediaKind, title: &str, year: Option<u16>) -> Result<Vec<SearchHit>> {
        let available = self.available();
        if available.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_hits = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;

        for provider in &available {
            let result = match kind {
                MediaKind::Tv => provider.search_tv(title, year).await,
                _ => provider.search_movie(title, year).await,
            };
            match result {
                Ok(hits) => {
                    succeeded += 1;
                    all_hits.extend(hits);
                }
                Err(e) => {
                    warn!(provider = provider.name(), kind = %kind, title, error = %e, "Provider search failed");
                    last_error = Some(e);
                }
            }
        }

        if succeeded == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let mut seen = HashSet::new();
        all_hits.retain(|hit| seen.insert((hit.title.to_lowercase(), hit.year)));
        Ok(all_hits)
    }

    /// Fetch details for a hit from the provider that produced it.
    pub async fn details(&self, hit: &SearchHit) -> Result<MediaDetails> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.name() == hit.provider_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown metadata provider: {}", hit.provider_name))?;

        match hit.kind {
            MediaKind::Tv => provider.tv_details(&hit.id).await,
            _ => provider.movie_details(&hit.id).await,
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    /// A minimal stub provider used for testing.
    struct StubProvider {
        provider_name: &'static str,
        available: bool,
        fail: bool,
        hits: Vec<SearchHit>,
    }

    impl StubProvider {
        fn new(provider_name: &'static str, hits: Vec<SearchHit>) -> Self {
            Self {
                provider_name,
                available: true,
                fail: false,
                hits,
            }
        }
    }

    #[async_trait]
    impl MetadataProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.provider_name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn search_movie(&self, _title: &str, _year: Option<u16>) -> Result<Vec<SearchHit>> {
            if self.fail {
                anyhow::bail!("connection reset");
            }
            Ok(self.hits.clone())
        }

        async fn search_tv(&self, _title: &str, _year: Option<u16>) -> Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }

        async fn movie_details(&self, provider_id: &str) -> Result<MediaDetails> {
            Ok(MediaDetails {
                title: format!("movie {provider_id}"),
                original_title: None,
                overview: None,
                genres: Vec::new(),
                year: None,
                rating: None,
                poster_url: None,
                backdrop_url: None,
                provider_ids: BTreeMap::new(),
            })
        }

        async fn tv_details(&self, _provider_id: &str) -> Result<MediaDetails> {
            anyhow::bail!("not implemented")
        }
    }

    fn make_hit(title: &str, year: Option<u16>, provider: &str) -> SearchHit {
        SearchHit {
            id: format!("{provider}-{title}"),
            title: title.to_string(),
            year,
            kind: MediaKind::Movie,
            overview: None,
            poster_path: None,
            backdrop_path: None,
            rating: None,
            provider_name: provider.to_string(),
        }
    }

    #[test]
    fn empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.available().is_empty());
    }

    #[test]
    fn available_skips_offline_providers() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider {
            available: false,
            ..StubProvider::new("offline", Vec::new())
        }));
        registry.register(Arc::new(StubProvider::new("online", Vec::new())));

        let available = registry.available();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name(), "online");
    }

    #[tokio::test]
    async fn search_merges_in_registration_order() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider::new(
            "a",
            vec![make_hit("Interstellar", Some(2014), "a")],
        )));
        registry.register(Arc::new(StubProvider::new(
            "b",
            vec![make_hit("The Martian", Some(2015), "b")],
        )));

        let hits = registry.search_movie("test", None).await.unwrap();
        let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, ["Interstellar", "The Martian"]);
    }

    #[tokio::test]
    async fn search_deduplicates_case_insensitively() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider::new(
            "first",
            vec![make_hit("interstellar", Some(2014), "first")],
        )));
        registry.register(Arc::new(StubProvider::new(
            "second",
            vec![make_hit("Interstellar", Some(2014), "second")],
        )));

        let hits = registry.search_movie("Interstellar", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].provider_name, "first");
    }

    #[tokio::test]
    async fn search_tolerates_one_failing_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider {
            fail: true,
            ..StubProvider::new("broken", Vec::new())
        }));
        registry.register(Arc::new(StubProvider::new(
            "ok",
            vec![make_hit("Heat", Some(1995), "ok")],
        )));

        let hits = registry.search_movie("Heat", None).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn search_fails_when_every_provider_fails() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider {
            fail: true,
            ..StubProvider::new("broken", Vec::new())
        }));

        assert!(registry.search_movie("Heat", None).await.is_err());
    }

    #[tokio::test]
    async fn search_empty_when_no_providers() {
        let registry = ProviderRegistry::new();
        assert!(registry.search_tv("anything", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn details_routes_to_owning_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider::new("a", Vec::new())));

        let details = registry.details(&make_hit("Heat", None, "a")).await.unwrap();
        assert_eq!(details.title, "movie a-Heat");

        assert!(registry.details(&make_hit("Heat", None, "zzz")).await.is_err());
    }
}
