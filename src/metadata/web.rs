//! Free-text web search, the last resolution tier.
//!
//! No backend ships by default; the web tier is only added to the resolver
//! when a [`WebSearch`] implementation is supplied.

use async_trait::async_trait;

use super::provider::SearchHit;

#[async_trait]
pub trait WebSearch: Send + Sync {
    fn name(&self) -> &str;

    /// Search for `query` (title plus optional year) and return hits ranked
    /// by the backend. Ids are backend specific, usually result URLs.
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>>;
}
