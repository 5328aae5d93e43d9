//! Community hash registry client.
//!
//! `GET /hash/{fingerprint}` answers with a match or 404; `POST /hash`
//! contributes an identification. Any other status is an error the caller
//! logs and moves past.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use scenecatalog_common::MediaKind;
use scenecatalog_db::models::MetadataPatch;
use serde::{Deserialize, Serialize};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// What the registry knows about a fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityMatch {
    pub fingerprint: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub media_type: MediaKind,
    #[serde(default)]
    pub external_ids: BTreeMap<String, String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl CommunityMatch {
    pub fn to_patch(&self) -> MetadataPatch {
        MetadataPatch {
            title: Some(self.title.clone()),
            year: self.year,
            kind: Some(self.media_type).filter(|k| k.is_known()),
            external_ids: self.external_ids.clone(),
            ..MetadataPatch::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Submission<'a> {
    pub fingerprint: &'a str,
    pub metadata: &'a MetadataPatch,
    pub confidence: f64,
}

#[async_trait]
pub trait CommunityRegistry: Send + Sync {
    async fn lookup(&self, fingerprint: &str) -> anyhow::Result<Option<CommunityMatch>>;

    async fn submit(&self, submission: &Submission<'_>) -> anyhow::Result<()>;
}

pub struct CommunityRegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl CommunityRegistryClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CommunityRegistry for CommunityRegistryClient {
    async fn lookup(&self, fingerprint: &str) -> anyhow::Result<Option<CommunityMatch>> {
        let url = format!("{}/hash/{fingerprint}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("hash registry request failed: {url}"))?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!(fingerprint, "Fingerprint unknown to registry");
            return Ok(None);
        }

        let found = resp
            .error_for_status()
            .context("hash registry returned error")?
            .json()
            .await
            .context("failed to parse hash registry response")?;
        Ok(Some(found))
    }

    async fn submit(&self, submission: &Submission<'_>) -> anyhow::Result<()> {
        let url = format!("{}/hash", self.base_url);
        self.client
            .post(&url)
            .json(submission)
            .send()
            .await
            .with_context(|| format!("hash registry request failed: {url}"))?
            .error_for_status()
            .context("hash registry rejected submission")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lookup_hit_and_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hash/c1:00000000000000aa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "fingerprint": "c1:00000000000000aa",
                "title": "Heat",
                "year": 1995,
                "media_type": "movie",
                "external_ids": { "tmdb": "949" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hash/c1:00000000000000bb"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = CommunityRegistryClient::new(&server.uri()).unwrap();
        let hit = client.lookup("c1:00000000000000aa").await.unwrap().unwrap();
        assert_eq!(hit.title, "Heat");
        assert_eq!(hit.media_type, MediaKind::Movie);
        assert_eq!(hit.to_patch().year, Some(1995));

        assert!(client.lookup("c1:00000000000000bb").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = CommunityRegistryClient::new(&server.uri()).unwrap();
        assert!(client.lookup("c1:0").await.is_err());
    }

    #[tokio::test]
    async fn submit_posts_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hash"))
            .and(body_partial_json(serde_json::json!({
                "fingerprint": "m1:1",
                "confidence": 0.9
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = CommunityRegistryClient::new(&format!("{}/", server.uri())).unwrap();
        let metadata = MetadataPatch {
            title: Some("Heat".into()),
            ..MetadataPatch::default()
        };
        client
            .submit(&Submission {
                fingerprint: "m1:1",
                metadata: &metadata,
                confidence: 0.9,
            })
            .await
            .unwrap();
    }
}
