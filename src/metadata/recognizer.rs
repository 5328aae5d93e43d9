//! AI filename recognizer.
//!
//! A [`Recognizer`] turns a messy filename (and optionally its path) into a
//! cleaned-up guess at what the file is. Its answers are advisory: the
//! resolver re-searches the metadata sources with the cleaned title and only
//! falls back to the raw guess when that fails.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use scenecatalog_common::MediaKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RecognizerConfig;

/// What the recognizer thinks a file is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub clean_title: String,
    #[serde(default)]
    pub media_type: MediaKind,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub alternative_names: Vec<String>,
}

#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, file_name: &str, path: Option<&str>) -> anyhow::Result<Recognition>;
}

const SYSTEM_PROMPT: &str = "You identify movies and TV shows from media file names. \
Reply with a JSON object: {\"clean_title\": string, \"media_type\": \"movie\"|\"tv\"|\"unknown\", \
\"year\": number|null, \"confidence\": number between 0 and 1, \"alternative_names\": [string]}. \
Use the official English title when you know it.";

/// Recognizer backed by an OpenAI-compatible chat-completions endpoint.
pub struct ChatRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl ChatRecognizer {
    pub fn new(config: &RecognizerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Recognizer for ChatRecognizer {
    async fn recognize(&self, file_name: &str, path: Option<&str>) -> anyhow::Result<Recognition> {
        let prompt = match path {
            Some(path) => format!("File name: {file_name}\nPath: {path}"),
            None => format!("File name: {file_name}"),
        };

        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response: ChatResponse = request
            .send()
            .await
            .context("recognizer request failed")?
            .error_for_status()
            .context("recognizer returned error")?
            .json()
            .await
            .context("failed to parse recognizer response")?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("recognizer returned no content")?;

        let mut recognition: Recognition =
            serde_json::from_str(content.trim()).context("recognizer content is not a recognition")?;
        recognition.confidence = recognition.confidence.clamp(0.0, 1.0);

        debug!(
            file_name,
            clean_title = %recognition.clean_title,
            confidence = recognition.confidence,
            "Recognizer answered"
        );
        Ok(recognition)
    }
}
