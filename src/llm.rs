//! Language-model collaborator.
//!
//! The orchestrator talks to the model through [`LanguageModel`], so test
//! doubles and alternate backends drop in without touching the pipeline.
//! [`OllamaClient`] drives a local Ollama server's `/api/generate` endpoint
//! with a caller-supplied deadline; overrunning it surfaces as
//! [`Error::Timeout`], distinct from a content-level refusal. Generation is
//! not retried; re-issuing a query is the caller's decision and is naturally
//! idempotent.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::GenerationUnavailable(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "requesting completion");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("generation timed out: {e}"))
                } else {
                    Error::GenerationUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::GenerationUnavailable(format!(
                "Ollama generate error {status}: {body_text}"
            )));
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::GenerationUnavailable(e.to_string()))?;
        Ok(parsed.response)
    }
}
