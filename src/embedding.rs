//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and two HTTP backends:
//! - **[`OpenAiEmbedder`]** — calls the OpenAI embeddings API with batching,
//!   retry, and exponential backoff.
//! - **[`OllamaEmbedder`]** — calls a local Ollama server's `/api/embeddings`
//!   endpoint, one text per request.
//!
//! # Retry strategy (OpenAI)
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry; request timeouts surface as [`Error::Timeout`]
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Maps text to a fixed-dimension numeric vector.
///
/// Batch embedding preserves input order: `result[i]` embeds `texts[i]`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text (e.g. a question at query time).
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::EmbeddingUnavailable("empty embedding response".to_string()))
    }
}

impl std::fmt::Debug for dyn EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("model", &self.model_name())
            .finish()
    }
}

/// Instantiate the provider named by the configuration.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        other => Err(Error::InvalidArgument(format!(
            "unknown embedding provider: {other}"
        ))),
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))
}

/// Convert a transport error, keeping deadline overruns distinct.
fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("embedding request timed out: {e}"))
    } else {
        Error::EmbeddingUnavailable(e.to_string())
    }
}

// ============ OpenAI provider ============

pub struct OpenAiEmbedder {
    model: String,
    api_key: String,
    dims: Option<usize>,
    batch_size: usize,
    max_retries: u32,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Requires the `OPENAI_API_KEY` environment variable.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            Error::EmbeddingUnavailable("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            dims: config.dims,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            client: build_client(config.timeout_secs)?,
        })
    }

    async fn embed_one_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = request_body(&self.model, self.dims, texts);

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: OpenAiResponse = response
                            .json()
                            .await
                            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
                        return order_by_index(parsed, texts.len());
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let message = format!("OpenAI API error {status}: {body_text}");

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        debug!(attempt, %status, "retrying embedding batch");
                        last_err = Some(Error::EmbeddingUnavailable(message));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    return Err(Error::EmbeddingUnavailable(message));
                }
                Err(e) if e.is_timeout() => return Err(transport_error(e)),
                Err(e) => {
                    last_err = Some(transport_error(e));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            Error::EmbeddingUnavailable("embedding failed after retries".to_string())
        }))
    }
}

/// Request payload for the embeddings endpoint. `dimensions` is only sent
/// when configured; models that predate it reject the field.
fn request_body(model: &str, dims: Option<usize>, texts: &[String]) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "input": texts,
    });
    if let Some(dims) = dims {
        body["dimensions"] = serde_json::json!(dims);
    }
    body
}

fn order_by_index(parsed: OpenAiResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if parsed.data.len() != expected {
        return Err(Error::EmbeddingUnavailable(format!(
            "expected {expected} embeddings, got {}",
            parsed.data.len()
        )));
    }
    let mut data = parsed.data;
    data.sort_by_key(|item| item.index);
    Ok(data.into_iter().map(|item| item.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_one_batch(batch).await?);
        }
        Ok(vectors)
    }
}

// ============ Ollama provider ============

pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client: build_client(config.timeout_secs)?,
        })
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingUnavailable(format!(
                "Ollama embeddings error {status}: {body_text}"
            )));
        }

        let parsed: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    // Ollama's embeddings endpoint takes one prompt per request; input
    // order is preserved by embedding sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one(text).await?);
        }
        Ok(vectors)
    }
}
