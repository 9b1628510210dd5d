//! Ollama-compatible embedding service client.
//!
//! Uses `POST /api/embeddings` for single-prompt embeddings and
//! `GET /api/tags` to discover installed models.

use crate::config::EmbeddingClientConfig;
use crate::error::{ModelError, ModelResult};
use crate::prompt::prepare_prompt;
use crate::EmbeddingProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// HTTP client for an Ollama-compatible embedding service.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingClient {
    config: EmbeddingClientConfig,
    http: reqwest::Client,
}

impl OllamaEmbeddingClient {
    /// Build a client from configuration.
    pub fn new(config: EmbeddingClientConfig) -> ModelResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ModelError::provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Client configuration.
    pub fn config(&self) -> &EmbeddingClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.normalized_base_url(), path)
    }

    /// Send a request, retrying 429, 5xx and connection failures with
    /// exponential backoff.
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> ModelResult<reqwest::Response> {
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(250 << (attempt - 1).min(5));
                trace!("Retrying embedding request in {:?}", delay);
                tokio::time::sleep(delay).await;
            }

            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let body = response.text().await.unwrap_or_default();
                    let err = ModelError::provider(format!(
                        "Embedding service returned {}: {}",
                        status, body
                    ));

                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(ModelError::provider(format!(
                        "Cannot reach embedding service at {}: {}",
                        self.config.normalized_base_url(),
                        e
                    )));
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| ModelError::provider("Embedding request failed after retries")))
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingClient {
    async fn embed(&self, text: &str, model_id: &str) -> ModelResult<Vec<f32>> {
        let prompt = prepare_prompt(text, model_id);
        let url = self.url("/api/embeddings");
        trace!("Embedding {} chars with {}", prompt.len(), model_id);

        let response = self
            .send_with_retry(|| {
                self.http.post(&url).json(&EmbeddingRequest {
                    model: model_id,
                    prompt: &prompt,
                })
            })
            .await?;

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ModelError::invalid_response(e.to_string()))?;

        if body.embedding.is_empty() {
            return Err(ModelError::EmptyEmbedding {
                model_id: model_id.to_string(),
            });
        }

        Ok(body.embedding)
    }

    async fn available_models(&self) -> ModelResult<Vec<String>> {
        let url = self.url("/api/tags");
        let response = self.send_with_retry(|| self.http.get(&url)).await?;

        let body: TagsResponse = response
            .json()
            .await
            .map_err(|e| ModelError::invalid_response(e.to_string()))?;

        let models: Vec<String> = body.models.into_iter().map(|m| m.name).collect();
        debug!("Embedding service lists {} models", models.len());
        if models.is_empty() {
            warn!("Embedding service at {} has no models installed", url);
        }
        Ok(models)
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}

// ============================================================================
// Tests
// ============================================================================
