//! # ragvault-model
//!
//! Inference layer for RagVault: the embedding service client and reranking.
//!
//! Embeddings come from an external Ollama-compatible HTTP service; this
//! crate never runs a model itself. It provides:
//!
//! - **[`EmbeddingProvider`]**: async embedding of one text with a named model
//! - **[`OllamaEmbeddingClient`]**: the HTTP implementation
//! - **[`prepare_prompt`]**: per-model input preparation
//! - **[`RerankerModel`]** and **[`EmbeddingMagnitudeReranker`]**
//!
//! Test doubles live in consuming crates.
//!
//! ## Usage
//!
//! ```ignore
//! use ragvault_model::{EmbeddingClientConfig, EmbeddingProvider, OllamaEmbeddingClient};
//!
//! let client = OllamaEmbeddingClient::new(EmbeddingClientConfig::default())?;
//! let vector = client.embed("Hello, world!", "nomic-embed-text").await?;
//! ```

pub mod config;
pub mod error;
pub mod prompt;

mod ollama;
mod reranker;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

pub use config::{EmbeddingClientConfig, DEFAULT_BASE_URL};
pub use error::{ModelError, ModelResult};
pub use ollama::OllamaEmbeddingClient;
pub use prompt::prepare_prompt;
pub use reranker::EmbeddingMagnitudeReranker;

// ============================================================================
// Embedding Provider Trait
// ============================================================================

/// Source of dense embeddings.
///
/// The returned dimension is whatever the model produces; callers check it
/// against the store.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text with the given model.
    async fn embed(&self, text: &str, model_id: &str) -> ModelResult<Vec<f32>>;

    /// Models installed on the service.
    async fn available_models(&self) -> ModelResult<Vec<String>>;

    /// Short provider name for logs.
    fn provider_name(&self) -> &str;
}

// ============================================================================
// Reranker Model Trait
// ============================================================================

/// Scores query/candidate pairs. Higher is more relevant.
#[async_trait]
pub trait RerankerModel: Send + Sync {
    /// Score one candidate against the query.
    async fn score(&self, query: &str, candidate: &str) -> ModelResult<f32>;

    /// Score all candidates with at most `concurrency` requests in flight.
    ///
    /// Scores come back in input order.
    async fn score_batch(
        &self,
        query: &str,
        candidates: &[String],
        concurrency: usize,
    ) -> ModelResult<Vec<f32>> {
        let pending: Vec<_> = candidates.iter().map(|c| self.score(query, c)).collect();
        stream::iter(pending)
            .buffered(concurrency.max(1))
            .try_collect()
            .await
    }

    /// Rerank candidates and return `(original_index, score)` sorted by score
    /// descending.
    async fn rerank(
        &self,
        query: &str,
        candidates: &[String],
        concurrency: usize,
    ) -> ModelResult<Vec<(usize, f32)>> {
        let scores = self.score_batch(query, candidates, concurrency).await?;
        let mut indexed: Vec<_> = scores.into_iter().enumerate().collect();
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(indexed)
    }

    /// Get the model ID.
    fn model_id(&self) -> &str;
}

// ============================================================================
// Helpers
// ============================================================================

/// Whether `model_id` appears in a service model listing.
///
/// Ollama lists untagged pulls as `name:latest`, so `name` and `name:latest`
/// are treated as the same model.
pub fn is_model_listed(models: &[String], model_id: &str) -> bool {
    let wanted = model_id.strip_suffix(":latest").unwrap_or(model_id);
    models
        .iter()
        .any(|m| m.strip_suffix(":latest").unwrap_or(m) == wanted)
}
