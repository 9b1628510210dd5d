//! Embedding-magnitude reranker.
//!
//! Scores a candidate by the L2 norm of the embedding of
//! `"{query}\n\n{candidate}"`. This is a heuristic, not a cross-encoder; a
//! real cross-encoder plugs in behind [`RerankerModel`].

use crate::error::{ModelError, ModelResult};
use crate::{EmbeddingProvider, RerankerModel};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

/// Reranker that uses an embedding model's output magnitude as the score.
pub struct EmbeddingMagnitudeReranker {
    provider: Arc<dyn EmbeddingProvider>,
    model_id: String,
}

impl EmbeddingMagnitudeReranker {
    /// Create a reranker backed by `provider` using `model_id`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
        }
    }
}

impl std::fmt::Debug for EmbeddingMagnitudeReranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingMagnitudeReranker")
            .field("provider", &self.provider.provider_name())
            .field("model_id", &self.model_id)
            .finish()
    }
}

#[async_trait]
impl RerankerModel for EmbeddingMagnitudeReranker {
    async fn score(&self, query: &str, candidate: &str) -> ModelResult<f32> {
        let input = format!("{}\n\n{}", query, candidate);
        let vector = self
            .provider
            .embed(&input, &self.model_id)
            .await
            .map_err(|e| ModelError::reranking_failed(&self.model_id, e.to_string()))?;

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        trace!("Rerank score {:.4} for {} chars", norm, candidate.len());
        Ok(norm)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns a vector whose norm equals the number of words in the prompt.
    struct WordCountEmbedder;

    #[async_trait]
    impl EmbeddingProvider for WordCountEmbedder {
        async fn embed(&self, text: &str, _model_id: &str) -> ModelResult<Vec<f32>> {
            Ok(vec![text.split_whitespace().count() as f32, 0.0])
        }

        async fn available_models(&self) -> ModelResult<Vec<String>> {
            Ok(vec!["wc".into()])
        }

        fn provider_name(&self) -> &str {
            "word-count"
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _text: &str, _model_id: &str) -> ModelResult<Vec<f32>> {
            Err(ModelError::provider("down"))
        }

        async fn available_models(&self) -> ModelResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn provider_name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_rerank_orders_by_magnitude() {
        let reranker = EmbeddingMagnitudeReranker::new(Arc::new(WordCountEmbedder), "wc");
        let docs = vec![
            "short".to_string(),
            "a much longer candidate passage".to_string(),
            "two words".to_string(),
        ];

        let ranked = reranker.rerank("query", &docs, 2).await.unwrap();
        let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!((ranked[0].1 - 6.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_failure_maps_to_reranking_failed() {
        let reranker = EmbeddingMagnitudeReranker::new(Arc::new(FailingEmbedder), "x");
        let err = reranker.score("q", "c").await.unwrap_err();
        assert!(matches!(err, ModelError::RerankingFailed { .. }));
    }
}
