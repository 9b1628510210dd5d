//! Error types for ragvault-model.

use thiserror::Error;

/// Result type alias for ragvault-model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while talking to the embedding service or reranking.
#[derive(Debug, Error)]
pub enum ModelError {
    // ========================================================================
    // Provider errors
    // ========================================================================
    /// The embedding service could not be reached or returned a failure status.
    #[error("Embedding provider error: {message}")]
    Provider { message: String },

    /// The service answered but the body was not what we expected.
    #[error("Invalid response from embedding provider: {message}")]
    InvalidResponse { message: String },

    /// The service returned an empty vector.
    #[error("Embedding provider returned an empty vector for model '{model_id}'")]
    EmptyEmbedding { model_id: String },

    // ========================================================================
    // Inference errors
    // ========================================================================
    /// Reranking failed.
    #[error("Reranking failed for model '{model_id}': {message}")]
    RerankingFailed { model_id: String, message: String },

    // ========================================================================
    // Serialization errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error constructors
// ============================================================================

impl ModelError {
    /// Create a provider error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create a reranking failed error.
    pub fn reranking_failed(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RerankingFailed {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from the transport or service rather than the payload.
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        Self::provider(err.to_string())
    }
}
