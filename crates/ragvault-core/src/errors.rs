//! Error types for ragvault-core.

use std::path::PathBuf;

use ragvault_db::DbError;
use ragvault_model::ModelError;
use thiserror::Error;

/// Domain-specific errors for RagVault operations.
///
/// User abort is not an error; it is reported through
/// [`IndexOutcome::aborted`](crate::indexer::IndexOutcome).
#[derive(Error, Debug)]
pub enum RagError {
    // =========================================================================
    // Provider / Parse
    // =========================================================================
    /// The embedding service failed (network, non-2xx, bad payload).
    #[error("Embedding provider error: {0}")]
    Provider(String),

    /// A source document could not be read or parsed.
    #[error("Failed to parse `{path}`: {message}")]
    Parse {
        /// The offending document.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    // =========================================================================
    // Store
    // =========================================================================
    /// A vector does not match the store's fixed dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the store / running config.
        expected: usize,
        /// Dimension actually produced or recorded.
        actual: usize,
    },

    /// The underlying vector store failed.
    #[error("Vector store error: {0}")]
    Store(String),

    /// The operation needs a non-empty store.
    #[error("The vector store is empty. Index some documents first.")]
    EmptyStore,

    /// `initialize_database` has not been called, or a destructive operation
    /// left the handle closed.
    #[error("Vector store not initialized. Run `ragvault init`.")]
    NotInitialized,

    // =========================================================================
    // Snapshots
    // =========================================================================
    /// Snapshot failed validation (format too old, missing model, dimension).
    #[error("Snapshot validation failed: {0}")]
    SnapshotValidation(String),

    /// The named snapshot does not exist.
    #[error("Snapshot `{0}` not found.")]
    SnapshotNotFound(String),

    /// Copying a snapshot's store into place failed.
    #[error("Failed to restore snapshot `{name}`: {message}")]
    SnapshotRestore {
        /// The snapshot being loaded.
        name: String,
        /// Description of the failure.
        message: String,
    },

    /// The named snapshot is the active one and cannot be removed.
    #[error("Snapshot `{0}` is the active snapshot and cannot be deleted.")]
    SnapshotInUse(String),

    // =========================================================================
    // Configuration
    // =========================================================================
    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RagError {
    /// Create a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create a snapshot restore error.
    pub fn snapshot_restore(name: impl Into<String>, message: impl ToString) -> Self {
        Self::SnapshotRestore {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Create a snapshot validation error.
    pub fn snapshot_validation(message: impl Into<String>) -> Self {
        Self::SnapshotValidation(message.into())
    }
}

impl From<DbError> for RagError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<ModelError> for RagError {
    fn from(err: ModelError) -> Self {
        Self::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_from_db() {
        let err: RagError = DbError::DimensionMismatch {
            expected: 1024,
            actual: 768,
        }
        .into();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 1024,
                actual: 768
            }
        ));
        assert!(err.to_string().starts_with("Dimension mismatch"));
    }

    #[test]
    fn test_other_db_errors_become_store() {
        let err: RagError = DbError::internal("table gone").into();
        assert!(matches!(err, RagError::Store(_)));
    }

    #[test]
    fn test_model_error_becomes_provider() {
        let err: RagError = ModelError::provider("503").into();
        assert!(matches!(err, RagError::Provider(_)));
    }
}
