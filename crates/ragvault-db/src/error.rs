//! Error types for ragvault-db.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ragvault-db operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in ragvault-db operations.
#[derive(Debug, Error)]
pub enum DbError {
    // ========================================================================
    // Vector store errors
    // ========================================================================
    /// Vector store I/O error.
    #[error("Vector store I/O error at {path}: {message}")]
    StoreIo { path: PathBuf, message: String },

    /// Vector store parse error.
    #[error("Vector store parse error at {path}: {message}")]
    StoreParse { path: PathBuf, message: String },

    /// Vector dimension mismatch.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector store not found.
    #[error("Vector store not found at {path}")]
    StoreNotFound { path: PathBuf },

    /// Vector store incompatible with the requested configuration.
    #[error("Vector store at {path} is incompatible: {reason}")]
    StoreIncompatible { path: PathBuf, reason: String },

    /// LanceDB error.
    #[cfg(feature = "lancedb")]
    #[error("LanceDB error: {message}")]
    LanceDb { message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a store incompatible error.
    pub fn store_incompatible(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StoreIncompatible {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a LanceDB error.
    #[cfg(feature = "lancedb")]
    pub fn lance(message: impl Into<String>) -> Self {
        Self::LanceDb {
            message: message.into(),
        }
    }
}

#[cfg(feature = "lancedb")]
impl From<lancedb::Error> for DbError {
    fn from(err: lancedb::Error) -> Self {
        Self::LanceDb {
            message: err.to_string(),
        }
    }
}
