//! Vector store backend implementations.
//!
//! ## Available Backends
//!
//! - `lancedb` (default feature): LanceDB with ANN search
//! - `simple`: JSONL file with linear scan, for tests and small stores

#[cfg(feature = "lancedb")]
mod lancedb;

mod simple;

#[cfg(feature = "lancedb")]
pub use self::lancedb::LanceDbVectorStore;

pub use simple::SimpleFileVectorStore;

use super::config::{
    inspect_store, write_store_meta, StoreMeta, StoreState, VectorStoreConfig, DEFAULT_BACKEND,
    SIMPLE_BACKEND,
};
use super::traits::VectorStore;
use crate::error::{DbError, DbResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Open the store at `config.path`, creating it when allowed.
///
/// Fails when the existing store has another dimension or backend, when
/// the store is missing and `create_if_missing` is off, or when the backend
/// is unknown or compiled out.
pub async fn open_vector_store(config: &VectorStoreConfig) -> DbResult<Arc<dyn VectorStore>> {
    debug!("Opening vector store at {:?}", config.path);

    if let StoreState::Missing = inspect_store(config)? {
        if !config.create_if_missing {
            return Err(DbError::StoreNotFound {
                path: config.path.clone(),
            });
        }
        info!("Creating {} store at {:?}", config.backend, config.path);
        write_store_meta(&config.path, &StoreMeta::new(&config.backend, config.dimension))?;
    }

    match config.backend.as_str() {
        #[cfg(feature = "lancedb")]
        DEFAULT_BACKEND => {
            let store = LanceDbVectorStore::open(config).await?;
            Ok(Arc::new(store))
        }

        SIMPLE_BACKEND => {
            let store = SimpleFileVectorStore::open(config).await?;
            Ok(Arc::new(store))
        }

        backend => Err(DbError::Config {
            message: format!(
                "Unknown or disabled backend: '{}'. Available backends: {}",
                backend,
                available_backends().join(", ")
            ),
        }),
    }
}

/// Get a list of available backend names.
#[allow(clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<&'static str> {
    let mut backends = Vec::new();

    #[cfg(feature = "lancedb")]
    backends.push(DEFAULT_BACKEND);

    backends.push(SIMPLE_BACKEND);

    backends
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::record::StoredRecord;
    use tempfile::TempDir;

    #[test]
    fn test_available_backends() {
        let backends = available_backends();
        assert!(backends.contains(&SIMPLE_BACKEND));
    }

    #[tokio::test]
    async fn test_open_creates_meta_and_rejects_other_dimension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store");

        let config = VectorStoreConfig::new(3, &path).with_backend(SIMPLE_BACKEND);
        let store = open_vector_store(&config).await.unwrap();
        store
            .add(&[StoredRecord::new("a", vec![1.0, 0.0, 0.0], "alpha", "a.txt")])
            .await
            .unwrap();
        store.close().await.unwrap();
        assert!(path.join("store.meta.json").exists());

        let other = VectorStoreConfig::new(4, &path).with_backend(SIMPLE_BACKEND);
        let err = open_vector_store(&other).await.err().unwrap();
        assert!(matches!(
            err,
            DbError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_open_missing_without_create() {
        let temp = TempDir::new().unwrap();
        let config = VectorStoreConfig::new(3, temp.path().join("missing"))
            .with_backend(SIMPLE_BACKEND)
            .with_create_if_missing(false);
        let err = open_vector_store(&config).await.err().unwrap();
        assert!(matches!(err, DbError::StoreNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let temp = TempDir::new().unwrap();
        let config = VectorStoreConfig::new(3, temp.path().join("s")).with_backend("faiss");
        let err = open_vector_store(&config).await.err().unwrap();
        assert!(err.to_string().contains("faiss"));
    }
}
