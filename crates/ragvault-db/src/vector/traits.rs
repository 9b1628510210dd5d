//! Vector store traits and core types.
//!
//! This module defines the core abstraction for vector storage backends.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::record::{RecordFilter, StoredRecord};
use crate::error::DbResult;

// ============================================================================
// VectorHit
// ============================================================================

/// A single result from a nearest-neighbor search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHit {
    /// The matched record. The vector is not guaranteed to be populated.
    pub record: StoredRecord,

    /// Distance to the query (lower is more similar).
    pub distance: f32,
}

impl VectorHit {
    /// Create a new hit.
    pub fn new(record: StoredRecord, distance: f32) -> Self {
        Self { record, distance }
    }
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// Core trait for vector store backends.
///
/// ## Implementation Notes
///
/// - Backends must be `Send + Sync`; the engine shares one handle behind an `Arc`.
/// - `search` returns hits sorted by distance, nearest first.
/// - `add` is append-only. Records with a vector of the wrong length are
///   rejected with `DbError::DimensionMismatch` before anything is written.
/// - `close` releases file handles so the store directory can be copied or
///   replaced. The handle must not be used afterwards.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append records to the store.
    async fn add(&self, records: &[StoredRecord]) -> DbResult<()>;

    /// Nearest-neighbor search by cosine distance.
    async fn search(&self, embedding: &[f32], limit: usize) -> DbResult<Vec<VectorHit>>;

    /// Delete every record matching the filter.
    async fn delete(&self, filter: &RecordFilter) -> DbResult<()>;

    /// Number of records in the store.
    async fn count(&self) -> DbResult<usize>;

    /// Read every record, vectors included.
    async fn scan(&self) -> DbResult<Vec<StoredRecord>>;

    /// Read up to `limit` records, vectors included.
    async fn sample(&self, limit: usize) -> DbResult<Vec<StoredRecord>> {
        let mut records = self.scan().await?;
        records.truncate(limit);
        Ok(records)
    }

    /// Distinct file paths currently stored.
    async fn file_paths(&self) -> DbResult<HashSet<String>> {
        Ok(self
            .scan()
            .await?
            .into_iter()
            .map(|r| r.file_path)
            .collect())
    }

    /// Check if the store is empty.
    async fn is_empty(&self) -> DbResult<bool> {
        Ok(self.count().await? == 0)
    }

    /// Release the underlying storage handles.
    async fn close(&self) -> DbResult<()> {
        Ok(())
    }

    /// Get the dimension of vectors in this store.
    fn dimension(&self) -> usize;

    /// Backend name (e.g. "lancedb", "simple").
    fn backend_name(&self) -> &'static str;
}
