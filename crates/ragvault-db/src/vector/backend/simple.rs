//! Simple file-based vector store backend.
//!
//! Records are kept in memory and persisted to a JSONL file; search is a
//! linear scan. Intended for tests and small stores where a full vector
//! database is not justified.

use super::super::config::{VectorStoreConfig, SIMPLE_BACKEND};
use super::super::record::{RecordFilter, StoredRecord};
use super::super::traits::{VectorHit, VectorStore};
use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Filename for the JSONL data file.
const DATA_FILENAME: &str = "records.jsonl";

/// Simple file-based vector store.
///
/// Keeps insertion order, so scans are deterministic.
pub struct SimpleFileVectorStore {
    /// Path to the store directory.
    path: PathBuf,

    /// Dimension of vectors.
    dimension: usize,

    /// In-memory records.
    records: RwLock<Vec<StoredRecord>>,

    /// Set once `close` has been called.
    closed: AtomicBool,
}

impl SimpleFileVectorStore {
    /// Open or create a simple file vector store.
    pub async fn open(config: &VectorStoreConfig) -> DbResult<Self> {
        debug!("Opening SimpleFileVectorStore at {:?}", config.path);

        let data_path = config.path.join(DATA_FILENAME);
        let records = if data_path.exists() {
            load_from_file(&data_path)?
        } else {
            Vec::new()
        };

        Ok(Self {
            path: config.path.clone(),
            dimension: config.dimension,
            records: RwLock::new(records),
            closed: AtomicBool::new(false),
        })
    }

    fn data_path(&self) -> PathBuf {
        self.path.join(DATA_FILENAME)
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DbError::internal(format!(
                "Vector store at {} has been closed",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// Rewrite the whole data file.
    fn save_all(&self, records: &[StoredRecord]) -> DbResult<()> {
        let data_path = self.data_path();
        debug!("Saving {} records to {:?}", records.len(), data_path);

        let mut file = File::create(&data_path)?;
        for record in records {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{}", line)?;
        }
        file.sync_all()?;
        Ok(())
    }

    /// Append records to the data file.
    fn append_to_file(&self, records: &[StoredRecord]) -> DbResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.data_path())?;
        for record in records {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{}", line)?;
        }
        file.sync_all()?;
        Ok(())
    }
}

/// Load records from a JSONL file, skipping unparseable lines.
fn load_from_file(path: &Path) -> DbResult<Vec<StoredRecord>> {
    debug!("Loading records from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<StoredRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!("Skipping invalid line {}: {}", line_num + 1, e);
            }
        }
    }

    debug!("Loaded {} records", records.len());
    Ok(records)
}

#[async_trait]
impl VectorStore for SimpleFileVectorStore {
    async fn add(&self, records: &[StoredRecord]) -> DbResult<()> {
        self.ensure_open()?;
        if records.is_empty() {
            return Ok(());
        }

        for record in records {
            if record.vector.len() != self.dimension {
                return Err(DbError::DimensionMismatch {
                    expected: self.dimension,
                    actual: record.vector.len(),
                });
            }
        }

        debug!("Adding {} records", records.len());
        let mut stored = self.records.write().await;
        self.append_to_file(records)?;
        stored.extend_from_slice(records);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], limit: usize) -> DbResult<Vec<VectorHit>> {
        self.ensure_open()?;
        trace!("Searching SimpleFileVectorStore, limit={}", limit);

        if embedding.len() != self.dimension {
            return Err(DbError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let stored = self.records.read().await;
        let mut scored: Vec<(f32, &StoredRecord)> = stored
            .iter()
            .map(|r| (1.0 - cosine_similarity(embedding, &r.vector), r))
            .collect();

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let hits: Vec<VectorHit> = scored
            .into_iter()
            .take(limit)
            .map(|(distance, record)| VectorHit::new(record.clone(), distance))
            .collect();

        trace!("Found {} hits", hits.len());
        Ok(hits)
    }

    async fn delete(&self, filter: &RecordFilter) -> DbResult<()> {
        self.ensure_open()?;
        let mut stored = self.records.write().await;
        let before = stored.len();
        stored.retain(|r| !filter.matches(r));
        debug!("Deleted {} records", before - stored.len());
        self.save_all(&stored)
    }

    async fn count(&self) -> DbResult<usize> {
        self.ensure_open()?;
        Ok(self.records.read().await.len())
    }

    async fn scan(&self) -> DbResult<Vec<StoredRecord>> {
        self.ensure_open()?;
        Ok(self.records.read().await.clone())
    }

    async fn sample(&self, limit: usize) -> DbResult<Vec<StoredRecord>> {
        self.ensure_open()?;
        Ok(self
            .records
            .read()
            .await
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn close(&self) -> DbResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend_name(&self) -> &'static str {
        SIMPLE_BACKEND
    }
}

// ============================================================================
// Similarity Functions
// ============================================================================

/// Compute cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================
