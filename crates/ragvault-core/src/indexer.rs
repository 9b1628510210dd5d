//! Document indexing: load, chunk, embed and store.
//!
//! Files are processed in input order. Per-file failures (unreadable file,
//! embedding error, wrong dimension) skip the file and are reported through
//! [`ProgressEvent::Error`] and [`IndexOutcome::failures`]. Store write
//! failures end the job with an error.
//!
//! Records are buffered across files and written when the buffer holds
//! `flush_file_threshold` files or `flush_record_threshold` records, and at
//! the end of the job. An abort discards only the unflushed buffer, so the
//! counts in the outcome always match what reached the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use ragvault_db::vector::{StoredRecord, VectorStore};

use crate::chunker::chunk_document;
use crate::config::IndexConfig;
use crate::document::{expand_paths, load_document};
use crate::engine::{check_dimension, RagEngine};
use crate::errors::RagError;
use crate::progress::{emit, ProgressEvent, ProgressSender};
use crate::snapshot::mark_pointer_modified;
use crate::types::{EmbeddingMode, FileType, IndexRecord, RecordMetadata, RecordType};

// ============================================================================
// Types
// ============================================================================

/// A file skipped during indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub message: String,
}

/// Result of [`RagEngine::add_documents`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOutcome {
    /// At least one file was indexed, or there was nothing to index.
    pub success: bool,
    /// The job was stopped by [`RagEngine::abort_indexing`].
    pub aborted: bool,
    pub message: String,
    /// Files whose records reached the store.
    pub files_indexed: usize,
    pub files_skipped: usize,
    /// Records written to the store.
    pub chunks_indexed: usize,
    pub failures: Vec<FileFailure>,
    /// Name of the pre-index backup snapshot, if one was taken.
    pub backup: Option<String>,
    pub duration_ms: u64,
}

/// Embedding model for a file under the configured mode.
pub fn select_model(config: &IndexConfig, file_type: FileType) -> &str {
    match config.embedding_mode {
        EmbeddingMode::ManualText => &config.text_model,
        EmbeddingMode::ManualCode => &config.code_model,
        EmbeddingMode::Auto if file_type == FileType::Code => &config.code_model,
        EmbeddingMode::Auto => &config.text_model,
    }
}

/// Multi-file write buffer.
#[derive(Default)]
struct WriteBuffer {
    records: Vec<StoredRecord>,
    files: usize,
}

impl WriteBuffer {
    fn push(&mut self, records: Vec<StoredRecord>) {
        self.records.extend(records);
        self.files += 1;
    }

    fn is_empty(&self) -> bool {
        self.files == 0
    }
}

// ============================================================================
// Indexing
// ============================================================================

impl RagEngine {
    /// Index files and directories.
    ///
    /// Directories are walked recursively (ignored directories such as `.git`
    /// and `node_modules` are skipped). Progress events are sent to
    /// `progress` when given.
    pub async fn add_documents(
        &self,
        paths: &[PathBuf],
        progress: Option<ProgressSender>,
    ) -> Result<IndexOutcome, RagError> {
        let started = Instant::now();
        self.abort.reset();

        let config = self.config().await;
        let indexer = self.settings().indexer.clone();

        let backup = if self.settings().snapshots.auto_backup_before_index {
            self.auto_backup().await?
        } else {
            None
        };
        // Fetched after the backup; saving reopens the handle
        let store = self.store().await?;

        let files = expand_paths(paths);
        tracing::info!("Indexing {} files", files.len());

        let mut outcome = IndexOutcome {
            backup,
            ..Default::default()
        };
        let mut buffer = WriteBuffer::default();

        for path in &files {
            if self.abort.is_aborted() {
                outcome.aborted = true;
                break;
            }

            let file = path.to_string_lossy().to_string();
            match self
                .index_file(path, &file, &config, indexer.embed_concurrency, progress.as_ref())
                .await
            {
                Ok(Some(records)) => {
                    emit(
                        progress.as_ref(),
                        ProgressEvent::Completed {
                            file: file.clone(),
                            chunks: records.len(),
                        },
                    );
                    buffer.push(records);
                }
                Ok(None) => {
                    outcome.aborted = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", file, e);
                    emit(
                        progress.as_ref(),
                        ProgressEvent::Error {
                            file: file.clone(),
                            message: e.to_string(),
                        },
                    );
                    outcome.files_skipped += 1;
                    outcome.failures.push(FileFailure {
                        file,
                        message: e.to_string(),
                    });
                }
            }

            if buffer.files >= indexer.flush_file_threshold
                || buffer.records.len() >= indexer.flush_record_threshold
            {
                self.flush(&store, &mut buffer, &mut outcome).await?;
            }
        }

        if outcome.aborted {
            if !buffer.is_empty() {
                tracing::info!(
                    "Discarding {} unflushed records from {} files",
                    buffer.records.len(),
                    buffer.files
                );
            }
        } else {
            self.flush(&store, &mut buffer, &mut outcome).await?;
        }

        outcome.success = !outcome.aborted && (outcome.files_indexed > 0 || files.is_empty());
        outcome.message = if outcome.aborted {
            format!(
                "Indexing aborted after {} files ({} chunks)",
                outcome.files_indexed, outcome.chunks_indexed
            )
        } else if files.is_empty() {
            "No files to index".to_string()
        } else {
            format!(
                "Indexed {} files ({} chunks), skipped {}",
                outcome.files_indexed, outcome.chunks_indexed, outcome.files_skipped
            )
        };
        outcome.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!("{} in {}ms", outcome.message, outcome.duration_ms);
        Ok(outcome)
    }

    /// Load, chunk and embed one file. `Ok(None)` means the job was aborted
    /// while embedding.
    async fn index_file(
        &self,
        path: &Path,
        file: &str,
        config: &IndexConfig,
        concurrency: usize,
        progress: Option<&ProgressSender>,
    ) -> Result<Option<Vec<StoredRecord>>, RagError> {
        emit(
            progress,
            ProgressEvent::Parsing {
                file: file.to_string(),
            },
        );
        let doc = load_document(path)?;

        emit(
            progress,
            ProgressEvent::Chunking {
                file: file.to_string(),
            },
        );
        let chunks = chunk_document(&doc, config);
        if chunks.is_empty() {
            return Err(RagError::parse(path, "no chunks produced"));
        }

        let model = select_model(config, doc.file_type);
        tracing::debug!("{}: {} chunks, model {}", file, chunks.len(), model);

        let total = chunks.len();
        let concurrency = concurrency.max(1);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(total);

        for batch in chunks.chunks(concurrency) {
            if self.abort.is_aborted() {
                return Ok(None);
            }

            // buffered keeps chunk order
            let embedded: Vec<Vec<f32>> = stream::iter(
                batch
                    .iter()
                    .map(|chunk| self.embedder.embed(&chunk.text, model)),
            )
            .buffered(concurrency)
            .try_collect()
            .await?;

            for vector in &embedded {
                check_dimension(config.dimension, vector)?;
            }
            vectors.extend(embedded);

            emit(
                progress,
                ProgressEvent::Embedding {
                    file: file.to_string(),
                    done: vectors.len(),
                    total,
                },
            );
        }

        let indexed_at = Utc::now();
        let records = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (chunk, vector))| {
                IndexRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    vector,
                    text: chunk.text,
                    file_path: file.to_string(),
                    metadata: RecordMetadata {
                        record_type: RecordType::File,
                        source: file.to_string(),
                        indexed_at,
                        embedding_model: model.to_string(),
                        file_type: doc.file_type,
                        heading: chunk.heading,
                        heading_level: chunk.heading_level,
                        chunk_index: index,
                        code_context: chunk.code.unwrap_or_default(),
                        ..Default::default()
                    },
                }
                .to_stored()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(records))
    }

    async fn flush(
        &self,
        store: &Arc<dyn VectorStore>,
        buffer: &mut WriteBuffer,
        outcome: &mut IndexOutcome,
    ) -> Result<(), RagError> {
        if buffer.is_empty() {
            return Ok(());
        }

        if !buffer.records.is_empty() {
            store.add(&buffer.records).await?;
        }
        tracing::debug!(
            "Flushed {} records from {} files",
            buffer.records.len(),
            buffer.files
        );

        outcome.files_indexed += buffer.files;
        outcome.chunks_indexed += buffer.records.len();
        *buffer = WriteBuffer::default();

        mark_pointer_modified(self.layout())?;
        Ok(())
    }
}
