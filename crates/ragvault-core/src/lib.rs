//! # ragvault-core
//!
//! **RagVault** – local document knowledge base with dual-embedding retrieval.
//!
//! This crate provides the indexing pipeline, retrieval engine and snapshot
//! manager. It is designed to be consumed by the `ragvault` CLI and other
//! Rust tools.
//!
//! ## Main Types
//!
//! - [`RagEngine`] – the context object behind every operation
//! - [`RagSettings`] / [`IndexConfig`] – process settings and running index config
//! - [`RagError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`chunker`] – plain, Markdown and code-aware chunking
//! - [`config`] – configuration types
//! - [`document`] – document loading (text, code, Markdown, PDF)
//! - [`engine`] – the RagEngine struct, lifecycle, pinned records, stats
//! - [`indexer`] – `add_documents`
//! - [`retrieval`] – `search`, merge and scoring
//! - [`snapshot`] – save / load / append / list snapshots
//! - [`progress`] – progress events and the abort handle
//!
//! ## Example
//!
//! ```ignore
//! use ragvault_core::{RagEngine, RagSettings};
//! use std::path::PathBuf;
//!
//! let engine = RagEngine::from_settings(RagSettings::load(None)?)?;
//! engine.initialize_database().await?;
//!
//! let (tx, mut rx) = ragvault_core::progress_channel();
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         println!("{:?}", event);
//!     }
//! });
//! engine.add_documents(&[PathBuf::from("docs")], Some(tx)).await?;
//!
//! let response = engine.search("how is the cache invalidated?").await?;
//! for hit in response.results {
//!     println!("{:.3} {}", hit.score, hit.file_path);
//! }
//! ```

// Modules
pub mod chunker;
pub mod config;
pub mod constants;
pub mod document;
pub mod engine;
pub mod errors;
pub mod indexer;
pub mod layout;
pub mod progress;
pub mod retrieval;
pub mod snapshot;
pub mod types;

// Re-exports for convenience
pub use chunker::{chunk_code, chunk_document, chunk_markdown, chunk_plain, Chunk};
pub use config::{
    IndexConfig, IndexConfigPatch, IndexerSettings, RagSettings, SnapshotSettings, StoreSettings,
    DEFAULT_CODE_MODEL, DEFAULT_DIMENSION, DEFAULT_TEXT_MODEL,
};
pub use document::{detect_file_type, expand_paths, load_document, Document};
pub use engine::{ModelCompatibility, PinnedRecordInput, RagEngine, StoreStats};
pub use errors::RagError;
pub use indexer::{select_model, FileFailure, IndexOutcome};
pub use layout::DataLayout;
pub use progress::{progress_channel, AbortHandle, ProgressEvent, ProgressReceiver, ProgressSender};
pub use retrieval::{boosted_score, merge_hits, EmbeddingSpace, SearchHit, SearchResponse};
pub use snapshot::{
    sanitize_snapshot_name, ActiveSnapshotPointer, AppendOutcome, CompatibilityReport, LoadOptions,
    LoadOutcome, SaveOptions, SaveOutcome, SnapshotInfo, SnapshotMetadata,
};
pub use types::{
    CodeContext, EmbeddingMode, FileType, IndexRecord, RecordMetadata, RecordType,
};

// Infrastructure re-exports used by callers that inject their own provider
pub use ragvault_model::{EmbeddingProvider, ModelError, RerankerModel};
