//! # ragvault-db
//!
//! Storage layer for RagVault - the vector store that holds indexed chunks.
//!
//! This crate keeps the storage engine isolated from the retrieval pipeline in
//! `ragvault-core`:
//!
//! - Changes to `ragvault-core` compile fast (no heavy DB deps)
//! - Backends can be swapped without touching the indexing/search logic
//! - Tests run against the dependency-free simple backend
//!
//! ## Architecture
//!
//! ```text
//! ragvault-cli → ragvault-core → (VectorStore trait)
//!                     ↑
//!                ragvault-db (LanceDB / simple JSONL backends)
//!                ragvault-model (embedding service client, reranker)
//! ```
//!
//! ## Features
//!
//! - `lancedb` (default): LanceDB vector storage with ANN search
//!
//! The simple JSONL backend is always available.
//!
//! ## Usage
//!
//! ```ignore
//! use ragvault_db::vector::{open_vector_store, VectorStoreConfig};
//!
//! let config = VectorStoreConfig::new(1024, "/path/to/store");
//! let store = open_vector_store(&config).await?;
//!
//! store.add(&records).await?;
//! let hits = store.search(&embedding, 10).await?;
//! ```

pub mod error;
pub mod vector;

pub use error::{DbError, DbResult};
