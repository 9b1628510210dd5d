//! Vector store module for ragvault-db.
//!
//! ## Available Backends
//!
//! - `lancedb` (default): LanceDB with ANN search
//! - `simple`: JSONL file backend for tests and small stores
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

mod backend;
mod config;
mod record;
mod traits;

// Re-export main types
pub use config::{
    inspect_store, load_store_meta, write_store_meta, StoreMeta, StoreState, VectorStoreConfig,
    DEFAULT_BACKEND, LANCEDB_TABLE_NAME, SIMPLE_BACKEND, STORE_META_FILENAME,
};
pub use record::{RecordFilter, StoredRecord, RECORD_TYPE_FILE};
pub use traits::{VectorHit, VectorStore};

// Re-export backend factory function
pub use backend::{available_backends, open_vector_store};

// Re-export backends
#[cfg(feature = "lancedb")]
pub use backend::LanceDbVectorStore;

pub use backend::SimpleFileVectorStore;
