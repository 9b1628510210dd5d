//! Store configuration and the `store.meta.json` file kept in every store
//! directory.
//!
//! All stores rank by cosine distance, so the metadata only pins the backend
//! and the vector dimension. A store directory copied into a snapshot carries
//! its metadata with it.

use crate::error::{DbError, DbResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default backend name.
pub const DEFAULT_BACKEND: &str = "lancedb";

/// Name of the JSONL backend.
pub const SIMPLE_BACKEND: &str = "simple";

pub const STORE_META_FILENAME: &str = "store.meta.json";

/// LanceDB table holding every record.
pub const LANCEDB_TABLE_NAME: &str = "chunks";

/// Where and how to open a store.
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub dimension: usize,
    pub path: PathBuf,
    /// "lancedb" or "simple".
    pub backend: String,
    /// Create an empty store when `path` holds none.
    pub create_if_missing: bool,
}

impl VectorStoreConfig {
    pub fn new(dimension: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            dimension,
            path: path.into(),
            backend: DEFAULT_BACKEND.to_string(),
            create_if_missing: true,
        }
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

/// Contents of `store.meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMeta {
    pub backend: String,
    pub dimension: usize,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// RFC 3339 creation time.
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_schema_version() -> u32 {
    1
}

impl StoreMeta {
    pub fn new(backend: impl Into<String>, dimension: usize) -> Self {
        Self {
            backend: backend.into(),
            dimension,
            schema_version: default_schema_version(),
            created_at: Some(Utc::now().to_rfc3339()),
        }
    }
}

/// What `inspect_store` found at a config's path.
#[derive(Debug)]
pub enum StoreState {
    /// No store yet. An empty directory counts as missing.
    Missing,
    /// A store whose metadata matches the config.
    Ready(StoreMeta),
}

/// Look at the store directory without opening it.
///
/// A store with another dimension fails with
/// [`DbError::DimensionMismatch`]; another backend, a directory with data but
/// no metadata, or unreadable metadata fail with
/// [`DbError::StoreIncompatible`].
pub fn inspect_store(config: &VectorStoreConfig) -> DbResult<StoreState> {
    let path = &config.path;
    if !path.join(STORE_META_FILENAME).exists() {
        let has_entries = fs::read_dir(path)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if has_entries {
            return Err(DbError::store_incompatible(
                path,
                "directory has data but no store metadata",
            ));
        }
        return Ok(StoreState::Missing);
    }

    let meta = load_store_meta(path)
        .map_err(|e| DbError::store_incompatible(path, e.to_string()))?;
    if meta.dimension != config.dimension {
        return Err(DbError::DimensionMismatch {
            expected: config.dimension,
            actual: meta.dimension,
        });
    }
    if meta.backend != config.backend {
        return Err(DbError::store_incompatible(
            path,
            format!(
                "built with the '{}' backend, '{}' requested",
                meta.backend, config.backend
            ),
        ));
    }
    Ok(StoreState::Ready(meta))
}

pub fn load_store_meta(path: &Path) -> DbResult<StoreMeta> {
    let meta_path = path.join(STORE_META_FILENAME);
    debug!("Loading store metadata from {:?}", meta_path);

    let content = fs::read_to_string(&meta_path).map_err(|e| DbError::StoreIo {
        path: meta_path.clone(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| DbError::StoreParse {
        path: meta_path,
        message: e.to_string(),
    })
}

pub fn write_store_meta(path: &Path, meta: &StoreMeta) -> DbResult<()> {
    fs::create_dir_all(path)?;
    fs::write(
        path.join(STORE_META_FILENAME),
        serde_json::to_string_pretty(meta)?,
    )?;
    Ok(())
}
