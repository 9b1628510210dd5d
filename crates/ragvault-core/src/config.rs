//! Configuration types for RagVault.
//!
//! - [`IndexConfig`]: the running index configuration (models, dimension,
//!   chunking, retrieval). Recorded in every snapshot.
//! - [`IndexConfigPatch`]: partial update applied by `RagEngine::set_config`.
//! - [`RagSettings`]: process settings loaded from `~/.ragvault/config.yaml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    CONFIG_ENV, CONFIG_FILENAME, DATA_DIR_ENV, DEFAULT_DATA_SUBDIR, RAGVAULT_HOME_DIR,
};
use crate::errors::RagError;
use crate::types::EmbeddingMode;
use ragvault_db::vector::DEFAULT_BACKEND;
use ragvault_model::EmbeddingClientConfig;

// ======================================================================
// Defaults
// ======================================================================

/// Default prose embedding model.
pub const DEFAULT_TEXT_MODEL: &str = "mxbai-embed-large";

/// Default code embedding model.
pub const DEFAULT_CODE_MODEL: &str = "qwen3-embedding:0.6b";

/// Output dimension shared by the default models.
pub const DEFAULT_DIMENSION: usize = 1024;

/// Default chunk size in tokens.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Default chunk overlap in tokens.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Default candidates retrieved per embedding space.
pub const DEFAULT_RETRIEVE_TOP_K: usize = 20;

/// Default results kept after ranking.
pub const DEFAULT_RERANK_TOP_N: usize = 5;

/// Default concurrent embedding requests per batch.
pub const DEFAULT_EMBED_CONCURRENCY: usize = 5;

/// Default number of files buffered before a store write.
pub const DEFAULT_FLUSH_FILE_THRESHOLD: usize = 50;

/// Default number of records buffered before a store write.
pub const DEFAULT_FLUSH_RECORD_THRESHOLD: usize = 500;

/// Default batch size when appending snapshot records.
pub const DEFAULT_APPEND_BATCH_SIZE: usize = 500;

// ============================================================================
// IndexConfig
// ============================================================================

/// Index configuration. The dimension is fixed for the lifetime of a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Embedding model for prose.
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Embedding model for source code.
    #[serde(default = "default_code_model")]
    pub code_model: String,

    #[serde(default)]
    pub embedding_mode: EmbeddingMode,

    /// Vector dimension; both models must produce it.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Model used by the reranker. Falls back to the text model.
    #[serde(default)]
    pub reranker_model: Option<String>,

    /// Chunk size in tokens (about 4 characters each).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chunk overlap in tokens.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Split Markdown by headings instead of fixed windows.
    #[serde(default = "default_true")]
    pub semantic_chunking: bool,

    /// Candidates retrieved per embedding space.
    #[serde(default = "default_retrieve_top_k")]
    pub retrieve_top_k: usize,

    /// Results returned after ranking.
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,

    #[serde(default)]
    pub use_reranking: bool,
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

fn default_code_model() -> String {
    DEFAULT_CODE_MODEL.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_true() -> bool {
    true
}

fn default_retrieve_top_k() -> usize {
    DEFAULT_RETRIEVE_TOP_K
}

fn default_rerank_top_n() -> usize {
    DEFAULT_RERANK_TOP_N
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            text_model: default_text_model(),
            code_model: default_code_model(),
            embedding_mode: EmbeddingMode::Auto,
            dimension: DEFAULT_DIMENSION,
            reranker_model: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            semantic_chunking: true,
            retrieve_top_k: DEFAULT_RETRIEVE_TOP_K,
            rerank_top_n: DEFAULT_RERANK_TOP_N,
            use_reranking: false,
        }
    }
}

impl IndexConfig {
    /// Model the reranker embeds with.
    pub fn effective_reranker_model(&self) -> &str {
        self.reranker_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.text_model)
    }

    /// Validate the configuration.
    ///
    /// Returns warnings for questionable values and an error for values the
    /// engine cannot run with.
    pub fn validate(&self) -> Result<Vec<String>, RagError> {
        let mut warnings = Vec::new();

        if self.text_model.trim().is_empty() || self.code_model.trim().is_empty() {
            return Err(RagError::invalid_config(
                "text_model and code_model must be set",
                "Name an installed embedding model for both",
            ));
        }

        if self.dimension == 0 {
            return Err(RagError::invalid_config(
                "dimension cannot be 0",
                "Set dimension to the output size of your embedding models",
            ));
        }

        if self.chunk_size == 0 {
            return Err(RagError::invalid_config(
                "chunk_size cannot be 0",
                "Set chunk_size to a positive number of tokens (e.g., 512)",
            ));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::invalid_config(
                format!(
                    "chunk_overlap ({}) must be smaller than chunk_size ({})",
                    self.chunk_overlap, self.chunk_size
                ),
                "Lower chunk_overlap",
            ));
        }

        if self.retrieve_top_k == 0 || self.rerank_top_n == 0 {
            return Err(RagError::invalid_config(
                "retrieve_top_k and rerank_top_n must be at least 1",
                "Use the defaults (20 and 5) if unsure",
            ));
        }

        if self.rerank_top_n > self.retrieve_top_k * 2 {
            warnings.push(format!(
                "rerank_top_n ({}) exceeds the candidate pool (2 x retrieve_top_k = {})",
                self.rerank_top_n,
                self.retrieve_top_k * 2
            ));
        }

        if self.chunk_size > 8192 {
            warnings.push(format!(
                "chunk_size ({}) is very large; most embedding models truncate long inputs",
                self.chunk_size
            ));
        }

        if self.text_model == self.code_model {
            warnings.push(
                "text_model and code_model are the same; both search spaces will be identical"
                    .to_string(),
            );
        }

        Ok(warnings)
    }
}

// ============================================================================
// IndexConfigPatch
// ============================================================================

/// Partial update to [`IndexConfig`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfigPatch {
    pub text_model: Option<String>,
    pub code_model: Option<String>,
    pub embedding_mode: Option<EmbeddingMode>,
    pub dimension: Option<usize>,
    /// An empty string clears the reranker model.
    pub reranker_model: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub semantic_chunking: Option<bool>,
    pub retrieve_top_k: Option<usize>,
    pub rerank_top_n: Option<usize>,
    pub use_reranking: Option<bool>,
}

impl IndexConfigPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch, returning the updated configuration.
    pub fn apply_to(&self, base: &IndexConfig) -> IndexConfig {
        let mut config = base.clone();
        if let Some(v) = &self.text_model {
            config.text_model = v.clone();
        }
        if let Some(v) = &self.code_model {
            config.code_model = v.clone();
        }
        if let Some(v) = self.embedding_mode {
            config.embedding_mode = v;
        }
        if let Some(v) = self.dimension {
            config.dimension = v;
        }
        if let Some(v) = &self.reranker_model {
            config.reranker_model = if v.is_empty() { None } else { Some(v.clone()) };
        }
        if let Some(v) = self.chunk_size {
            config.chunk_size = v;
        }
        if let Some(v) = self.chunk_overlap {
            config.chunk_overlap = v;
        }
        if let Some(v) = self.semantic_chunking {
            config.semantic_chunking = v;
        }
        if let Some(v) = self.retrieve_top_k {
            config.retrieve_top_k = v;
        }
        if let Some(v) = self.rerank_top_n {
            config.rerank_top_n = v;
        }
        if let Some(v) = self.use_reranking {
            config.use_reranking = v;
        }
        config
    }

    /// Set a single field from a `key=value` style pair, as used by the CLI.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), RagError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, RagError> {
            value.parse::<T>().map_err(|_| {
                RagError::invalid_config(
                    format!("invalid value '{}' for {}", value, key),
                    "Check the expected type with `ragvault config show`",
                )
            })
        }

        match key {
            "text_model" => self.text_model = Some(value.to_string()),
            "code_model" => self.code_model = Some(value.to_string()),
            "embedding_mode" => {
                self.embedding_mode = Some(
                    value
                        .parse::<EmbeddingMode>()
                        .map_err(|e| RagError::invalid_config(e, "See `ragvault config show`"))?,
                )
            }
            "dimension" => self.dimension = Some(parse(key, value)?),
            "reranker_model" => self.reranker_model = Some(value.to_string()),
            "chunk_size" => self.chunk_size = Some(parse(key, value)?),
            "chunk_overlap" => self.chunk_overlap = Some(parse(key, value)?),
            "semantic_chunking" => self.semantic_chunking = Some(parse(key, value)?),
            "retrieve_top_k" => self.retrieve_top_k = Some(parse(key, value)?),
            "rerank_top_n" => self.rerank_top_n = Some(parse(key, value)?),
            "use_reranking" => self.use_reranking = Some(parse(key, value)?),
            other => {
                return Err(RagError::invalid_config(
                    format!("unknown config key '{}'", other),
                    "Valid keys: text_model, code_model, embedding_mode, dimension, \
                     reranker_model, chunk_size, chunk_overlap, semantic_chunking, \
                     retrieve_top_k, rerank_top_n, use_reranking",
                ))
            }
        }
        Ok(())
    }
}

// ============================================================================
// Settings sections
// ============================================================================

/// Indexer tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerSettings {
    /// Concurrent embedding requests per batch.
    #[serde(default = "default_embed_concurrency")]
    pub embed_concurrency: usize,

    /// Flush the write buffer after this many files.
    #[serde(default = "default_flush_file_threshold")]
    pub flush_file_threshold: usize,

    /// Flush the write buffer after this many records.
    #[serde(default = "default_flush_record_threshold")]
    pub flush_record_threshold: usize,
}

fn default_embed_concurrency() -> usize {
    DEFAULT_EMBED_CONCURRENCY
}

fn default_flush_file_threshold() -> usize {
    DEFAULT_FLUSH_FILE_THRESHOLD
}

fn default_flush_record_threshold() -> usize {
    DEFAULT_FLUSH_RECORD_THRESHOLD
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            embed_concurrency: DEFAULT_EMBED_CONCURRENCY,
            flush_file_threshold: DEFAULT_FLUSH_FILE_THRESHOLD,
            flush_record_threshold: DEFAULT_FLUSH_RECORD_THRESHOLD,
        }
    }
}

impl IndexerSettings {
    pub fn validate(&self) -> Result<Vec<String>, RagError> {
        let mut warnings = Vec::new();

        if self.embed_concurrency == 0 {
            return Err(RagError::invalid_config(
                "indexer.embed_concurrency cannot be 0",
                "Set embed_concurrency to at least 1 (default: 5)",
            ));
        }

        if self.flush_file_threshold == 0 || self.flush_record_threshold == 0 {
            return Err(RagError::invalid_config(
                "indexer flush thresholds cannot be 0",
                "Use the defaults (50 files / 500 records) if unsure",
            ));
        }

        if self.embed_concurrency > 32 {
            warnings.push(format!(
                "indexer.embed_concurrency ({}) is high; the embedding service may throttle",
                self.embed_concurrency
            ));
        }

        Ok(warnings)
    }
}

/// Snapshot behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSettings {
    /// Records per insert when appending a snapshot.
    #[serde(default = "default_append_batch_size")]
    pub append_batch_size: usize,

    /// Back up a non-empty store before each indexing job.
    #[serde(default)]
    pub auto_backup_before_index: bool,
}

fn default_append_batch_size() -> usize {
    DEFAULT_APPEND_BATCH_SIZE
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            append_batch_size: DEFAULT_APPEND_BATCH_SIZE,
            auto_backup_before_index: false,
        }
    }
}

/// Vector store selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Backend name ("lancedb" or "simple").
    #[serde(default = "default_store_backend")]
    pub backend: String,
}

fn default_store_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
        }
    }
}

// ============================================================================
// RagSettings
// ============================================================================

/// Process-level settings.
///
/// # Example YAML
///
/// ```yaml
/// data_dir: /var/lib/ragvault
/// embedding:
///   base_url: http://localhost:11434
///   timeout_secs: 60
/// index:
///   text_model: mxbai-embed-large
///   code_model: qwen3-embedding:0.6b
///   dimension: 1024
///   use_reranking: true
/// indexer:
///   embed_concurrency: 5
/// snapshots:
///   auto_backup_before_index: true
/// store:
///   backend: lancedb
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagSettings {
    /// Data directory. Defaults to `~/.ragvault/data`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub embedding: EmbeddingClientConfig,

    /// Initial index configuration.
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub indexer: IndexerSettings,

    #[serde(default)]
    pub snapshots: SnapshotSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl RagSettings {
    /// Load settings from an explicit path, `$RAGVAULT_CONFIG`, or the default
    /// location, in that order.
    pub fn load(explicit: Option<&Path>) -> Result<Self, RagError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Self::from_path(Path::new(&path));
            }
        }

        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default settings");
                Ok(Self::default())
            }
        }
    }

    /// Load settings from a specific path.
    ///
    /// If the file does not exist, returns defaults.
    pub fn from_path(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            tracing::debug!("Settings not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| RagError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let settings: Self = serde_yaml::from_str(&content)
            .map_err(|e| RagError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        let warnings = settings.validate()?;
        for warning in warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(settings)
    }

    /// Write settings as YAML.
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<Vec<String>, RagError> {
        let mut all_warnings = Vec::new();

        all_warnings.extend(self.index.validate()?);
        all_warnings.extend(self.indexer.validate()?);

        if self.snapshots.append_batch_size == 0 {
            return Err(RagError::invalid_config(
                "snapshots.append_batch_size cannot be 0",
                "Set append_batch_size to at least 1 (default: 500)",
            ));
        }

        if self.embedding.timeout_secs == 0 {
            all_warnings.push(
                "embedding.timeout_secs is 0; requests will fail immediately".to_string(),
            );
        }

        Ok(all_warnings)
    }

    /// Default home directory (`~/.ragvault`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(RAGVAULT_HOME_DIR))
    }

    /// Default settings path (`~/.ragvault/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(CONFIG_FILENAME))
    }

    /// Data directory: `data_dir`, else `$RAGVAULT_DATA_DIR`, else
    /// `~/.ragvault/data`, else `./.ragvault/data`.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
        Self::default_dir()
            .unwrap_or_else(|| PathBuf::from(RAGVAULT_HOME_DIR))
            .join(DEFAULT_DATA_SUBDIR)
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Set the initial index configuration.
    pub fn with_index(mut self, index: IndexConfig) -> Self {
        self.index = index;
        self
    }

    /// Set the store backend.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.store.backend = backend.into();
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_validate() {
        let warnings = RagSettings::default().validate().unwrap();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let config = IndexConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RagError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let config = IndexConfig {
            dimension: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_models_warns() {
        let config = IndexConfig {
            code_model: DEFAULT_TEXT_MODEL.to_string(),
            ..Default::default()
        };
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = RagSettings::from_path(&temp.path().join("nope.yaml")).unwrap();
        assert_eq!(settings, RagSettings::default());
    }

    #[test]
    fn test_partial_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(
            &path,
            "data_dir: /tmp/rv\nindex:\n  dimension: 768\n  embedding_mode: manual-text\nstore:\n  backend: simple\n",
        )
        .unwrap();

        let settings = RagSettings::from_path(&path).unwrap();
        assert_eq!(settings.data_dir, Some(PathBuf::from("/tmp/rv")));
        assert_eq!(settings.index.dimension, 768);
        assert_eq!(settings.index.embedding_mode, EmbeddingMode::ManualText);
        assert_eq!(settings.index.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(settings.store.backend, "simple");
        assert_eq!(settings.indexer.embed_concurrency, DEFAULT_EMBED_CONCURRENCY);
    }

    #[test]
    fn test_invalid_yaml_value_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "indexer:\n  embed_concurrency: 0\n").unwrap();
        assert!(matches!(
            RagSettings::from_path(&path),
            Err(RagError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.yaml");
        let settings = RagSettings::default()
            .with_data_dir("/srv/rv")
            .with_backend("simple");
        settings.save(&path).unwrap();
        assert_eq!(RagSettings::from_path(&path).unwrap(), settings);
    }

    #[test]
    fn test_patch_apply() {
        let mut patch = IndexConfigPatch::default();
        assert!(patch.is_empty());
        patch.set("chunk_size", "256").unwrap();
        patch.set("use_reranking", "true").unwrap();
        patch.set("embedding_mode", "manual-code").unwrap();
        patch.set("reranker_model", "").unwrap();

        let base = IndexConfig {
            reranker_model: Some("old".into()),
            ..Default::default()
        };
        let updated = patch.apply_to(&base);
        assert_eq!(updated.chunk_size, 256);
        assert!(updated.use_reranking);
        assert_eq!(updated.embedding_mode, EmbeddingMode::ManualCode);
        assert_eq!(updated.reranker_model, None);
        assert_eq!(updated.effective_reranker_model(), DEFAULT_TEXT_MODEL);
        assert_eq!(updated.text_model, base.text_model);
    }

    #[test]
    fn test_patch_rejects_unknown_key_and_bad_value() {
        let mut patch = IndexConfigPatch::default();
        assert!(patch.set("colour", "blue").is_err());
        assert!(patch.set("chunk_size", "many").is_err());
    }
}
