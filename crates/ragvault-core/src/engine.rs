//! RagVault Engine – the context object behind every operation.
//!
//! The [`RagEngine`] owns the running configuration, the vector store handle,
//! the embedding provider and the abort flag. Indexing, retrieval and
//! snapshot operations are `impl RagEngine` blocks in their own modules; this
//! file holds construction, lifecycle, configuration, pinned records and
//! stats.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use ragvault_db::vector::{open_vector_store, RecordFilter, VectorStore, VectorStoreConfig};
use ragvault_model::{
    EmbeddingMagnitudeReranker, EmbeddingProvider, OllamaEmbeddingClient, RerankerModel,
};

use crate::config::{IndexConfig, IndexConfigPatch, RagSettings};
use crate::constants::DIMENSION_PROBE_TEXT;
use crate::errors::RagError;
use crate::layout::DataLayout;
use crate::progress::AbortHandle;
use crate::snapshot::{clear_active_pointer, mark_pointer_modified, read_active_pointer};
use crate::types::{FileType, IndexRecord, RecordMetadata, RecordType};

// ============================================================================
// Result types
// ============================================================================

/// A pinned record to add with [`RagEngine::add_pinned_record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedRecordInput {
    /// Caller-chosen id, stored as the record's message id.
    pub id: String,
    pub text: String,
    #[serde(default = "default_pinned_type")]
    pub record_type: RecordType,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub score_boost: f32,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_pinned_type() -> RecordType {
    RecordType::PinnedUser
}

impl PinnedRecordInput {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            record_type: RecordType::PinnedUser,
            source: None,
            priority: 0,
            score_boost: 0.0,
            tags: Vec::new(),
        }
    }

    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    pub fn with_score_boost(mut self, boost: f32) -> Self {
        self.score_boost = boost;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub count: usize,
    /// Distinct file paths (pinned records included).
    pub files: usize,
    pub dimension: usize,
    pub backend: String,
    pub text_model: String,
    pub code_model: String,
    pub active_snapshot: Option<String>,
    pub modified_since_load: bool,
}

/// Result of [`RagEngine::validate_model_compatibility`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCompatibility {
    pub compatible: bool,
    pub text_dimension: usize,
    pub code_dimension: usize,
    pub store_dimension: usize,
    pub store_count: usize,
    pub issues: Vec<String>,
}

// ============================================================================
// RagEngine
// ============================================================================

/// The main engine for RagVault operations.
///
/// All operations take `&self`; the store handle and running configuration
/// sit behind async locks so a search can run while an indexing job is in
/// progress. Destructive operations (clear, snapshot load) take the store
/// write lock and always leave a usable store behind.
///
/// # Construction
///
/// Use [`RagEngine::from_settings`] for typical usage, or [`RagEngine::new`]
/// to inject an embedding provider (tests use a deterministic one).
///
/// # Example
///
/// ```ignore
/// use ragvault_core::{RagEngine, RagSettings};
///
/// let engine = RagEngine::from_settings(RagSettings::load(None)?)?;
/// engine.initialize_database().await?;
/// let outcome = engine.add_documents(&[PathBuf::from("docs")], None).await?;
/// let response = engine.search("how do I configure the cache?").await?;
/// ```
pub struct RagEngine {
    settings: RagSettings,
    layout: DataLayout,
    pub(crate) config: RwLock<IndexConfig>,
    pub(crate) store: RwLock<Option<Arc<dyn VectorStore>>>,
    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
    reranker: Option<Arc<dyn RerankerModel>>,
    pub(crate) abort: AbortHandle,
}

impl fmt::Debug for RagEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagEngine")
            .field("data_dir", &self.layout.root)
            .field("backend", &self.settings.store.backend)
            .field("provider", &self.embedder.provider_name())
            .finish_non_exhaustive()
    }
}

impl RagEngine {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create an engine with an explicit embedding provider.
    ///
    /// The running configuration is read from the data directory when a
    /// previous process persisted one, otherwise it starts from
    /// `settings.index`.
    pub fn new(
        settings: RagSettings,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, RagError> {
        for warning in settings.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }

        let layout = DataLayout::new(settings.resolved_data_dir());
        let config = match load_running_config(&layout.config_path)? {
            Some(config) => config,
            None => settings.index.clone(),
        };

        Ok(Self {
            settings,
            layout,
            config: RwLock::new(config),
            store: RwLock::new(None),
            embedder,
            reranker: None,
            abort: AbortHandle::new(),
        })
    }

    /// Create an engine talking to the configured embedding service.
    pub fn from_settings(settings: RagSettings) -> Result<Self, RagError> {
        let client = OllamaEmbeddingClient::new(settings.embedding.clone())?;
        Self::new(settings, Arc::new(client))
    }

    /// Use a specific reranker instead of the default embedding-based one.
    pub fn with_reranker(mut self, reranker: Arc<dyn RerankerModel>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Handle for aborting the running indexing job from another task.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Abort the running indexing job, if any.
    pub fn abort_indexing(&self) {
        tracing::info!("Abort requested");
        self.abort.abort();
    }

    // -------------------------------------------------------------------------
    // Store lifecycle
    // -------------------------------------------------------------------------

    /// Open (or create) the live store at the running dimension.
    ///
    /// Idempotent. On the very first initialization of a data directory any
    /// stale active-snapshot pointer is removed.
    pub async fn initialize_database(&self) -> Result<(), RagError> {
        // Lock order is config before store
        let dimension = self.config.read().await.dimension;
        let mut guard = self.store.write().await;
        if guard.is_some() {
            return Ok(());
        }

        self.layout.ensure_dirs()?;
        let first_init = !self.layout.store_dir.exists();

        let store = self.open_store(dimension).await?;
        tracing::info!(
            "Vector store ready at {} ({}, dim={})",
            self.layout.store_dir.display(),
            store.backend_name(),
            dimension
        );
        *guard = Some(store);

        if first_init {
            clear_active_pointer(&self.layout)?;
        }
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.store.read().await.is_some()
    }

    /// Current store handle.
    pub(crate) async fn store(&self) -> Result<Arc<dyn VectorStore>, RagError> {
        self.store
            .read()
            .await
            .clone()
            .ok_or(RagError::NotInitialized)
    }

    pub(crate) fn store_config(&self, dimension: usize, path: &Path) -> VectorStoreConfig {
        VectorStoreConfig::new(dimension, path).with_backend(&self.settings.store.backend)
    }

    /// Open the live store directory at `dimension`.
    pub(crate) async fn open_store(
        &self,
        dimension: usize,
    ) -> Result<Arc<dyn VectorStore>, RagError> {
        let config = self.store_config(dimension, &self.layout.store_dir);
        Ok(open_vector_store(&config).await?)
    }

    /// Delete every record and the active-snapshot pointer.
    pub async fn clear_database(&self) -> Result<(), RagError> {
        let dimension = self.config.read().await.dimension;
        let mut guard = self.store.write().await;

        if let Some(store) = guard.take() {
            if let Err(e) = store.close().await {
                tracing::warn!("Failed to close store before clearing: {}", e);
            }
        }

        let removed = if self.layout.store_dir.exists() {
            fs::remove_dir_all(&self.layout.store_dir)
        } else {
            Ok(())
        };

        // Reopen whatever is on disk even if removal failed
        *guard = Some(self.open_store(dimension).await?);
        removed?;

        clear_active_pointer(&self.layout)?;
        tracing::info!("Cleared vector store at {}", self.layout.store_dir.display());
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Snapshot of the running configuration.
    pub async fn config(&self) -> IndexConfig {
        self.config.read().await.clone()
    }

    /// Apply a partial configuration update.
    ///
    /// Changing the dimension is only allowed while the store is empty; the
    /// store is then recreated at the new dimension.
    pub async fn set_config(&self, patch: IndexConfigPatch) -> Result<IndexConfig, RagError> {
        let mut config = self.config.write().await;
        let updated = patch.apply_to(&config);
        for warning in updated.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }

        if updated.dimension != config.dimension {
            let mut guard = self.store.write().await;
            if let Some(store) = guard.as_ref() {
                let count = store.count().await?;
                if count > 0 {
                    return Err(RagError::invalid_config(
                        format!(
                            "cannot change dimension from {} to {}: the store holds {} records",
                            config.dimension, updated.dimension, count
                        ),
                        "Clear the store first, or load a snapshot built with that dimension",
                    ));
                }
                store.close().await?;
                *guard = None;
            }

            if self.layout.store_dir.exists() {
                fs::remove_dir_all(&self.layout.store_dir)?;
            }
            *guard = Some(self.open_store(updated.dimension).await?);
            tracing::info!(
                "Recreated empty store at dimension {}",
                updated.dimension
            );
        }

        save_running_config(&self.layout.config_path, &updated)?;
        *config = updated.clone();
        Ok(updated)
    }

    /// Replace the running configuration wholesale (snapshot load).
    pub(crate) async fn adopt_config(&self, config: IndexConfig) -> Result<(), RagError> {
        save_running_config(&self.layout.config_path, &config)?;
        *self.config.write().await = config;
        Ok(())
    }

    /// Reranker for the current configuration.
    pub(crate) fn reranker_for(&self, config: &IndexConfig) -> Arc<dyn RerankerModel> {
        match &self.reranker {
            Some(reranker) => Arc::clone(reranker),
            None => Arc::new(EmbeddingMagnitudeReranker::new(
                Arc::clone(&self.embedder),
                config.effective_reranker_model(),
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Pinned records
    // -------------------------------------------------------------------------

    /// Embed and store a pinned record (a conversation turn, a note).
    ///
    /// Pinned records live beside file records under the path
    /// `pinned://{id}`. Re-pinning an id replaces the previous record.
    pub async fn add_pinned_record(&self, input: PinnedRecordInput) -> Result<String, RagError> {
        if input.record_type == RecordType::File {
            return Err(RagError::invalid_config(
                "pinned records cannot use record type 'file'",
                "Use pinned_user, pinned_assistant or system",
            ));
        }
        if input.text.trim().is_empty() {
            return Err(RagError::invalid_config(
                "pinned record text is empty",
                "Provide the text to pin",
            ));
        }

        let config = self.config().await;
        let store = self.store().await?;

        let vector = self.embedder.embed(&input.text, &config.text_model).await?;
        check_dimension(config.dimension, &vector)?;

        store
            .delete(&RecordFilter::new().with_message_id(&input.id))
            .await?;

        let now = Utc::now();
        let file_path = format!("pinned://{}", input.id);
        let record = IndexRecord {
            id: uuid::Uuid::new_v4().to_string(),
            vector,
            text: input.text,
            file_path: file_path.clone(),
            metadata: RecordMetadata {
                record_type: input.record_type,
                source: input.source.unwrap_or(file_path),
                priority: input.priority,
                score_boost: input.score_boost,
                indexed_at: now,
                pinned_at: Some(now),
                message_id: Some(input.id.clone()),
                tags: input.tags,
                embedding_model: config.text_model.clone(),
                file_type: FileType::Text,
                ..Default::default()
            },
        };

        store.add(&[record.to_stored()?]).await?;
        mark_pointer_modified(&self.layout)?;
        tracing::debug!("Pinned record {} ({})", input.id, record.metadata.record_type);
        Ok(record.id)
    }

    /// Remove every record pinned under `id`. Returns how many were removed.
    pub async fn remove_pinned_record(&self, id: &str) -> Result<usize, RagError> {
        let store = self.store().await?;
        let before = store.count().await?;
        store
            .delete(&RecordFilter::new().with_message_id(id))
            .await?;
        let removed = before.saturating_sub(store.count().await?);
        if removed > 0 {
            mark_pointer_modified(&self.layout)?;
        }
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Stats / diagnostics
    // -------------------------------------------------------------------------

    pub async fn stats(&self) -> Result<StoreStats, RagError> {
        let config = self.config().await;
        let store = self.store().await?;
        let pointer = read_active_pointer(&self.layout)?;

        Ok(StoreStats {
            count: store.count().await?,
            files: store.file_paths().await?.len(),
            dimension: store.dimension(),
            backend: store.backend_name().to_string(),
            text_model: config.text_model,
            code_model: config.code_model,
            active_snapshot: pointer.as_ref().map(|p| p.snapshot_name.clone()),
            modified_since_load: pointer.map(|p| p.modified_since_load).unwrap_or(false),
        })
    }

    /// Probe two models and report whether they can share the store.
    pub async fn validate_model_compatibility(
        &self,
        text_model: &str,
        code_model: &str,
    ) -> Result<ModelCompatibility, RagError> {
        let (text, code) = tokio::try_join!(
            self.embedder.embed(DIMENSION_PROBE_TEXT, text_model),
            self.embedder.embed(DIMENSION_PROBE_TEXT, code_model),
        )?;

        let store_dimension = self.config.read().await.dimension;
        let store_count = match self.store().await {
            Ok(store) => store.count().await?,
            Err(RagError::NotInitialized) => 0,
            Err(e) => return Err(e),
        };

        let mut issues = Vec::new();
        if text.len() != code.len() {
            issues.push(format!(
                "{} produces {} dimensions but {} produces {}",
                text_model,
                text.len(),
                code_model,
                code.len()
            ));
        }
        if store_count > 0 {
            for (model, dim) in [(text_model, text.len()), (code_model, code.len())] {
                if dim != store_dimension {
                    issues.push(format!(
                        "Dimension mismatch: {} produces {} but the store holds {} records of dimension {}",
                        model, dim, store_count, store_dimension
                    ));
                }
            }
        }

        Ok(ModelCompatibility {
            compatible: issues.is_empty(),
            text_dimension: text.len(),
            code_dimension: code.len(),
            store_dimension,
            store_count,
            issues,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Reject a vector whose length differs from the store dimension.
pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), RagError> {
    if vector.len() != expected {
        return Err(RagError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

fn load_running_config(path: &Path) -> Result<Option<IndexConfig>, RagError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let config = serde_json::from_str(&content)
        .map_err(|e| RagError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(Some(config))
}

fn save_running_config(path: &Path, config: &IndexConfig) -> Result<(), RagError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_dimension() {
        assert!(check_dimension(3, &[0.0, 1.0, 2.0]).is_ok());
        assert!(matches!(
            check_dimension(4, &[0.0]),
            Err(RagError::DimensionMismatch {
                expected: 4,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_running_config_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index_config.json");
        assert!(load_running_config(&path).unwrap().is_none());

        let config = IndexConfig {
            dimension: 768,
            ..Default::default()
        };
        save_running_config(&path, &config).unwrap();
        assert_eq!(load_running_config(&path).unwrap(), Some(config));
    }

    #[test]
    fn test_pinned_input_defaults() {
        let input: PinnedRecordInput =
            serde_json::from_str(r#"{"id":"m1","text":"remember this"}"#).unwrap();
        assert_eq!(input.record_type, RecordType::PinnedUser);
        assert!(input.tags.is_empty());
    }
}
