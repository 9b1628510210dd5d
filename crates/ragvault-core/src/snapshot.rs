//! Named snapshots of the live vector store.
//!
//! A snapshot is a directory copy of the live store plus a
//! `snapshot.json` describing the models, dimension and configuration it
//! was built with. Copies go to a `.tmp-<uuid>` directory first and are
//! renamed into place, so a half-written snapshot is never listed.
//!
//! The active-snapshot pointer (`active_snapshot.json`) records which
//! snapshot was last loaded and whether the store changed since.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use ragvault_db::vector::{open_vector_store, StoredRecord, VectorStoreConfig};
use ragvault_model::is_model_listed;

use crate::config::IndexConfig;
use crate::constants::{
    AUTO_BACKUP_PREFIX, DIMENSION_PROBE_TEXT, SNAPSHOT_FORMAT_VERSION, TMP_PREFIX,
};
use crate::engine::RagEngine;
use crate::errors::RagError;
use crate::layout::DataLayout;

// ============================================================================
// Types
// ============================================================================

/// Contents of `snapshot.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Missing in the oldest snapshots.
    #[serde(default)]
    pub format_version: u32,
    #[serde(default)]
    pub text_model: Option<String>,
    /// Absent in format version 1.
    #[serde(default)]
    pub code_model: Option<String>,
    pub dimension: usize,
    /// Record count at save time.
    pub chunks: usize,
    #[serde(default)]
    pub files: usize,
    /// One stored embedding, kept to verify the dimension on load.
    #[serde(default)]
    pub fingerprint: Option<Vec<f32>>,
    #[serde(default)]
    pub config: Option<IndexConfig>,
    #[serde(default)]
    pub backend: String,
}

/// A listed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    #[serde(flatten)]
    pub metadata: SnapshotMetadata,
    pub size_bytes: u64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOptions {
    /// Append `_YYYYMMDD_HHMMSS` to the name.
    pub auto_timestamp: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOptions {
    /// Do not back up the live store first.
    pub skip_backup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    /// Final name after sanitizing, timestamping and collision suffixes.
    pub name: String,
    pub path: PathBuf,
    pub chunks: usize,
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutcome {
    pub name: String,
    pub chunks: usize,
    pub dimension: usize,
    /// Backup of the previous live store.
    pub backup: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendOutcome {
    pub name: String,
    pub files_added: usize,
    pub records_added: usize,
    /// Records skipped because their file is already in the live store.
    pub duplicates_skipped: usize,
    pub warnings: Vec<String>,
}

/// Read-only assessment of whether a snapshot can be loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityReport {
    pub name: String,
    pub compatible: bool,
    /// Problems that would make `load` fail.
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Contents of `active_snapshot.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSnapshotPointer {
    pub snapshot_name: String,
    pub loaded_at: DateTime<Utc>,
    #[serde(default)]
    pub config: Option<IndexConfig>,
    #[serde(default)]
    pub modified_since_load: bool,
}

// ============================================================================
// Active pointer
// ============================================================================

/// Read the pointer. A corrupt file is treated as absent.
pub(crate) fn read_active_pointer(
    layout: &DataLayout,
) -> Result<Option<ActiveSnapshotPointer>, RagError> {
    let path = &layout.active_pointer_path;
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    match serde_json::from_str(&content) {
        Ok(pointer) => Ok(Some(pointer)),
        Err(e) => {
            tracing::warn!("Ignoring unreadable {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

pub(crate) fn write_active_pointer(
    layout: &DataLayout,
    pointer: &ActiveSnapshotPointer,
) -> Result<(), RagError> {
    fs::create_dir_all(&layout.root)?;
    fs::write(
        &layout.active_pointer_path,
        serde_json::to_string_pretty(pointer)?,
    )?;
    Ok(())
}

pub(crate) fn clear_active_pointer(layout: &DataLayout) -> Result<(), RagError> {
    match fs::remove_file(&layout.active_pointer_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Flag the active snapshot as modified after a store write.
pub(crate) fn mark_pointer_modified(layout: &DataLayout) -> Result<(), RagError> {
    if let Some(mut pointer) = read_active_pointer(layout)? {
        if !pointer.modified_since_load {
            pointer.modified_since_load = true;
            write_active_pointer(layout, &pointer)?;
        }
    }
    Ok(())
}

// ============================================================================
// Filesystem helpers
// ============================================================================

/// Make a user-supplied name safe as a directory name.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`; leading dots are
/// stripped so snapshots are never hidden or mistaken for temp copies.
pub fn sanitize_snapshot_name(name: &str) -> Result<String, RagError> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let cleaned: String = cleaned.chars().take(100).collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        return Err(RagError::invalid_config(
            format!("invalid snapshot name '{}'", name),
            "Use letters, digits, '-', '_' or '.'",
        ));
    }
    Ok(cleaned)
}

/// First free name among `base`, `base_1`, `base_2`, ...
fn unique_name(dir: &Path, base: &str) -> String {
    if !dir.join(base).exists() {
        return base.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Recursively copy a directory.
fn copy_dir(src: &Path, dst: &Path) -> Result<(), RagError> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| RagError::Store(format!("copy {}: {}", entry.path().display(), e)))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

fn read_metadata(snapshot_dir: &Path) -> Result<SnapshotMetadata, RagError> {
    let path = DataLayout::snapshot_meta_path(snapshot_dir);
    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content).map_err(|e| {
        RagError::snapshot_validation(format!("unreadable {}: {}", path.display(), e))
    })
}

/// The sampled vector must have the recorded dimension.
fn fingerprint_issue(metadata: &SnapshotMetadata) -> Option<String> {
    let sample = metadata.fingerprint.as_ref()?;
    (sample.len() != metadata.dimension).then(|| {
        format!(
            "Dimension mismatch: fingerprint has {} values, metadata records {}",
            sample.len(),
            metadata.dimension
        )
    })
}

fn temp_dir_in(parent: &Path) -> PathBuf {
    parent.join(format!("{}{}", TMP_PREFIX, uuid::Uuid::new_v4()))
}

/// Copy the live store into `tmp`, add metadata, rename to `target`.
fn write_snapshot_dir(
    store_dir: &Path,
    tmp: &Path,
    target: &Path,
    metadata: &SnapshotMetadata,
) -> Result<(), RagError> {
    copy_dir(store_dir, &DataLayout::snapshot_store_dir(tmp))?;
    fs::write(
        DataLayout::snapshot_meta_path(tmp),
        serde_json::to_string_pretty(metadata)?,
    )?;
    fs::rename(tmp, target)?;
    Ok(())
}

/// Copy a snapshot's store next to the live one. The live store is untouched.
fn stage_snapshot_store(snapshot_dir: &Path, layout: &DataLayout) -> Result<PathBuf, RagError> {
    let src = DataLayout::snapshot_store_dir(snapshot_dir);
    let tmp = temp_dir_in(&layout.root);

    if let Err(e) = copy_dir(&src, &tmp) {
        let _ = fs::remove_dir_all(&tmp);
        return Err(e);
    }
    Ok(tmp)
}

/// Replace the live store directory with a staged copy.
fn swap_in_store(staged: &Path, layout: &DataLayout) -> Result<(), RagError> {
    if layout.store_dir.exists() {
        fs::remove_dir_all(&layout.store_dir)?;
    }
    fs::rename(staged, &layout.store_dir)?;
    Ok(())
}

// ============================================================================
// Snapshot operations
// ============================================================================

impl RagEngine {
    /// Directory of an existing snapshot.
    fn existing_snapshot_dir(&self, name: &str) -> Result<PathBuf, RagError> {
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return Err(RagError::SnapshotNotFound(name.to_string()));
        }
        let dir = self.layout().snapshot_dir(name);
        if !DataLayout::snapshot_meta_path(&dir).exists() {
            return Err(RagError::SnapshotNotFound(name.to_string()));
        }
        Ok(dir)
    }

    /// Save the live store as a named snapshot.
    ///
    /// The store handle is closed while copying and reopened afterwards,
    /// whether or not the copy succeeded.
    pub async fn save_snapshot(
        &self,
        name: &str,
        options: SaveOptions,
    ) -> Result<SaveOutcome, RagError> {
        let config = self.config().await;
        let store = self.store().await?;

        let chunks = store.count().await?;
        if chunks == 0 {
            return Err(RagError::EmptyStore);
        }
        let files = store.file_paths().await?.len();
        let fingerprint = store.sample(1).await?.into_iter().next().map(|r| r.vector);
        drop(store);

        let mut base = sanitize_snapshot_name(name)?;
        if options.auto_timestamp {
            base = format!("{}_{}", base, Utc::now().format("%Y%m%d_%H%M%S"));
        }

        let layout = self.layout();
        fs::create_dir_all(&layout.snapshots_dir)?;
        let final_name = unique_name(&layout.snapshots_dir, &base);
        let target = layout.snapshot_dir(&final_name);
        let tmp = temp_dir_in(&layout.snapshots_dir);

        let metadata = SnapshotMetadata {
            name: final_name.clone(),
            created_at: Utc::now(),
            format_version: SNAPSHOT_FORMAT_VERSION,
            text_model: Some(config.text_model.clone()),
            code_model: Some(config.code_model.clone()),
            dimension: config.dimension,
            chunks,
            files,
            fingerprint,
            config: Some(config.clone()),
            backend: self.settings().store.backend.clone(),
        };

        let mut guard = self.store.write().await;
        if let Some(live) = guard.take() {
            if let Err(e) = live.close().await {
                tracing::warn!("Failed to close store before snapshot: {}", e);
            }
        }

        let copied = write_snapshot_dir(&layout.store_dir, &tmp, &target, &metadata);
        let reopened = self.open_store(config.dimension).await;
        if copied.is_err() {
            let _ = fs::remove_dir_all(&tmp);
        }
        *guard = Some(reopened?);
        drop(guard);
        copied?;

        tracing::info!(
            "Saved snapshot '{}' ({} chunks, {} files)",
            final_name,
            chunks,
            files
        );
        Ok(SaveOutcome {
            name: final_name,
            path: target,
            chunks,
            files,
        })
    }

    /// Replace the live store with a snapshot and adopt its configuration.
    ///
    /// The snapshot is validated first (model ids recorded, models installed,
    /// probe dimension matches). A non-empty live store is backed up unless
    /// `skip_backup` is set. The snapshot's store is copied aside before the
    /// live one is touched, so a failed copy reopens the live store as it
    /// was. If anything fails after the live store was torn down, an empty
    /// store is initialized and the pointer cleared.
    pub async fn load_snapshot(
        &self,
        name: &str,
        options: LoadOptions,
    ) -> Result<LoadOutcome, RagError> {
        let dir = self.existing_snapshot_dir(name)?;
        let metadata = read_metadata(&dir)?;
        self.validate_for_load(&dir, &metadata).await?;

        let backup = if options.skip_backup {
            None
        } else {
            self.auto_backup().await?
        };

        let current_dimension = self.config.read().await.dimension;
        let mut adopted = metadata
            .config
            .clone()
            .unwrap_or_default();
        if let Some(text) = &metadata.text_model {
            adopted.text_model = text.clone();
        }
        if let Some(code) = &metadata.code_model {
            adopted.code_model = code.clone();
        }
        adopted.dimension = metadata.dimension;

        let layout = self.layout();
        let mut guard = self.store.write().await;
        if let Some(live) = guard.take() {
            if let Err(e) = live.close().await {
                tracing::warn!("Failed to close store before load: {}", e);
            }
        }

        // Until the swap, a failure leaves the live store as it was
        let staged = match stage_snapshot_store(&dir, layout) {
            Ok(staged) => staged,
            Err(e) => {
                tracing::warn!("Snapshot copy failed, keeping live store: {}", e);
                match self.open_store(current_dimension).await {
                    Ok(live) => *guard = Some(live),
                    Err(reopen) => tracing::error!("Failed to reopen live store: {}", reopen),
                }
                return Err(RagError::snapshot_restore(name, e));
            }
        };

        let opened = match swap_in_store(&staged, layout) {
            Ok(()) => self.open_store(metadata.dimension).await,
            Err(e) => {
                let _ = fs::remove_dir_all(&staged);
                Err(e)
            }
        };

        let store = match opened {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Snapshot load failed, reinitializing empty store: {}", e);
                if layout.store_dir.exists() {
                    if let Err(rm) = fs::remove_dir_all(&layout.store_dir) {
                        tracing::warn!("Failed to remove partial store: {}", rm);
                    }
                }
                match self.open_store(current_dimension).await {
                    Ok(empty) => *guard = Some(empty),
                    Err(reinit) => tracing::error!("Failed to reinitialize store: {}", reinit),
                }
                if let Err(clear) = clear_active_pointer(layout) {
                    tracing::warn!("Failed to clear active snapshot pointer: {}", clear);
                }
                return Err(RagError::snapshot_restore(name, e));
            }
        };

        *guard = Some(store.clone());
        drop(guard);

        let chunks = match store.count().await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!("Could not count loaded records: {}", e);
                metadata.chunks
            }
        };
        if chunks != metadata.chunks {
            tracing::warn!(
                "Snapshot '{}' recorded {} chunks but {} were loaded",
                metadata.name,
                metadata.chunks,
                chunks
            );
        }

        self.adopt_config(adopted.clone()).await?;
        write_active_pointer(
            layout,
            &ActiveSnapshotPointer {
                snapshot_name: name.to_string(),
                loaded_at: Utc::now(),
                config: Some(adopted),
                modified_since_load: false,
            },
        )?;

        tracing::info!("Loaded snapshot '{}' ({} chunks)", metadata.name, chunks);
        Ok(LoadOutcome {
            name: metadata.name,
            chunks,
            dimension: metadata.dimension,
            backup,
        })
    }

    async fn validate_for_load(
        &self,
        dir: &Path,
        metadata: &SnapshotMetadata,
    ) -> Result<(), RagError> {
        let (Some(text_model), Some(code_model)) =
            (metadata.text_model.as_deref(), metadata.code_model.as_deref())
        else {
            return Err(RagError::snapshot_validation(format!(
                "snapshot '{}' format is too old (model ids not recorded); rebuild it",
                metadata.name
            )));
        };

        if !DataLayout::snapshot_store_dir(dir).exists() {
            return Err(RagError::snapshot_validation(format!(
                "snapshot '{}' has no store directory",
                metadata.name
            )));
        }
        if let Some(issue) = fingerprint_issue(metadata) {
            return Err(RagError::snapshot_validation(format!(
                "snapshot '{}': {}",
                metadata.name, issue
            )));
        }

        let backend = &self.settings().store.backend;
        if !metadata.backend.is_empty() && &metadata.backend != backend {
            return Err(RagError::snapshot_validation(format!(
                "snapshot '{}' uses the {} backend, this store uses {}",
                metadata.name, metadata.backend, backend
            )));
        }

        let models = self.embedder.available_models().await?;
        for model in [text_model, code_model] {
            if !is_model_listed(&models, model) {
                return Err(RagError::snapshot_validation(format!(
                    "model '{}' is not available from the embedding service",
                    model
                )));
            }
        }

        let (text_probe, code_probe) = tokio::try_join!(
            self.embedder.embed(DIMENSION_PROBE_TEXT, text_model),
            self.embedder.embed(DIMENSION_PROBE_TEXT, code_model),
        )?;
        for (model, actual) in [(text_model, text_probe.len()), (code_model, code_probe.len())] {
            if actual != metadata.dimension {
                return Err(RagError::snapshot_validation(format!(
                    "Dimension mismatch: snapshot '{}' has dimension {}, {} produces {}",
                    metadata.name, metadata.dimension, model, actual
                )));
            }
        }
        Ok(())
    }

    /// Merge a snapshot's records into the live store.
    ///
    /// Records whose file path already exists in the live store are skipped.
    /// The live configuration is kept.
    pub async fn append_snapshot(&self, name: &str) -> Result<AppendOutcome, RagError> {
        let dir = self.existing_snapshot_dir(name)?;
        let metadata = read_metadata(&dir)?;
        let config = self.config().await;

        if metadata.dimension != config.dimension {
            return Err(RagError::DimensionMismatch {
                expected: config.dimension,
                actual: metadata.dimension,
            });
        }

        let mut warnings = Vec::new();
        if metadata.text_model.as_deref() != Some(config.text_model.as_str()) {
            warnings.push(format!(
                "snapshot text model {} differs from running model {}",
                metadata.text_model.as_deref().unwrap_or("(unknown)"),
                config.text_model
            ));
        }
        if metadata.code_model.as_deref() != Some(config.code_model.as_str()) {
            warnings.push(format!(
                "snapshot code model {} differs from running model {}",
                metadata.code_model.as_deref().unwrap_or("(unknown)"),
                config.code_model
            ));
        }
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        let live = self.store().await?;

        let backend = if metadata.backend.is_empty() {
            self.settings().store.backend.clone()
        } else {
            metadata.backend.clone()
        };
        let snapshot_config =
            VectorStoreConfig::new(metadata.dimension, DataLayout::snapshot_store_dir(&dir))
                .with_backend(backend)
                .with_create_if_missing(false);
        let snapshot_store = open_vector_store(&snapshot_config).await?;
        let records = snapshot_store.scan().await?;
        snapshot_store.close().await?;

        let existing = live.file_paths().await?;
        let (fresh, duplicates): (Vec<StoredRecord>, Vec<StoredRecord>) = records
            .into_iter()
            .partition(|r| !existing.contains(&r.file_path));

        let files_added = fresh
            .iter()
            .map(|r| r.file_path.as_str())
            .collect::<HashSet<_>>()
            .len();

        let batch_size = self.settings().snapshots.append_batch_size.max(1);
        for batch in fresh.chunks(batch_size) {
            live.add(batch).await?;
        }
        if !fresh.is_empty() {
            mark_pointer_modified(self.layout())?;
        }

        tracing::info!(
            "Appended snapshot '{}': {} records from {} files, {} duplicates skipped",
            metadata.name,
            fresh.len(),
            files_added,
            duplicates.len()
        );
        Ok(AppendOutcome {
            name: metadata.name,
            files_added,
            records_added: fresh.len(),
            duplicates_skipped: duplicates.len(),
            warnings,
        })
    }

    /// All snapshots, newest first.
    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>, RagError> {
        let layout = self.layout();
        if !layout.snapshots_dir.exists() {
            return Ok(Vec::new());
        }
        let active = read_active_pointer(layout)?.map(|p| p.snapshot_name);

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&layout.snapshots_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(TMP_PREFIX) || !entry.file_type()?.is_dir() {
                continue;
            }
            match read_metadata(&entry.path()) {
                Ok(metadata) => snapshots.push(SnapshotInfo {
                    is_active: active.as_deref() == Some(name.as_str()),
                    size_bytes: dir_size(&entry.path()),
                    metadata,
                }),
                Err(e) => tracing::warn!("Skipping snapshot directory {}: {}", name, e),
            }
        }

        snapshots.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
        Ok(snapshots)
    }

    pub async fn snapshot_info(&self, name: &str) -> Result<SnapshotInfo, RagError> {
        let dir = self.existing_snapshot_dir(name)?;
        let metadata = read_metadata(&dir)?;
        let active = read_active_pointer(self.layout())?.map(|p| p.snapshot_name);
        Ok(SnapshotInfo {
            is_active: active.as_deref() == Some(name),
            size_bytes: dir_size(&dir),
            metadata,
        })
    }

    /// Report whether a snapshot could be loaded, without changing anything.
    pub async fn check_snapshot_compatibility(
        &self,
        name: &str,
    ) -> Result<CompatibilityReport, RagError> {
        let dir = self.existing_snapshot_dir(name)?;
        let metadata = read_metadata(&dir)?;
        let config = self.config().await;

        let mut report = CompatibilityReport {
            name: metadata.name.clone(),
            ..Default::default()
        };

        if metadata.format_version < SNAPSHOT_FORMAT_VERSION {
            report.warnings.push(format!(
                "snapshot format version {} is older than {}",
                metadata.format_version, SNAPSHOT_FORMAT_VERSION
            ));
        }

        let backend = &self.settings().store.backend;
        if !metadata.backend.is_empty() && &metadata.backend != backend {
            report.issues.push(format!(
                "snapshot uses the {} backend, this store uses {}",
                metadata.backend, backend
            ));
        }

        if let Some(issue) = fingerprint_issue(&metadata) {
            report.issues.push(issue);
        }

        match (metadata.text_model.as_deref(), metadata.code_model.as_deref()) {
            (Some(text_model), Some(code_model)) => {
                self.check_models(text_model, code_model, metadata.dimension, &mut report)
                    .await;
                if text_model != config.text_model || code_model != config.code_model {
                    report.warnings.push(format!(
                        "snapshot models ({}, {}) differ from running models ({}, {}); \
                         loading switches models",
                        text_model, code_model, config.text_model, config.code_model
                    ));
                }
            }
            _ => report
                .issues
                .push("format is too old (model ids not recorded)".to_string()),
        }

        if metadata.dimension != config.dimension {
            report.warnings.push(format!(
                "snapshot dimension {} differs from the live store ({}); it can be loaded \
                 but not appended",
                metadata.dimension, config.dimension
            ));
        }

        report.compatible = report.issues.is_empty();
        Ok(report)
    }

    async fn check_models(
        &self,
        text_model: &str,
        code_model: &str,
        dimension: usize,
        report: &mut CompatibilityReport,
    ) {
        let models = match self.embedder.available_models().await {
            Ok(models) => models,
            Err(e) => {
                report
                    .issues
                    .push(format!("embedding service unavailable: {}", e));
                return;
            }
        };

        for model in [text_model, code_model] {
            if !is_model_listed(&models, model) {
                report
                    .issues
                    .push(format!("model '{}' is not installed", model));
                continue;
            }
            match self.embedder.embed(DIMENSION_PROBE_TEXT, model).await {
                Ok(probe) if probe.len() != dimension => report.issues.push(format!(
                    "Dimension mismatch: {} produces {}, snapshot has {}",
                    model,
                    probe.len(),
                    dimension
                )),
                Ok(_) => {}
                Err(e) => report
                    .issues
                    .push(format!("probe with {} failed: {}", model, e)),
            }
        }
    }

    /// Delete a snapshot. The active snapshot cannot be deleted.
    pub async fn delete_snapshot(&self, name: &str) -> Result<(), RagError> {
        let dir = self.existing_snapshot_dir(name)?;
        if let Some(pointer) = read_active_pointer(self.layout())? {
            if pointer.snapshot_name == name {
                return Err(RagError::SnapshotInUse(name.to_string()));
            }
        }
        fs::remove_dir_all(&dir)?;
        tracing::info!("Deleted snapshot '{}'", name);
        Ok(())
    }

    /// The last loaded snapshot, if any.
    pub async fn active_snapshot(&self) -> Result<Option<ActiveSnapshotPointer>, RagError> {
        read_active_pointer(self.layout())
    }

    /// Back up a non-empty live store as `auto_backup_<timestamp>`.
    pub(crate) async fn auto_backup(&self) -> Result<Option<String>, RagError> {
        let store = self.store().await?;
        if store.is_empty().await? {
            return Ok(None);
        }
        drop(store);

        let outcome = self
            .save_snapshot(
                AUTO_BACKUP_PREFIX,
                SaveOptions {
                    auto_timestamp: true,
                },
            )
            .await?;
        tracing::info!("Backed up live store as '{}'", outcome.name);
        Ok(Some(outcome.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_snapshot_name() {
        assert_eq!(sanitize_snapshot_name("nightly").unwrap(), "nightly");
        assert_eq!(
            sanitize_snapshot_name("my docs/v2").unwrap(),
            "my_docs_v2"
        );
        assert_eq!(sanitize_snapshot_name("..hidden").unwrap(), "hidden");
        assert!(sanitize_snapshot_name("   ").is_err());
        assert!(sanitize_snapshot_name("///").is_err());
    }

    #[test]
    fn test_unique_name_adds_suffix() {
        let temp = TempDir::new().unwrap();
        assert_eq!(unique_name(temp.path(), "snap"), "snap");
        fs::create_dir(temp.path().join("snap")).unwrap();
        fs::create_dir(temp.path().join("snap_1")).unwrap();
        assert_eq!(unique_name(temp.path(), "snap"), "snap_2");
    }

    #[test]
    fn test_copy_dir_nested() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::write(src.join("top.txt"), "1").unwrap();
        fs::write(src.join("a/b/deep.txt"), "22").unwrap();

        let dst = temp.path().join("dst");
        copy_dir(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(dst.join("a/b/deep.txt")).unwrap(), "22");
        assert_eq!(dir_size(&dst), 3);
    }

    #[test]
    fn test_pointer_lifecycle() {
        let temp = TempDir::new().unwrap();
        let layout = DataLayout::new(temp.path());
        assert!(read_active_pointer(&layout).unwrap().is_none());

        // no pointer: marking is a no-op
        mark_pointer_modified(&layout).unwrap();
        assert!(!layout.active_pointer_path.exists());

        let pointer = ActiveSnapshotPointer {
            snapshot_name: "nightly".into(),
            loaded_at: Utc::now(),
            config: None,
            modified_since_load: false,
        };
        write_active_pointer(&layout, &pointer).unwrap();
        mark_pointer_modified(&layout).unwrap();
        assert!(read_active_pointer(&layout).unwrap().unwrap().modified_since_load);

        clear_active_pointer(&layout).unwrap();
        clear_active_pointer(&layout).unwrap();
        assert!(read_active_pointer(&layout).unwrap().is_none());
    }

    #[test]
    fn test_old_metadata_parses() {
        let json = r#"{"name":"old","createdAt":"2024-01-01T00:00:00Z","textModel":"m","dimension":768,"chunks":3}"#;
        let metadata: SnapshotMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.format_version, 0);
        assert!(metadata.code_model.is_none());
        assert!(metadata.config.is_none());
    }
}
