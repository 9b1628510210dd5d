//! Shared test utilities for ragvault-core integration tests.

#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ragvault_core::{
    AbortHandle, EmbeddingProvider, IndexConfig, ModelError, RagEngine, RagSettings,
    DEFAULT_CODE_MODEL, DEFAULT_TEXT_MODEL,
};

/// Deterministic bag-of-words embedder.
///
/// Each lowercase word is hashed into one signed bucket; the vector is then
/// L2-normalized. Identical texts embed identically, and texts sharing words
/// are closer than texts that do not.
pub struct HashEmbedder {
    dimension: usize,
    per_model: HashMap<String, usize>,
    models: Vec<String>,
    abort_on: Mutex<Option<(String, AbortHandle)>>,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            per_model: HashMap::new(),
            models: vec![
                DEFAULT_TEXT_MODEL.to_string(),
                format!("{}:latest", DEFAULT_TEXT_MODEL),
                DEFAULT_CODE_MODEL.to_string(),
            ],
            abort_on: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make one model produce a different dimension.
    pub fn with_model_dimension(mut self, model: &str, dimension: usize) -> Self {
        self.per_model.insert(model.to_string(), dimension);
        self
    }

    /// Replace the list of installed models.
    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Abort the job as soon as a text containing `marker` is embedded.
    pub fn abort_when(&self, marker: &str, handle: AbortHandle) {
        if let Ok(mut slot) = self.abort_on.lock() {
            *slot = Some((marker.to_string(), handle));
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn hash_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimension];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        word.to_lowercase().hash(&mut hasher);
        let h = hasher.finish();
        let index = (h % dimension as u64) as usize;
        vector[index] += if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        vector[0] = 1.0;
    } else {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str, model_id: &str) -> Result<Vec<f32>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(slot) = self.abort_on.lock() {
            if let Some((marker, handle)) = slot.as_ref() {
                if text.contains(marker.as_str()) {
                    handle.abort();
                }
            }
        }
        let dimension = self
            .per_model
            .get(model_id)
            .copied()
            .unwrap_or(self.dimension);
        Ok(hash_vector(text, dimension))
    }

    async fn available_models(&self) -> Result<Vec<String>, ModelError> {
        Ok(self.models.clone())
    }

    fn provider_name(&self) -> &str {
        "hash"
    }
}

/// Settings for an isolated data directory on the simple backend.
pub fn test_settings(data_dir: &Path, dimension: usize) -> RagSettings {
    RagSettings::default()
        .with_data_dir(data_dir)
        .with_backend("simple")
        .with_index(IndexConfig {
            dimension,
            ..Default::default()
        })
}

/// Create and initialize an engine.
pub async fn test_engine(data_dir: &Path, embedder: Arc<HashEmbedder>) -> RagEngine {
    let dimension = embedder.dimension;
    let engine = RagEngine::new(test_settings(data_dir, dimension), embedder)
        .expect("engine should build");
    engine
        .initialize_database()
        .await
        .expect("store should initialize");
    engine
}

/// Write a file, creating parent directories.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(&path, content).expect("write file");
    path
}

/// Markdown with two sections, both long enough to be kept.
pub const TWO_SECTION_MARKDOWN: &str = "# Installation\n\n\
Download the archive and unpack it into your tools directory.\n\n\
# Configuration\n\n\
Point the data directory at a disk with enough free space.\n";

pub const SMALL_PYTHON: &str = "import os\n\n\
def read_config(path):\n    return open(path).read()\n";
