//! On-disk layout of a RagVault data directory.
//!
//! ```text
//! {data_dir}/
//!   store/                    live vector store
//!   index_config.json         running IndexConfig
//!   active_snapshot.json      ActiveSnapshotPointer (absent when none)
//!   snapshots/
//!     {name}/store/           snapshot copy of the store
//!     {name}/snapshot.json    SnapshotMetadata
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    ACTIVE_SNAPSHOT_FILENAME, SNAPSHOTS_DIR, SNAPSHOT_META_FILENAME, STORE_DIR,
};
use crate::errors::RagError;

/// Running config file name inside the data directory.
pub const INDEX_CONFIG_FILENAME: &str = "index_config.json";

/// Resolved paths for one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub root: PathBuf,
    pub store_dir: PathBuf,
    pub snapshots_dir: PathBuf,
    pub active_pointer_path: PathBuf,
    pub config_path: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            store_dir: root.join(STORE_DIR),
            snapshots_dir: root.join(SNAPSHOTS_DIR),
            active_pointer_path: root.join(ACTIVE_SNAPSHOT_FILENAME),
            config_path: root.join(INDEX_CONFIG_FILENAME),
            root,
        }
    }

    /// Directory of a named snapshot.
    pub fn snapshot_dir(&self, name: &str) -> PathBuf {
        self.snapshots_dir.join(name)
    }

    /// Store copy inside a snapshot directory.
    pub fn snapshot_store_dir(snapshot_dir: &Path) -> PathBuf {
        snapshot_dir.join(STORE_DIR)
    }

    /// Metadata file inside a snapshot directory.
    pub fn snapshot_meta_path(snapshot_dir: &Path) -> PathBuf {
        snapshot_dir.join(SNAPSHOT_META_FILENAME)
    }

    /// Create the data and snapshot directories.
    pub fn ensure_dirs(&self) -> Result<(), RagError> {
        fs::create_dir_all(&self.root)?;
        fs::create_dir_all(&self.snapshots_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = DataLayout::new("/data");
        assert_eq!(layout.store_dir, PathBuf::from("/data/store"));
        assert_eq!(
            DataLayout::snapshot_meta_path(&layout.snapshot_dir("nightly")),
            PathBuf::from("/data/snapshots/nightly/snapshot.json")
        );
    }
}
