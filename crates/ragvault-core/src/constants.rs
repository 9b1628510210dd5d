//! Common constants used throughout ragvault-core.

// ============================================================================
// Directory and File Names
// ============================================================================

/// The name of the RagVault home directory (`~/.ragvault`).
pub const RAGVAULT_HOME_DIR: &str = ".ragvault";

/// Default data directory under the home directory.
pub const DEFAULT_DATA_SUBDIR: &str = "data";

/// Settings file name inside the home directory.
pub const CONFIG_FILENAME: &str = "config.yaml";

/// Environment variable that overrides the settings file location.
pub const CONFIG_ENV: &str = "RAGVAULT_CONFIG";

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "RAGVAULT_DATA_DIR";

/// Live store directory inside the data directory.
pub const STORE_DIR: &str = "store";

/// Snapshot directory inside the data directory.
///
/// Layout: `snapshots/{name}/store/` + `snapshots/{name}/snapshot.json`
pub const SNAPSHOTS_DIR: &str = "snapshots";

/// Snapshot metadata file name.
pub const SNAPSHOT_META_FILENAME: &str = "snapshot.json";

/// Active snapshot pointer file name.
pub const ACTIVE_SNAPSHOT_FILENAME: &str = "active_snapshot.json";

/// Prefix for in-progress copies; never listed as snapshots.
pub const TMP_PREFIX: &str = ".tmp-";

/// Name prefix for automatic backups taken before load / indexing.
pub const AUTO_BACKUP_PREFIX: &str = "auto_backup";

/// Current snapshot format. Version 1 lacked the code model id.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 2;

// ============================================================================
// Chunking
// ============================================================================

/// Characters per token used to turn token budgets into character windows.
pub const CHARS_PER_TOKEN: usize = 4;

/// Chunks shorter than this after trimming are dropped (Markdown).
pub const MIN_CHUNK_CHARS: usize = 20;

// ============================================================================
// Retrieval
// ============================================================================

/// Characters of chunk text used in the dedup key.
pub const DEDUP_PREFIX_CHARS: usize = 100;

/// Text embedded to probe a model's output dimension.
pub const DIMENSION_PROBE_TEXT: &str = "dimension probe";

// ============================================================================
// Ignored Directories
// ============================================================================

/// Directories skipped when a directory is passed to the indexer.
pub const ALWAYS_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".ragvault",
    "target",
    "node_modules",
    ".next",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    "venv",
];

/// Check if a directory name should always be ignored.
#[inline]
pub fn should_ignore_dir(name: &str) -> bool {
    ALWAYS_IGNORED_DIRS.contains(&name)
}
