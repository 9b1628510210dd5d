//! Integration tests for the snapshot manager.
//!
//! - Save / list / info, naming rules
//! - Load round-trip with identical ranking
//! - Append with dedup and dimension check
//! - Validation, active pointer and delete protection

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ragvault_core::{LoadOptions, RagEngine, RagError, SaveOptions, SnapshotSettings};
use tempfile::TempDir;

use common::{test_engine, test_settings, write_file, HashEmbedder, TWO_SECTION_MARKDOWN};

const DIM: usize = 64;

fn note_files(dir: &Path, count: usize, prefix: &str) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            write_file(
                dir,
                &format!("{prefix}{i:02}.txt"),
                &format!("Note {i} from {prefix} covers topic {prefix}{i}."),
            )
        })
        .collect()
}

async fn top_files(engine: &RagEngine, query: &str) -> Vec<String> {
    engine
        .search(query)
        .await
        .expect("search")
        .results
        .into_iter()
        .map(|h| h.file_path)
        .collect()
}

// ============================================================================
// Save / list
// ============================================================================

#[tokio::test]
async fn test_save_then_list_reports_exact_name_and_chunks() {
    let temp = TempDir::new().expect("create temp dir");
    let engine = test_engine(&temp.path().join("data"), Arc::new(HashEmbedder::new(DIM))).await;
    let files = note_files(&temp.path().join("docs"), 50, "n");
    engine.add_documents(&files, None).await.expect("index");
    assert_eq!(engine.stats().await.expect("stats").count, 50);

    let saved = engine
        .save_snapshot("nightly", SaveOptions::default())
        .await
        .expect("save");
    assert_eq!(saved.name, "nightly");
    assert_eq!(saved.chunks, 50);

    let list = engine.list_snapshots().await.expect("list");
    let nightly = list
        .iter()
        .find(|s| s.metadata.name == "nightly")
        .expect("nightly listed");
    assert_eq!(nightly.metadata.chunks, 50);
    assert_eq!(nightly.metadata.files, 50);
    assert!(nightly.size_bytes > 0);
    assert!(!nightly.is_active);

    // The live store is usable after the save
    assert_eq!(engine.stats().await.expect("stats").count, 50);
}

#[tokio::test]
async fn test_save_naming_rules() {
    let temp = TempDir::new().expect("create temp dir");
    let engine = test_engine(&temp.path().join("data"), Arc::new(HashEmbedder::new(DIM))).await;

    let err = engine
        .save_snapshot("empty", SaveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::EmptyStore));

    engine
        .add_documents(&note_files(&temp.path().join("docs"), 2, "x"), None)
        .await
        .expect("index");

    let first = engine
        .save_snapshot("my docs", SaveOptions::default())
        .await
        .expect("save");
    let second = engine
        .save_snapshot("my docs", SaveOptions::default())
        .await
        .expect("save");
    let stamped = engine
        .save_snapshot(
            "release",
            SaveOptions {
                auto_timestamp: true,
            },
        )
        .await
        .expect("save");

    assert_eq!(first.name, "my_docs");
    assert_eq!(second.name, "my_docs_1");
    // release_YYYYMMDD_HHMMSS
    assert!(stamped.name.starts_with("release_"));
    assert_eq!(stamped.name.len(), "release_".len() + 15);

    let listed = engine.list_snapshots().await.expect("list");
    assert_eq!(listed.len(), 3);
    // no temp directories left behind
    let leftovers = fs::read_dir(&engine.layout().snapshots_dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
        .count();
    assert_eq!(leftovers, 0);
}

// ============================================================================
// Load
// ============================================================================

#[tokio::test]
async fn test_round_trip_restores_count_and_ranking() {
    let temp = TempDir::new().expect("create temp dir");
    let engine = test_engine(&temp.path().join("data"), Arc::new(HashEmbedder::new(DIM))).await;
    let mut files = note_files(&temp.path().join("docs"), 8, "rt");
    files.push(write_file(&temp.path().join("docs"), "guide.md", TWO_SECTION_MARKDOWN));
    engine.add_documents(&files, None).await.expect("index");

    let count = engine.stats().await.expect("stats").count;
    let query = "topic rt3 note";
    let before = top_files(&engine, query).await;

    engine
        .save_snapshot("rt", SaveOptions::default())
        .await
        .expect("save");
    engine.clear_database().await.expect("clear");
    assert_eq!(engine.stats().await.expect("stats").count, 0);

    let loaded = engine
        .load_snapshot("rt", LoadOptions { skip_backup: true })
        .await
        .expect("load");
    assert_eq!(loaded.chunks, count);
    assert!(loaded.backup.is_none());

    let stats = engine.stats().await.expect("stats");
    assert_eq!(stats.count, count);
    assert_eq!(stats.active_snapshot.as_deref(), Some("rt"));
    assert!(!stats.modified_since_load);
    assert_eq!(top_files(&engine, query).await, before);

    let info = engine.snapshot_info("rt").await.expect("info");
    assert!(info.is_active);
}

#[tokio::test]
async fn test_load_backs_up_live_store_and_adopts_config() {
    let temp = TempDir::new().expect("create temp dir");
    let engine = test_engine(&temp.path().join("data"), Arc::new(HashEmbedder::new(DIM))).await;
    engine
        .add_documents(&note_files(&temp.path().join("docs"), 3, "a"), None)
        .await
        .expect("index");
    engine
        .save_snapshot("three", SaveOptions::default())
        .await
        .expect("save");
    engine
        .add_documents(&note_files(&temp.path().join("more"), 2, "b"), None)
        .await
        .expect("index");

    let loaded = engine
        .load_snapshot("three", LoadOptions::default())
        .await
        .expect("load");
    let backup = loaded.backup.expect("backup taken");
    assert!(backup.starts_with("auto_backup_"));

    let backup_info = engine.snapshot_info(&backup).await.expect("backup exists");
    assert_eq!(backup_info.metadata.chunks, 5);
    assert_eq!(engine.stats().await.expect("stats").count, 3);

    // writes after the load flag the pointer
    engine
        .add_documents(&note_files(&temp.path().join("later"), 1, "c"), None)
        .await
        .expect("index");
    let active = engine
        .active_snapshot()
        .await
        .expect("pointer")
        .expect("active snapshot");
    assert_eq!(active.snapshot_name, "three");
    assert!(active.modified_since_load);
}

#[tokio::test]
async fn test_load_rejects_missing_model_and_keeps_store() {
    let temp = TempDir::new().expect("create temp dir");
    let data = temp.path().join("data");
    let engine = test_engine(&data, Arc::new(HashEmbedder::new(DIM))).await;
    engine
        .add_documents(&note_files(&temp.path().join("docs"), 2, "m"), None)
        .await
        .expect("index");
    engine
        .save_snapshot("snap", SaveOptions::default())
        .await
        .expect("save");
    drop(engine);

    // Same data dir, but the service no longer has the code model
    let embedder = HashEmbedder::new(DIM).with_models(&["mxbai-embed-large"]);
    let engine = RagEngine::new(test_settings(&data, DIM), Arc::new(embedder)).expect("engine");
    engine.initialize_database().await.expect("init");

    let err = engine
        .load_snapshot("snap", LoadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::SnapshotValidation(_)));
    assert_eq!(engine.stats().await.expect("stats").count, 2);

    let report = engine
        .check_snapshot_compatibility("snap")
        .await
        .expect("check");
    assert!(!report.compatible);
    assert!(report.issues.iter().any(|i| i.contains("qwen3-embedding")));
}

#[tokio::test]
async fn test_load_rejects_probe_dimension_mismatch() {
    let temp = TempDir::new().expect("create temp dir");
    let data = temp.path().join("data");
    let engine = test_engine(&data, Arc::new(HashEmbedder::new(DIM))).await;
    engine
        .add_documents(&note_files(&temp.path().join("docs"), 1, "d"), None)
        .await
        .expect("index");
    engine
        .save_snapshot("snap", SaveOptions::default())
        .await
        .expect("save");
    drop(engine);

    let embedder = HashEmbedder::new(DIM).with_model_dimension("mxbai-embed-large", 32);
    let engine = RagEngine::new(test_settings(&data, DIM), Arc::new(embedder)).expect("engine");
    engine.initialize_database().await.expect("init");

    let err = engine
        .load_snapshot("snap", LoadOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Dimension mismatch"));
}

#[tokio::test]
async fn test_fingerprint_is_a_stored_vector() {
    let temp = TempDir::new().expect("create temp dir");
    let engine = test_engine(&temp.path().join("data"), Arc::new(HashEmbedder::new(DIM))).await;
    engine
        .add_documents(&note_files(&temp.path().join("docs"), 1, "f"), None)
        .await
        .expect("index");
    engine
        .save_snapshot("fp", SaveOptions::default())
        .await
        .expect("save");

    let meta_path = engine.layout().snapshot_dir("fp").join("snapshot.json");
    let mut meta: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&meta_path).expect("read meta")).expect("json");
    let sample = meta["fingerprint"].as_array().expect("fingerprint array");
    assert_eq!(sample.len(), DIM);

    // A truncated fingerprint no longer matches the recorded dimension
    meta["fingerprint"] = serde_json::json!([0.5, 0.5]);
    fs::write(&meta_path, meta.to_string()).expect("write meta");

    let report = engine
        .check_snapshot_compatibility("fp")
        .await
        .expect("check");
    assert!(!report.compatible);
    assert!(report.issues.iter().any(|i| i.contains("fingerprint")));

    let err = engine
        .load_snapshot("fp", LoadOptions { skip_backup: true })
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::SnapshotValidation(_)));
    assert_eq!(engine.stats().await.expect("stats").count, 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_copy_keeps_live_store() {
    let temp = TempDir::new().expect("create temp dir");
    let engine = test_engine(&temp.path().join("data"), Arc::new(HashEmbedder::new(DIM))).await;
    engine
        .add_documents(&note_files(&temp.path().join("docs"), 6, "k"), None)
        .await
        .expect("index");
    engine
        .save_snapshot("snap", SaveOptions::default())
        .await
        .expect("save");

    // A dangling link makes the copy fail before the live store is touched
    let snapshot_store = engine.layout().snapshot_dir("snap").join("store");
    std::os::unix::fs::symlink(temp.path().join("gone"), snapshot_store.join("broken"))
        .expect("symlink");

    let err = engine
        .load_snapshot("snap", LoadOptions { skip_backup: true })
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::SnapshotRestore { .. }), "{err}");

    assert_eq!(engine.stats().await.expect("stats").count, 6);
    assert!(engine.active_snapshot().await.expect("pointer").is_none());
    let leftovers = fs::read_dir(&engine.layout().root)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_old_format_snapshot_is_rejected() {
    let temp = TempDir::new().expect("create temp dir");
    let engine = test_engine(&temp.path().join("data"), Arc::new(HashEmbedder::new(DIM))).await;

    let dir = engine.layout().snapshot_dir("legacy");
    fs::create_dir_all(dir.join("store")).expect("mkdir");
    fs::write(
        dir.join("snapshot.json"),
        r#"{"name":"legacy","createdAt":"2024-01-01T00:00:00Z","textModel":"mxbai-embed-large","dimension":64,"chunks":1}"#,
    )
    .expect("write meta");

    let err = engine
        .load_snapshot("legacy", LoadOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("too old"));
}

#[tokio::test]
async fn test_missing_snapshot() {
    let temp = TempDir::new().expect("create temp dir");
    let engine = test_engine(temp.path(), Arc::new(HashEmbedder::new(DIM))).await;
    for name in ["nope", "../store", ".tmp-x"] {
        let err = engine
            .load_snapshot(name, LoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::SnapshotNotFound(_)), "{name}");
    }
}

// ============================================================================
// Append
// ============================================================================

#[tokio::test]
async fn test_append_skips_existing_files() {
    let temp = TempDir::new().expect("create temp dir");
    let settings = common::test_settings(&temp.path().join("data"), DIM);
    let settings = ragvault_core::RagSettings {
        snapshots: SnapshotSettings {
            append_batch_size: 2,
            ..Default::default()
        },
        ..settings
    };
    let engine = RagEngine::new(settings, Arc::new(HashEmbedder::new(DIM))).expect("engine");
    engine.initialize_database().await.expect("init");

    let docs = temp.path().join("docs");
    let shared = note_files(&docs, 2, "s");
    let extra = note_files(&docs, 3, "e");

    engine
        .add_documents(&[shared.clone(), extra].concat(), None)
        .await
        .expect("index");
    engine
        .save_snapshot("full", SaveOptions::default())
        .await
        .expect("save");

    engine.clear_database().await.expect("clear");
    engine.add_documents(&shared, None).await.expect("index");

    let outcome = engine.append_snapshot("full").await.expect("append");
    assert_eq!(outcome.files_added, 3);
    assert_eq!(outcome.records_added, 3);
    assert_eq!(outcome.duplicates_skipped, 2);
    assert!(outcome.warnings.is_empty());
    assert_eq!(engine.stats().await.expect("stats").count, 5);
}

#[tokio::test]
async fn test_append_dimension_mismatch_leaves_store_unchanged() {
    let temp = TempDir::new().expect("create temp dir");

    // Build a 768-dimension snapshot in a separate data dir
    let other_data = temp.path().join("other");
    let other = test_engine(&other_data, Arc::new(HashEmbedder::new(768))).await;
    other
        .add_documents(&note_files(&temp.path().join("odocs"), 2, "o"), None)
        .await
        .expect("index");
    other
        .save_snapshot("other", SaveOptions::default())
        .await
        .expect("save");

    let engine = test_engine(&temp.path().join("data"), Arc::new(HashEmbedder::new(1024))).await;
    engine
        .add_documents(&note_files(&temp.path().join("docs"), 3, "l"), None)
        .await
        .expect("index");
    fs::create_dir_all(&engine.layout().snapshots_dir).expect("mkdir");
    fs::rename(
        other.layout().snapshot_dir("other"),
        engine.layout().snapshot_dir("other"),
    )
    .expect("move snapshot");

    let err = engine.append_snapshot("other").await.unwrap_err();
    assert!(matches!(
        err,
        RagError::DimensionMismatch {
            expected: 1024,
            actual: 768
        }
    ));
    assert!(err.to_string().contains("Dimension mismatch"));
    assert_eq!(engine.stats().await.expect("stats").count, 3);
}

// ============================================================================
// Delete / clear
// ============================================================================

#[tokio::test]
async fn test_delete_refuses_active_snapshot() {
    let temp = TempDir::new().expect("create temp dir");
    let engine = test_engine(&temp.path().join("data"), Arc::new(HashEmbedder::new(DIM))).await;
    engine
        .add_documents(&note_files(&temp.path().join("docs"), 2, "z"), None)
        .await
        .expect("index");
    engine
        .save_snapshot("keep", SaveOptions::default())
        .await
        .expect("save");
    engine
        .save_snapshot("drop", SaveOptions::default())
        .await
        .expect("save");
    engine
        .load_snapshot("keep", LoadOptions { skip_backup: true })
        .await
        .expect("load");

    let err = engine.delete_snapshot("keep").await.unwrap_err();
    assert!(matches!(err, RagError::SnapshotInUse(_)));

    engine.delete_snapshot("drop").await.expect("delete");
    assert!(matches!(
        engine.snapshot_info("drop").await.unwrap_err(),
        RagError::SnapshotNotFound(_)
    ));

    // clearing forgets the active snapshot, after which it can be deleted
    engine.clear_database().await.expect("clear");
    assert!(engine.active_snapshot().await.expect("pointer").is_none());
    engine.delete_snapshot("keep").await.expect("delete");
    assert!(engine.list_snapshots().await.expect("list").is_empty());
}
