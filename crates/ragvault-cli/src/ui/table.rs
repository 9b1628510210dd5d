//! Table rendering for CLI output using comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `ragvault snapshot list` | `render_snapshots_table()` |
//! | `ragvault config show` | `render_config_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use ragvault_core::{IndexConfig, SnapshotInfo};

use super::format::{format_bytes, format_relative_time, format_thousands, truncate_str};

/// Snapshot listing, newest first as returned by the engine.
///
/// ```text
/// NAME                 CHUNKS   FILES   DIM    SIZE     CREATED       ACTIVE
/// nightly               1,204      87   1024   4.1 MB   2h ago        *
/// auto_backup_2024...      50       3   1024   180 KB   2024-03-01
/// ```
pub fn render_snapshots_table(snapshots: &[SnapshotInfo]) -> String {
    if snapshots.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.set_header(vec![
        Cell::new("NAME"),
        Cell::new("CHUNKS").set_alignment(CellAlignment::Right),
        Cell::new("FILES").set_alignment(CellAlignment::Right),
        Cell::new("DIM").set_alignment(CellAlignment::Right),
        Cell::new("SIZE").set_alignment(CellAlignment::Right),
        Cell::new("CREATED"),
        Cell::new("ACTIVE"),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(12)), // NAME
        ColumnConstraint::LowerBoundary(Width::Fixed(7)),  // CHUNKS
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),  // FILES
        ColumnConstraint::LowerBoundary(Width::Fixed(5)),  // DIM
        ColumnConstraint::LowerBoundary(Width::Fixed(9)),  // SIZE
        ColumnConstraint::LowerBoundary(Width::Fixed(12)), // CREATED
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),  // ACTIVE
    ]);

    for snapshot in snapshots {
        let meta = &snapshot.metadata;
        table.add_row(vec![
            Cell::new(truncate_str(&meta.name, 32)),
            Cell::new(format_thousands(meta.chunks as u64)).set_alignment(CellAlignment::Right),
            Cell::new(format_thousands(meta.files as u64)).set_alignment(CellAlignment::Right),
            Cell::new(meta.dimension).set_alignment(CellAlignment::Right),
            Cell::new(format_bytes(snapshot.size_bytes)).set_alignment(CellAlignment::Right),
            Cell::new(format_relative_time(meta.created_at)),
            Cell::new(if snapshot.is_active { "*" } else { "" }),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Two-column KEY / VALUE view of the running index configuration.
///
/// Keys are the ones `ragvault config set` accepts.
pub fn render_config_table(config: &IndexConfig) -> String {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![Cell::new("KEY"), Cell::new("VALUE")]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(18)),
        ColumnConstraint::LowerBoundary(Width::Fixed(10)),
    ]);

    let reranker = match &config.reranker_model {
        Some(model) => model.clone(),
        None => format!("(text model: {})", config.effective_reranker_model()),
    };

    let rows: Vec<(&str, String)> = vec![
        ("text_model", config.text_model.clone()),
        ("code_model", config.code_model.clone()),
        ("embedding_mode", config.embedding_mode.to_string()),
        ("dimension", config.dimension.to_string()),
        ("reranker_model", reranker),
        ("chunk_size", config.chunk_size.to_string()),
        ("chunk_overlap", config.chunk_overlap.to_string()),
        ("semantic_chunking", config.semantic_chunking.to_string()),
        ("retrieve_top_k", config.retrieve_top_k.to_string()),
        ("rerank_top_n", config.rerank_top_n.to_string()),
        ("use_reranking", config.use_reranking.to_string()),
    ];

    for (key, value) in rows {
        table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }

    table.trim_fmt().to_string()
}
