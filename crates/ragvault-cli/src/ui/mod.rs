//! # CLI UI Module
//!
//! Styling and formatting layer for `ragvault` output.
//!
//! Every human-readable line goes through [`Style`] so that `--color`,
//! `NO_COLOR` and non-TTY output behave the same across commands. `--json`
//! bypasses this module entirely.
//!
//! ## Module Structure
//!
//! - `color`: Color mode detection and terminal capability checks
//! - `style`: Message types, prefixes, and styling functions
//! - `format`: Utility formatters (bytes, time, truncation, snippets)
//! - `table`: Snapshot and config tables with comfy-table
//! - `progress`: Indexing progress driven by core progress events

pub mod color;
pub mod format;
pub mod progress;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use progress::{IndexProgress, ProgressMode};
pub use style::{MessageType, Style};
