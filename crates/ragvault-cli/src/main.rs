//! # ragvault CLI
//!
//! Command-line front-end for the RagVault knowledge base.
//!
//! This binary drives `ragvault-core`: indexing, search, pinned records,
//! snapshots and the running index configuration. Run `ragvault --help`
//! for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
