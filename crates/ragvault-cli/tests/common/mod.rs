//! Shared test utilities for ragvault-cli integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Get a Command for the ragvault binary.
#[allow(deprecated)]
pub fn ragvault_cmd() -> Command {
    Command::cargo_bin("ragvault").expect("ragvault binary should exist")
}

/// An isolated settings file and data directory on the simple backend.
pub struct Sandbox {
    pub temp: TempDir,
    pub config: PathBuf,
    pub data_dir: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let config = temp.path().join("config.yaml");
        fs::write(
            &config,
            "store:\n  backend: simple\n\
             embedding:\n  base_url: http://127.0.0.1:9\n  timeout_secs: 2\n  max_retries: 0\n",
        )
        .expect("write settings");
        let data_dir = temp.path().join("data");
        Self {
            temp,
            config,
            data_dir,
        }
    }

    /// `ragvault` pointed at this sandbox, with colors and env overrides off.
    pub fn cmd(&self) -> Command {
        let mut cmd = ragvault_cmd();
        cmd.env_remove("RAGVAULT_CONFIG")
            .env_remove("RAGVAULT_DATA_DIR")
            .env_remove("RAGVAULT_VERBOSE")
            .env("NO_COLOR", "1")
            .arg("--config")
            .arg(&self.config)
            .arg("--data-dir")
            .arg(&self.data_dir);
        cmd
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}
