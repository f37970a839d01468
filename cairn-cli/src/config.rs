//! Configuration module
//!
//! Locates and loads the checkpoint defaults the CLI runs with.

use anyhow::{Context, Result};
use cairn_core::CheckpointDefaults;
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Defaults file given with `--config` or `CAIRN_CONFIG`
    pub defaults_path: Option<PathBuf>,
}

impl Config {
    /// Loads the defaults file (if any) and applies `CAIRN_*` overrides
    pub fn load_defaults(&self) -> Result<CheckpointDefaults> {
        let defaults = match &self.defaults_path {
            Some(path) => CheckpointDefaults::load(path)
                .with_context(|| format!("Failed to load defaults from {}", path.display()))?,
            None => CheckpointDefaults::default(),
        };

        defaults
            .with_env()
            .context("Invalid CAIRN_* environment variable")
    }
}
