//! Configuration system for rewritr
//!
//! RewritrConfig carries the model location and the default rewrite
//! parameters handed to sessions when the caller does not override them.

mod rewrite;

pub use rewrite::{RewriteParams, MAX_TEMPERATURE};

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Rewritr configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewritrConfig {
    /// Path to the model container to load at startup; models can also be
    /// loaded per-session
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Default rewrite request parameters
    #[serde(default)]
    pub rewrite: RewriteParams,
}

impl RewritrConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }
}
