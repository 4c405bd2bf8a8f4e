use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::repository::MAX_SQLITE_PARAMETERS;

/// Settings read from the optional TOML config file.
///
/// ```toml
/// [database]
/// path = "/var/lib/commitgraph/index.db"
///
/// [store]
/// max_parameters = 32766
/// max_commits = 50000
/// ```
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Bound parameters allowed per INSERT statement
    #[serde(default = "default_max_parameters")]
    pub max_parameters: usize,
    /// Truncate history to this many commits from the tip
    #[serde(default)]
    pub max_commits: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_parameters: default_max_parameters(),
            max_commits: None,
        }
    }
}

fn default_max_parameters() -> usize {
    MAX_SQLITE_PARAMETERS
}

impl Config {
    /// Load from `path`, or fall back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.store.max_parameters < 4 {
            anyhow::bail!(
                "store.max_parameters must be at least 4, got {}",
                config.store.max_parameters
            );
        }
        Ok(config)
    }

    /// Database file to use: configured path, else the user cache directory
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        let cache_dir = dirs::cache_dir()
            .context("Could not determine cache directory")?
            .join("codeintel-commitgraph");
        Ok(cache_dir.join("index.db"))
    }
}
