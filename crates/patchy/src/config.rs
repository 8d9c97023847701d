//! patchy configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::duration::parse_duration;

/// Default tracing filter when neither the config file nor `RUST_LOG` set one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// patchy configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
    /// Defaults for `recall`
    #[serde(default)]
    pub recall: RecallConfig,
    /// Defaults for `store`
    #[serde(default)]
    pub store: StoreConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Tracing filter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Recall settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    /// How long to wait for missing ports, e.g. "10s"
    #[serde(default = "default_wait")]
    pub wait: String,
    /// Fail on the first missing port instead of waiting
    #[serde(default)]
    pub strict: bool,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self { wait: default_wait(), strict: false }
    }
}

impl RecallConfig {
    /// Parsed wait duration.
    pub fn wait(&self) -> Result<Duration> {
        parse_duration(&self.wait)
            .with_context(|| format!("Invalid recall.wait in config: {:?}", self.wait))
    }
}

fn default_wait() -> String {
    "0s".to_string()
}

/// Store settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Indent written patch documents
    #[serde(default)]
    pub pretty: bool,
}

/// Load configuration from `path`, or from the default location.
///
/// An explicitly given file must exist; the default one is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => read_config(path),
        None => {
            let path = config_path()?;
            if path.exists() {
                read_config(&path)
            } else {
                debug!(?path, "Config file not found, using defaults");
                Ok(Config::default())
            }
        }
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {path:?}"))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {path:?}"))?;
    Ok(config)
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("org", "patchy", "patchy").context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
