//! Configuration file handling
//!
//! Loads/saves a TOML config at `<config_dir>/dbfs/config.toml`. Every field
//! has a default, so a partial (or missing) file is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest accepted `capture.poll_interval_ms`
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from an explicit path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Load `path` if given, otherwise the default file if it exists, otherwise defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Default config path: `<config_dir>/dbfs/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dbfs").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        dbfs_core::path::normalize(&self.source.root)
            .with_context(|| format!("Invalid source.root {:?}", self.source.root))?;
        if self.store.path.as_os_str().is_empty() {
            anyhow::bail!("store.path must not be empty");
        }
        if self.capture.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            anyhow::bail!(
                "capture.poll_interval_ms must be at most {}, got {}",
                MAX_POLL_INTERVAL_MS,
                self.capture.poll_interval_ms
            );
        }
        // An unreadable source address is reported when the manager opens it
        if let (Ok(source), Ok(store)) = (
            self.source.address.canonicalize(),
            dbfs_watcher::canonicalize_partial(&self.store.path),
        ) {
            if store.starts_with(&source) {
                anyhow::bail!(
                    "store.path {} must not be inside source.address {}",
                    store.display(),
                    source.display()
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Local directory acting as the source filesystem
    pub address: PathBuf,
    /// Path inside the source to index
    pub root: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            address: PathBuf::from("."),
            root: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// sled database directory
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("dbfs")
                .join("mirror"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Idle backoff base in milliseconds
    pub poll_interval_ms: u64,
}

impl CaptureConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: dbfs_watcher::POLLING_INTERVAL.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Directory for daily log files; empty logs to stderr only
    pub directory: PathBuf,
}

impl LoggingConfig {
    pub fn directory(&self) -> Option<&Path> {
        if self.directory.as_os_str().is_empty() {
            None
        } else {
            Some(&self.directory)
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: PathBuf::new(),
        }
    }
}
