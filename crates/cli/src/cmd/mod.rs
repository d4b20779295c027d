//! CLI command implementations

pub mod config;
pub mod index;
pub mod run;

use anyhow::Result;
use clap::Args;
use dbfs_cli::Config;
use std::path::PathBuf;

/// Where to read from and write to; flags override the config file
#[derive(Args, Debug, Default)]
pub struct ConnectArgs {
    /// Config file (default: <config_dir>/dbfs/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Local directory acting as the source filesystem
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Path inside the source to index
    #[arg(long)]
    pub root: Option<String>,

    /// sled database directory
    #[arg(long)]
    pub store: Option<PathBuf>,
}

impl ConnectArgs {
    /// Load the config file and apply flag overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(self.config.as_deref())?;
        if let Some(source) = &self.source {
            config.source.address = source.clone();
        }
        if let Some(root) = &self.root {
            config.source.root = root.clone();
        }
        if let Some(store) = &self.store {
            config.store.path = store.clone();
        }
        config.validate()?;
        Ok(config)
    }
}
