//! Show the effective configuration

use anyhow::{Context, Result};
use dbfs_cli::Config;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(path)?;

    let location = match path {
        Some(path) => path.display().to_string(),
        None => match Config::default_path() {
            Some(path) if path.exists() => path.display().to_string(),
            Some(path) => format!("{} (not found, using defaults)", path.display()),
            None => "(defaults)".to_string(),
        },
    };

    println!("{}", "dbfs Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), location.dimmed());
    let text = toml::to_string_pretty(&config).context("Failed to render config")?;
    println!("{}", text);
    Ok(())
}
