//! One-shot full reindex

use super::ConnectArgs;
use anyhow::{Context, Result};
use dbfs_cli::{logging, Manager};
use owo_colors::OwoColorize;
use std::time::Instant;

pub async fn run(args: ConnectArgs) -> Result<()> {
    let config = args.load_config()?;
    let _guard = logging::init(&config.logging)?;

    let mut manager = Manager::open(&config).context("Failed to connect")?;
    let started = Instant::now();
    let summary = tokio::task::block_in_place(|| manager.index()).context("Indexing failed")?;
    let elapsed = started.elapsed();
    manager.stop().await.context("Failed to close store")?;

    println!("{}", "Index complete".bold());
    println!("  {}: {}", "Root".dimmed(), manager.root().cyan());
    println!("  {}: {}", "Store".dimmed(), config.store.path.display());
    println!("  {}: {}", "Directories".dimmed(), summary.directories);
    println!("  {}: {}", "Files".dimmed(), summary.files);
    println!("  {}: {}", "Bytes".dimmed(), summary.bytes);
    println!("  {}: {:.2?}", "Took".dimmed(), elapsed);
    Ok(())
}
