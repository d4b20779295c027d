//! Run the manager in the foreground until Ctrl-C

use super::ConnectArgs;
use anyhow::{Context, Result};
use dbfs_cli::{logging, Manager};
use owo_colors::OwoColorize;
use std::time::Duration;
use tracing::{info, warn};

const HEALTH_INTERVAL: Duration = Duration::from_secs(30);

pub async fn run(args: ConnectArgs) -> Result<()> {
    let config = args.load_config()?;
    let _guard = logging::init(&config.logging)?;

    let mut manager = Manager::open(&config).context("Failed to connect")?;

    // The walk is synchronous and may take a while
    let summary = tokio::task::block_in_place(|| manager.start()).context("Failed to start")?;
    println!(
        "{} Indexed {} ({})",
        "✓".green(),
        manager.root().cyan(),
        summary
    );
    println!("{}", "Watching for changes, press Ctrl-C to stop".dimmed());

    let mut health = tokio::time::interval(HEALTH_INTERVAL);
    health.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res.context("Failed to listen for Ctrl-C")?;
                info!("Shutdown requested");
                break;
            }
            _ = health.tick() => {
                if manager.status() {
                    info!("Manager healthy, state={}", manager.state());
                } else {
                    warn!("Manager unhealthy: capture stopped or store unreachable");
                }
            }
        }
    }

    manager.stop().await.context("Failed to stop")?;
    println!("{} Stopped", "✓".green());
    Ok(())
}
