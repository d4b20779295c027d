//! dbfs CLI - mirror a source directory into a sled database

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

use cmd::ConnectArgs;

/// dbfs - keep a queryable mirror of a filesystem subtree
#[derive(Parser)]
#[command(name = "dbfs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the root, then keep the mirror in sync until Ctrl-C
    Run(ConnectArgs),
    /// Wipe the mirror and index the root once
    Index(ConnectArgs),
    /// Print the effective configuration
    Config {
        /// Config file (default: <config_dir>/dbfs/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd::run::run(args).await,
        Commands::Index(args) => cmd::index::run(args).await,
        Commands::Config { config } => cmd::config::run(config.as_deref()),
    }
}
