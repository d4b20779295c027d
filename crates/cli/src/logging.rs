//! Tracing subscriber setup

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file prefix inside `logging.directory`
pub const LOG_FILE_NAME: &str = "dbfs.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.level`. When a log directory is configured,
/// the returned guard must be held until exit so buffered lines get written.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level {:?}", config.level))?;
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let Some(directory) = config.directory() else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr)
            .try_init()
            .context("Failed to install log subscriber")?;
        return Ok(None);
    };

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;
    let appender = RollingFileAppender::new(Rotation::DAILY, directory, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .context("Failed to install log subscriber")?;
    Ok(Some(guard))
}
