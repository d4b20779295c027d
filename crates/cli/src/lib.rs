//! dbfs library: manager lifecycle, configuration and logging setup
//!
//! The `dbfs` binary is a thin clap front end over these modules.

pub mod config;
pub mod daemon;
pub mod logging;

pub use config::Config;
pub use daemon::{Manager, ManagerParts, ManagerState};
