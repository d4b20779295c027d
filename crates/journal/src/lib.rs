//! Mirror persistence for dbfs
//!
//! This crate provides:
//! - The mirror database handle (sled embedded DB)
//! - `SledMirror`, the path-keyed mirror store
//! - `SledEventPool`, the append-only notification log

pub mod db;
pub mod mirror;
pub mod pool;

// Re-exports
pub use db::MirrorDb;
pub use mirror::SledMirror;
pub use pool::{PooledEvent, SledEventPool};
