//! Core types for dbfs
//!
//! This crate provides:
//! - Change notifications (`ChangeEvent`, `ChangeBatch`)
//! - Filesystem nodes and mirrored records
//! - Mirror path helpers
//! - Collaborator traits for the source filesystem, notification source and store

pub mod error;
pub mod event;
pub mod path;
pub mod store;
pub mod tree;

// Re-exports
pub use error::{BoxError, Error, Result};
pub use event::{ChangeBatch, ChangeEvent, TxId};
pub use store::{EventPool, MirrorStore, NotificationSource, SourceFs};
pub use tree::{FileSystemNode, MirrorRecord, NodeAttributes, NodeKind, NodeUpdate};
