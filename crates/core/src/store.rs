//! Collaborator contracts the indexing engine is written against
//!
//! The engine never talks to a concrete filesystem or database directly:
//! the walker reads through [`SourceFs`], the capture loop drains a
//! [`NotificationSource`], and every write goes to a [`MirrorStore`] plus
//! the append-only [`EventPool`].

use crate::event::{ChangeBatch, ChangeEvent, TxId};
use crate::tree::{FileSystemNode, NodeUpdate};
use crate::Result;

/// Read access to the source filesystem, used by the tree walker only
pub trait SourceFs: Send + Sync {
    /// Status of a single path
    fn stat(&self, path: &str) -> Result<FileSystemNode>;

    /// Immediate children of a directory, in a stable order
    fn list_children(&self, path: &str) -> Result<Vec<FileSystemNode>>;
}

/// Stream of change notifications
pub trait NotificationSource: Send + Sync {
    /// Next available batch, without blocking
    fn poll(&self) -> Result<Option<ChangeBatch>>;
}

/// Write contract of the mirror.
///
/// Implementations must tolerate the same write being applied twice.
pub trait MirrorStore: Send + Sync {
    /// Drop every mirrored record
    fn wipe_all(&self) -> Result<()>;

    /// Create the record at `path` or merge `update` into it
    fn upsert_node(&self, path: &str, update: &NodeUpdate) -> Result<()>;

    /// Upsert several records at once
    fn upsert_batch(&self, updates: &[(String, NodeUpdate)]) -> Result<()> {
        for (path, update) in updates {
            self.upsert_node(path, update)?;
        }
        Ok(())
    }

    /// Remove `path` and everything below it
    fn delete_subtree(&self, path: &str) -> Result<()>;

    /// Move `old_path` and everything below it to `new_path`
    fn rename_subtree(&self, old_path: &str, new_path: &str) -> Result<()>;

    /// Cheap reachability check
    fn ping(&self) -> Result<()>;

    /// Persist buffered writes
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Append-only record of raw notifications
pub trait EventPool: Send + Sync {
    /// Record one event, returning its sequence number in the pool
    fn append(&self, txid: TxId, event: &ChangeEvent) -> Result<u64>;

    /// Drop every recorded event
    fn clear(&self) -> Result<()>;
}
