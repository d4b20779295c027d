//! Routing of change notifications to mirror writes

use dbfs_core::path::is_within;
use dbfs_core::{
    ChangeBatch, ChangeEvent, EventPool, MirrorStore, NodeUpdate, Result, TxId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Applies change notifications to the mirror.
///
/// Every event is logged to the event pool first. Only events inside
/// `root` change the mirror.
pub struct Dispatcher {
    store: Arc<dyn MirrorStore>,
    pool: Arc<dyn EventPool>,
    root: String,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn MirrorStore>, pool: Arc<dyn EventPool>, root: impl Into<String>) -> Self {
        Self {
            store,
            pool,
            root: root.into(),
        }
    }

    /// Apply every event of a batch, in order
    pub fn process_batch(&self, batch: &ChangeBatch) -> Result<()> {
        for event in &batch.events {
            self.process_event(event, batch.txid)?;
        }
        Ok(())
    }

    /// Apply one event
    pub fn process_event(&self, event: &ChangeEvent, txid: TxId) -> Result<()> {
        self.pool.append(txid, event)?;

        match event {
            ChangeEvent::Append { path } => self.do_append(path),
            ChangeEvent::Close {
                path,
                size,
                timestamp,
            } => {
                info!("CLOSE(filesize={}, path={}, ts={})", size, path, timestamp);
                self.upsert(event, path)
            }
            ChangeEvent::Create {
                path, owner, group, ..
            } => {
                info!("CREATE(group={}, owner={}, path={})", group, owner, path);
                self.upsert(event, path)
            }
            ChangeEvent::MetadataUpdate {
                path,
                owner,
                group,
                permissions,
                acls,
                atime,
            } => {
                info!(
                    "METADATA(acls={:?}, group={:?}, owner={:?}, path={}, atime={:?}, perms={:?})",
                    acls, group, owner, path, atime, permissions
                );
                self.upsert(event, path)
            }
            ChangeEvent::Rename {
                src,
                dst,
                timestamp,
            } => {
                info!("RENAME(ts={}, src={}, dst={})", timestamp, src, dst);
                self.do_rename(src, dst)
            }
            ChangeEvent::Unlink { path, timestamp } => {
                info!("UNLINK(ts={}, path={})", timestamp, path);
                self.do_unlink(path)
            }
        }
    }

    fn in_scope(&self, path: &str) -> bool {
        is_within(&self.root, path)
    }

    fn do_append(&self, path: &str) -> Result<()> {
        // Size only becomes authoritative on close
        info!("APPEND(path={})", path);
        Ok(())
    }

    fn upsert(&self, event: &ChangeEvent, path: &str) -> Result<()> {
        if !self.in_scope(path) {
            debug!("Skipping {} outside of {}", path, self.root);
            return Ok(());
        }
        match event.node_update() {
            Some(update) => self.store.upsert_node(path, &update),
            None => Ok(()),
        }
    }

    fn do_rename(&self, src: &str, dst: &str) -> Result<()> {
        match (self.in_scope(src), self.in_scope(dst)) {
            (true, true) => self.store.rename_subtree(src, dst),
            (true, false) => {
                debug!("{} moved out of {}", src, self.root);
                self.store.delete_subtree(src)
            }
            (false, true) => {
                warn!(
                    "{} moved into {} from {}, contents are unknown until the next reindex",
                    dst, self.root, src
                );
                self.store.upsert_node(dst, &NodeUpdate::default())
            }
            (false, false) => Ok(()),
        }
    }

    /// The path no longer exists on the source, so the deletion is derived
    /// from the event alone.
    fn do_unlink(&self, path: &str) -> Result<()> {
        if !self.in_scope(path) {
            return Ok(());
        }
        self.store.delete_subtree(path)
    }
}
