//! Change notifications produced by a notification source

use crate::tree::{NodeKind, NodeUpdate};
use serde::{Deserialize, Serialize};

/// Transaction identifier assigned by the notification source
pub type TxId = u64;

/// A single filesystem mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// Data appended to an open file, size is not final yet
    Append { path: String },
    /// File closed after writing
    Close {
        path: String,
        size: u64,
        /// Unix milliseconds
        timestamp: i64,
    },
    /// New node
    Create {
        path: String,
        kind: NodeKind,
        owner: String,
        group: String,
        permissions: u32,
        /// Modification time at creation, Unix milliseconds
        mtime: i64,
    },
    /// Ownership, permissions, ACLs or access time changed
    MetadataUpdate {
        path: String,
        owner: Option<String>,
        group: Option<String>,
        permissions: Option<u32>,
        acls: Option<Vec<String>>,
        atime: Option<i64>,
    },
    Rename {
        src: String,
        dst: String,
        timestamp: i64,
    },
    /// Node removed, together with its subtree
    Unlink { path: String, timestamp: i64 },
}

impl ChangeEvent {
    /// Path the event applies to (the source path for renames)
    pub fn path(&self) -> &str {
        match self {
            ChangeEvent::Append { path }
            | ChangeEvent::Close { path, .. }
            | ChangeEvent::Create { path, .. }
            | ChangeEvent::MetadataUpdate { path, .. }
            | ChangeEvent::Unlink { path, .. } => path,
            ChangeEvent::Rename { src, .. } => src,
        }
    }

    /// Short uppercase name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ChangeEvent::Append { .. } => "APPEND",
            ChangeEvent::Close { .. } => "CLOSE",
            ChangeEvent::Create { .. } => "CREATE",
            ChangeEvent::MetadataUpdate { .. } => "METADATA",
            ChangeEvent::Rename { .. } => "RENAME",
            ChangeEvent::Unlink { .. } => "UNLINK",
        }
    }

    /// Attribute update carried by the event, if it upserts a node
    pub fn node_update(&self) -> Option<NodeUpdate> {
        match self {
            ChangeEvent::Create {
                kind,
                owner,
                group,
                permissions,
                mtime,
                ..
            } => Some(NodeUpdate {
                kind: Some(*kind),
                owner: Some(owner.clone()),
                group: Some(group.clone()),
                permissions: Some(*permissions),
                modification_time: Some(*mtime),
                ..NodeUpdate::default()
            }),
            ChangeEvent::Close {
                size, timestamp, ..
            } => Some(NodeUpdate {
                size: Some(*size),
                modification_time: Some(*timestamp),
                ..NodeUpdate::default()
            }),
            ChangeEvent::MetadataUpdate {
                owner,
                group,
                permissions,
                acls,
                atime,
                ..
            } => Some(NodeUpdate {
                owner: owner.clone(),
                group: group.clone(),
                permissions: *permissions,
                acls: acls.clone(),
                access_time: *atime,
                ..NodeUpdate::default()
            }),
            ChangeEvent::Append { .. } | ChangeEvent::Rename { .. } | ChangeEvent::Unlink { .. } => {
                None
            }
        }
    }
}

/// Events sharing one transaction id, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    pub txid: TxId,
    pub events: Vec<ChangeEvent>,
}

impl ChangeBatch {
    pub fn new(txid: TxId, events: Vec<ChangeEvent>) -> Self {
        Self { txid, events }
    }
}
