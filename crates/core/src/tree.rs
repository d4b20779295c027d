//! Filesystem nodes and their mirrored records

use serde::{Deserialize, Serialize};

/// Type of filesystem node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Directory, the only kind the tree walker descends into
    Directory,
    /// Regular file
    File,
    /// Symbolic link, mirrored as a leaf like a file
    Symlink,
}

impl NodeKind {
    pub fn is_dir(self) -> bool {
        matches!(self, NodeKind::Directory)
    }
}

/// Attributes reported by the source filesystem for a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub owner: String,
    pub group: String,
    /// Permission bits (e.g. `0o755`)
    pub permissions: u32,
    /// Size in bytes, zero for directories
    pub size: u64,
    /// Last modification, Unix milliseconds
    pub modification_time: i64,
    /// Last access, Unix milliseconds
    pub access_time: i64,
}

/// A node observed on the source filesystem during a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemNode {
    /// Absolute mirror path
    pub path: String,
    pub kind: NodeKind,
    pub attrs: NodeAttributes,
}

impl FileSystemNode {
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Full attribute update describing this node
    pub fn to_update(&self) -> NodeUpdate {
        NodeUpdate {
            kind: Some(self.kind),
            owner: Some(self.attrs.owner.clone()),
            group: Some(self.attrs.group.clone()),
            permissions: Some(self.attrs.permissions),
            acls: None,
            size: Some(self.attrs.size),
            modification_time: Some(self.attrs.modification_time),
            access_time: Some(self.attrs.access_time),
        }
    }
}

/// Partial set of attributes written to the mirror.
///
/// Only the fields that are `Some` overwrite the stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub kind: Option<NodeKind>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub permissions: Option<u32>,
    pub acls: Option<Vec<String>>,
    pub size: Option<u64>,
    pub modification_time: Option<i64>,
    pub access_time: Option<i64>,
}

impl NodeUpdate {
    pub fn is_empty(&self) -> bool {
        *self == NodeUpdate::default()
    }
}

/// Record persisted in the mirror, keyed by `path`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRecord {
    pub path: String,
    pub kind: Option<NodeKind>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub permissions: Option<u32>,
    pub acls: Vec<String>,
    /// Unknown until the file has been closed or walked
    pub size: Option<u64>,
    pub modification_time: Option<i64>,
    pub access_time: Option<i64>,
}

impl MirrorRecord {
    /// Create an empty record for a path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Merge an update into this record
    pub fn apply(&mut self, update: &NodeUpdate) {
        if let Some(kind) = update.kind {
            self.kind = Some(kind);
        }
        if let Some(owner) = &update.owner {
            self.owner = Some(owner.clone());
        }
        if let Some(group) = &update.group {
            self.group = Some(group.clone());
        }
        if let Some(permissions) = update.permissions {
            self.permissions = Some(permissions);
        }
        if let Some(acls) = &update.acls {
            self.acls = acls.clone();
        }
        if let Some(size) = update.size {
            self.size = Some(size);
        }
        if let Some(mtime) = update.modification_time {
            self.modification_time = Some(mtime);
        }
        if let Some(atime) = update.access_time {
            self.access_time = Some(atime);
        }
    }
}
