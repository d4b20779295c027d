//! Visitor turning a walked snapshot into mirror writes

use crate::walk::{TreeVisitor, VisitedChild};
use dbfs_core::{FileSystemNode, MirrorStore, NodeUpdate, Result};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Counts accumulated by a walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub directories: u64,
    pub files: u64,
    pub bytes: u64,
}

impl WalkSummary {
    fn merge(&mut self, other: WalkSummary) {
        self.directories += other.directories;
        self.files += other.files;
        self.bytes += other.bytes;
    }
}

impl fmt::Display for WalkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} directories, {} files, {} bytes",
            self.directories, self.files, self.bytes
        )
    }
}

/// Writes one directory level to the mirror with a single bulk upsert.
///
/// The directory record and its leaf children are buffered and flushed in
/// `visit_after`; child directories have already flushed their own level.
pub struct MirrorVisitor {
    store: Arc<dyn MirrorStore>,
    pending: Vec<(String, NodeUpdate)>,
    summary: WalkSummary,
}

impl MirrorVisitor {
    pub fn new(store: Arc<dyn MirrorStore>) -> Self {
        Self {
            store,
            pending: Vec::new(),
            summary: WalkSummary::default(),
        }
    }

    fn push(&mut self, node: &FileSystemNode) {
        self.pending.push((node.path.clone(), node.to_update()));
    }
}

impl TreeVisitor for MirrorVisitor {
    type Output = WalkSummary;

    fn visit_before(&mut self, dir: &FileSystemNode) -> Result<()> {
        self.push(dir);
        self.summary.directories += 1;
        Ok(())
    }

    fn visit_child(&mut self, child: VisitedChild<WalkSummary>) -> Result<()> {
        match child {
            VisitedChild::Leaf(node) => {
                self.push(&node);
                self.summary.files += 1;
                self.summary.bytes += node.attrs.size;
            }
            VisitedChild::Directory(summary) => self.summary.merge(summary),
        }
        Ok(())
    }

    fn visit_after(self) -> Result<WalkSummary> {
        if !self.pending.is_empty() {
            debug!("Writing {} records", self.pending.len());
            self.store.upsert_batch(&self.pending)?;
        }
        Ok(self.summary)
    }
}
