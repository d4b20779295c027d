//! Recursive full-subtree traversal
//!
//! The walker drives one [`TreeVisitor`] per directory level. A child
//! directory is walked to completion with its own fresh visitor and the
//! result is folded into the parent, so every directory is finalized only
//! after all of its descendants.

use dbfs_core::{FileSystemNode, Result, SourceFs};
use tracing::trace;

/// What a visitor receives for each child of the directory it is scoped to
#[derive(Debug)]
pub enum VisitedChild<T> {
    /// A file or symlink
    Leaf(FileSystemNode),
    /// Folded outcome of a fully walked child directory
    Directory(T),
}

/// Per-directory visitor driven by [`TreeWalker`]
pub trait TreeVisitor {
    type Output;

    /// Entering `dir`, before any child
    fn visit_before(&mut self, dir: &FileSystemNode) -> Result<()>;

    /// One child of the directory
    fn visit_child(&mut self, child: VisitedChild<Self::Output>) -> Result<()>;

    /// All children visited
    fn visit_after(self) -> Result<Self::Output>;
}

/// Walks a snapshot of the source filesystem, creating visitors with `factory`
pub struct TreeWalker<'a, F> {
    fs: &'a dyn SourceFs,
    factory: F,
}

impl<'a, V, F> TreeWalker<'a, F>
where
    F: FnMut() -> V,
    V: TreeVisitor,
{
    pub fn new(fs: &'a dyn SourceFs, factory: F) -> Self {
        Self { fs, factory }
    }

    /// Stat `path` and walk it.
    pub fn walk_path(&mut self, path: &str) -> Result<Option<V::Output>> {
        let node = self.fs.stat(path)?;
        self.walk(&node)
    }

    /// Walk the subtree under `node`.
    ///
    /// Returns `None` without creating a visitor when `node` is not a directory.
    pub fn walk(&mut self, node: &FileSystemNode) -> Result<Option<V::Output>> {
        if !node.is_dir() {
            return Ok(None);
        }

        let mut visitor = (self.factory)();
        visitor.visit_before(node)?;

        for child in self.fs.list_children(&node.path)? {
            if child.is_dir() {
                if let Some(folded) = self.walk(&child)? {
                    visitor.visit_child(VisitedChild::Directory(folded))?;
                }
            } else {
                visitor.visit_child(VisitedChild::Leaf(child))?;
            }
        }

        trace!("Finished walking {}", node.path);
        visitor.visit_after().map(Some)
    }
}
