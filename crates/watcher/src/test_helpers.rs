//! In-memory collaborators for unit tests

use dbfs_core::path::ROOT;
use dbfs_core::{
    ChangeBatch, ChangeEvent, Error, EventPool, FileSystemNode, MirrorStore, NodeAttributes,
    NodeKind, NodeUpdate, NotificationSource, Result, SourceFs, TxId,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Source filesystem held in a map
pub struct MemoryFs {
    nodes: BTreeMap<String, FileSystemNode>,
    pub stat_calls: AtomicUsize,
}

impl MemoryFs {
    /// Filesystem holding only the root directory
    pub fn new() -> Self {
        let mut fs = Self {
            nodes: BTreeMap::new(),
            stat_calls: AtomicUsize::new(0),
        };
        fs.insert(ROOT, NodeKind::Directory, 0);
        fs
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.insert(path, NodeKind::Directory, 0);
        self
    }

    pub fn file(mut self, path: &str, size: u64) -> Self {
        self.insert(path, NodeKind::File, size);
        self
    }

    fn insert(&mut self, path: &str, kind: NodeKind, size: u64) {
        self.nodes.insert(
            path.to_string(),
            FileSystemNode {
                path: path.to_string(),
                kind,
                attrs: NodeAttributes {
                    owner: "hdfs".to_string(),
                    group: "supergroup".to_string(),
                    permissions: 0o755,
                    size,
                    ..NodeAttributes::default()
                },
            },
        );
    }
}

fn parent_of(path: &str) -> Option<String> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT.to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

impl SourceFs for MemoryFs {
    fn stat(&self, path: &str) -> Result<FileSystemNode> {
        self.stat_calls.fetch_add(1, Ordering::SeqCst);
        self.nodes.get(path).cloned().ok_or_else(|| {
            Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
        })
    }

    fn list_children(&self, path: &str) -> Result<Vec<FileSystemNode>> {
        Ok(self
            .nodes
            .values()
            .filter(|node| parent_of(&node.path).as_deref() == Some(path))
            .cloned()
            .collect())
    }
}

/// One call made against a [`RecordingStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Wipe,
    Upsert(String, NodeUpdate),
    Batch(Vec<String>),
    Delete(String),
    Rename(String, String),
}

/// Store remembering every write, optionally failing on a given path
#[derive(Default)]
pub struct RecordingStore {
    pub ops: Mutex<Vec<StoreOp>>,
    pub fail_on: Mutex<Option<String>>,
    pub unreachable: Mutex<bool>,
    /// Blocking pause before each checked write
    pub delay: Mutex<Duration>,
}

impl RecordingStore {
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().clone()
    }

    fn check(&self, path: &str) -> Result<()> {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.fail_on.lock().as_deref() == Some(path) {
            return Err(Error::store(format!("write to {} rejected", path)));
        }
        Ok(())
    }
}

impl MirrorStore for RecordingStore {
    fn wipe_all(&self) -> Result<()> {
        self.ops.lock().push(StoreOp::Wipe);
        Ok(())
    }

    fn upsert_node(&self, path: &str, update: &NodeUpdate) -> Result<()> {
        self.check(path)?;
        self.ops
            .lock()
            .push(StoreOp::Upsert(path.to_string(), update.clone()));
        Ok(())
    }

    fn upsert_batch(&self, updates: &[(String, NodeUpdate)]) -> Result<()> {
        for (path, _) in updates {
            self.check(path)?;
        }
        self.ops.lock().push(StoreOp::Batch(
            updates.iter().map(|(path, _)| path.clone()).collect(),
        ));
        Ok(())
    }

    fn delete_subtree(&self, path: &str) -> Result<()> {
        self.check(path)?;
        self.ops.lock().push(StoreOp::Delete(path.to_string()));
        Ok(())
    }

    fn rename_subtree(&self, old_path: &str, new_path: &str) -> Result<()> {
        self.check(old_path)?;
        self.ops
            .lock()
            .push(StoreOp::Rename(old_path.to_string(), new_path.to_string()));
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        if *self.unreachable.lock() {
            return Err(Error::store("store unreachable"));
        }
        Ok(())
    }
}

/// Event pool kept in memory
#[derive(Default)]
pub struct RecordingPool {
    pub events: Mutex<Vec<(TxId, ChangeEvent)>>,
}

impl EventPool for RecordingPool {
    fn append(&self, txid: TxId, event: &ChangeEvent) -> Result<u64> {
        let mut events = self.events.lock();
        events.push((txid, event.clone()));
        Ok(events.len() as u64)
    }

    fn clear(&self) -> Result<()> {
        self.events.lock().clear();
        Ok(())
    }
}

/// Scripted poll result
pub enum Step {
    Batch(ChangeBatch),
    Fail(String),
}

/// Notification source replaying queued steps, idle once drained
#[derive(Default)]
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    pub polls: Mutex<Vec<tokio::time::Instant>>,
}

impl ScriptedSource {
    pub fn push(&self, step: Step) {
        self.steps.lock().push_back(step);
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().len()
    }

    pub fn poll_count(&self) -> usize {
        self.polls.lock().len()
    }
}

impl NotificationSource for ScriptedSource {
    fn poll(&self) -> Result<Option<ChangeBatch>> {
        self.polls.lock().push(tokio::time::Instant::now());
        match self.steps.lock().pop_front() {
            Some(Step::Batch(batch)) => Ok(Some(batch)),
            Some(Step::Fail(msg)) => Err(Error::source(msg)),
            None => Ok(None),
        }
    }
}

pub fn create(path: &str) -> ChangeEvent {
    ChangeEvent::Create {
        path: path.to_string(),
        kind: NodeKind::File,
        owner: "hdfs".to_string(),
        group: "supergroup".to_string(),
        permissions: 0o644,
        mtime: 0,
    }
}

pub fn unlink(path: &str) -> ChangeEvent {
    ChangeEvent::Unlink {
        path: path.to_string(),
        timestamp: 0,
    }
}
