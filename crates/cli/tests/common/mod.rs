//! Shared fixtures for manager integration tests

#![allow(dead_code)]

use dbfs_cli::{Manager, ManagerParts};
use dbfs_core::{
    ChangeBatch, ChangeEvent, Error, FileSystemNode, MirrorStore, NodeUpdate, NotificationSource,
    Result, SourceFs,
};
use dbfs_journal::{MirrorDb, SledEventPool, SledMirror};
use dbfs_watcher::LocalFs;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Poll interval used by every test manager
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Scratch source directory
pub struct SourceTree {
    pub dir: TempDir,
}

impl SourceTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn mkdir(&self, rel: &str) -> &Self {
        std::fs::create_dir_all(self.dir.path().join(rel)).unwrap();
        self
    }

    pub fn write(&self, rel: &str, contents: &[u8]) -> &Self {
        std::fs::write(self.dir.path().join(rel), contents).unwrap();
        self
    }
}

/// Notification source replaying queued batches; `None` entries fail the poll
#[derive(Default)]
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Option<ChangeBatch>>>,
    pub polls: AtomicUsize,
}

impl ScriptedSource {
    pub fn push(&self, txid: u64, events: Vec<ChangeEvent>) {
        self.steps
            .lock()
            .push_back(Some(ChangeBatch::new(txid, events)));
    }

    pub fn push_failure(&self) {
        self.steps.lock().push_back(None);
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().len()
    }
}

impl NotificationSource for ScriptedSource {
    fn poll(&self) -> Result<Option<ChangeBatch>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.steps.lock().pop_front() {
            Some(Some(batch)) => Ok(Some(batch)),
            Some(None) => Err(Error::source("injected poll failure")),
            None => Ok(None),
        }
    }
}

/// Source filesystem counting `stat` calls
pub struct CountingFs {
    inner: LocalFs,
    pub stats: AtomicUsize,
}

impl CountingFs {
    pub fn stat_count(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }
}

impl SourceFs for CountingFs {
    fn stat(&self, path: &str) -> Result<FileSystemNode> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        self.inner.stat(path)
    }

    fn list_children(&self, path: &str) -> Result<Vec<FileSystemNode>> {
        self.inner.list_children(path)
    }
}

/// Mirror whose `ping` can be switched to fail
pub struct FlakyStore {
    inner: SledMirror,
    pub unreachable: AtomicBool,
}

impl MirrorStore for FlakyStore {
    fn wipe_all(&self) -> Result<()> {
        self.inner.wipe_all()
    }

    fn upsert_node(&self, path: &str, update: &NodeUpdate) -> Result<()> {
        self.inner.upsert_node(path, update)
    }

    fn upsert_batch(&self, updates: &[(String, NodeUpdate)]) -> Result<()> {
        self.inner.upsert_batch(updates)
    }

    fn delete_subtree(&self, path: &str) -> Result<()> {
        self.inner.delete_subtree(path)
    }

    fn rename_subtree(&self, old_path: &str, new_path: &str) -> Result<()> {
        self.inner.rename_subtree(old_path, new_path)
    }

    fn ping(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::store("connection refused"));
        }
        self.inner.ping()
    }
}

/// Manager over a real source directory and temporary sled store, fed by a scripted source
pub struct Harness {
    pub manager: Manager,
    pub source: Arc<ScriptedSource>,
    pub fs: Arc<CountingFs>,
    pub store: Arc<FlakyStore>,
    pub mirror: SledMirror,
    pub pool: Arc<SledEventPool>,
}

impl Harness {
    pub fn new(tree: &SourceTree, root: &str) -> Self {
        let db = MirrorDb::temporary().unwrap();
        let mirror = db.mirror().unwrap();
        let pool = Arc::new(db.event_pool().unwrap());
        let store = Arc::new(FlakyStore {
            inner: mirror.clone(),
            unreachable: AtomicBool::new(false),
        });
        let fs = Arc::new(CountingFs {
            inner: LocalFs::open(tree.path()).unwrap(),
            stats: AtomicUsize::new(0),
        });
        let source = Arc::new(ScriptedSource::default());

        let manager = Manager::from_parts(ManagerParts {
            fs: fs.clone(),
            source: source.clone(),
            store: store.clone(),
            pool: pool.clone(),
            root: root.to_string(),
        })
        .with_poll_interval(TEST_POLL_INTERVAL);

        Self {
            manager,
            source,
            fs,
            store,
            mirror,
            pool,
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.mirror.paths().unwrap()
    }
}

/// Poll `cond` until it holds or five seconds pass
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

pub fn create(path: &str) -> ChangeEvent {
    ChangeEvent::Create {
        path: path.to_string(),
        kind: dbfs_core::NodeKind::File,
        owner: "hdfs".to_string(),
        group: "supergroup".to_string(),
        permissions: 0o644,
        mtime: 1,
    }
}

pub fn unlink(path: &str) -> ChangeEvent {
    ChangeEvent::Unlink {
        path: path.to_string(),
        timestamp: 2,
    }
}

pub fn rename(src: &str, dst: &str) -> ChangeEvent {
    ChangeEvent::Rename {
        src: src.to_string(),
        dst: dst.to_string(),
        timestamp: 3,
    }
}
