//! Manager lifecycle
//!
//! The [`Manager`] owns every collaborator and sequences startup:
//! open the notification source, wipe the mirror, walk the root
//! synchronously, then hand over to the background capture loop.

use crate::config::Config;
use dbfs_core::path::normalize;
use dbfs_core::{Error, EventPool, MirrorStore, NotificationSource, Result, SourceFs};
use dbfs_journal::MirrorDb;
use dbfs_watcher::{
    CaptureHandle, Dispatcher, EventCapture, LocalFs, LocalSource, MirrorVisitor, TreeWalker,
    WalkSummary, POLLING_INTERVAL,
};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Lifecycle phase of a [`Manager`]; phases only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Constructed,
    Indexing,
    Capturing,
    Stopped,
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ManagerState::Constructed => "constructed",
            ManagerState::Indexing => "indexing",
            ManagerState::Capturing => "capturing",
            ManagerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Collaborators handed to [`Manager::from_parts`]
pub struct ManagerParts {
    pub fs: Arc<dyn SourceFs>,
    pub source: Arc<dyn NotificationSource>,
    pub store: Arc<dyn MirrorStore>,
    pub pool: Arc<dyn EventPool>,
    /// Path inside the source to mirror
    pub root: String,
}

/// Keeps the mirror of one source subtree up to date
pub struct Manager {
    fs: Arc<dyn SourceFs>,
    source: Option<Arc<dyn NotificationSource>>,
    store: Option<Arc<dyn MirrorStore>>,
    pool: Option<Arc<dyn EventPool>>,
    root: String,
    poll_interval: Duration,
    capture: Option<CaptureHandle>,
    state: ManagerState,
}

impl Manager {
    /// Connect to a local source directory and a sled store.
    ///
    /// The notification source is opened before anything else so changes
    /// made while indexing are buffered rather than lost.
    pub fn construct(source_address: &Path, root: &str, store: &Path) -> Result<Self> {
        let root = normalize(root)?;

        let fs = Arc::new(LocalFs::open(source_address)?);
        // a store inside the source would mirror its own writes forever
        if fs.contains(store) {
            return Err(Error::Path {
                path: store.display().to_string(),
                reason: "store must not live inside the source directory",
            });
        }
        let source = Arc::new(LocalSource::open(fs.clone())?);

        let db = MirrorDb::open(store)?;
        let mirror = Arc::new(db.mirror()?);
        let pool = Arc::new(db.event_pool()?);

        info!(
            "Manager connected: source={}, root={}, store={}",
            fs.root().display(),
            root,
            store.display()
        );

        Ok(Self::from_parts(ManagerParts {
            fs,
            source,
            store: mirror,
            pool,
            root,
        }))
    }

    /// Construct from a loaded configuration
    pub fn open(config: &Config) -> Result<Self> {
        let manager = Self::construct(
            &config.source.address,
            &config.source.root,
            &config.store.path,
        )?;
        Ok(manager.with_poll_interval(config.capture.poll_interval()))
    }

    pub fn from_parts(parts: ManagerParts) -> Self {
        Self {
            fs: parts.fs,
            source: Some(parts.source),
            store: Some(parts.store),
            pool: Some(parts.pool),
            root: parts.root,
            poll_interval: POLLING_INTERVAL,
            capture: None,
            state: ManagerState::Constructed,
        }
    }

    /// Override the capture loop's idle polling base
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Wipe the mirror and walk the root once, without live capture
    pub fn index(&mut self) -> Result<WalkSummary> {
        self.expect_state(ManagerState::Constructed, "index")?;
        self.reindex()
    }

    /// Wipe, walk the root synchronously, then start the capture loop.
    ///
    /// Blocks for the whole walk. Must be called from within a tokio runtime,
    /// which hosts the capture task. A failure leaves the manager unusable.
    pub fn start(&mut self) -> Result<WalkSummary> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::lifecycle("start must be called within a tokio runtime"))?;
        self.expect_state(ManagerState::Constructed, "start")?;

        self.state = ManagerState::Indexing;
        let summary = self.reindex()?;

        let (Some(source), Some(store), Some(pool)) =
            (self.source.clone(), self.store.clone(), self.pool.clone())
        else {
            return Err(Error::lifecycle("collaborators already released"));
        };
        let dispatcher = Dispatcher::new(store, pool, self.root.clone());
        let capture = EventCapture::new(source, dispatcher)
            .with_interval(self.poll_interval)
            .spawn_on(&runtime);

        self.capture = Some(capture);
        self.state = ManagerState::Capturing;
        info!("Live capture started for {}", self.root);
        Ok(summary)
    }

    /// Capture loop alive and store reachable
    pub fn status(&self) -> bool {
        let capturing = self
            .capture
            .as_ref()
            .map_or(false, |capture| !capture.is_stopped());
        let reachable = self
            .store
            .as_ref()
            .map_or(false, |store| store.ping().is_ok());
        capturing && reachable
    }

    /// Stop the capture loop and release the store and source.
    ///
    /// The manager cannot be restarted afterwards.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == ManagerState::Stopped {
            return Err(Error::lifecycle("manager already stopped"));
        }

        let capture = self.capture.take();
        let store = self.store.take();
        self.pool = None;
        self.source = None;
        self.state = ManagerState::Stopped;

        if let Some(capture) = capture {
            capture.terminate();
            capture.join().await?;
        }
        if let Some(store) = store {
            store.flush()?;
        }
        info!("Manager stopped");
        Ok(())
    }

    fn expect_state(&self, expected: ManagerState, operation: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::lifecycle(format!(
                "cannot {} a manager that is {}",
                operation, self.state
            )));
        }
        Ok(())
    }

    fn reindex(&self) -> Result<WalkSummary> {
        let (Some(store), Some(pool)) = (self.store.clone(), self.pool.clone()) else {
            return Err(Error::lifecycle("store already released"));
        };

        info!("Wiping mirror before full reindex");
        store.wipe_all()?;
        pool.clear()?;

        let root = self.fs.stat(&self.root)?;
        if !root.is_dir() {
            warn!("{} is not a directory, nothing to index", self.root);
            return Ok(WalkSummary::default());
        }

        let started = Instant::now();
        let summary = TreeWalker::new(self.fs.as_ref(), || MirrorVisitor::new(store.clone()))
            .walk(&root)?
            .unwrap_or_default();
        info!(
            "Indexed {} in {:.2?}: {}",
            self.root,
            started.elapsed(),
            summary
        );
        Ok(summary)
    }
}
