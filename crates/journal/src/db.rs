//! Mirror database handle

use crate::{SledEventPool, SledMirror};
use dbfs_core::{Error, Result};
use sled::Db;
use std::path::{Path, PathBuf};

/// Tree holding one record per mirrored path
pub const FILE_SYSTEM_TREE: &str = "filesystem";
/// Tree holding the raw notification log
pub const EVENT_POOL_TREE: &str = "eventpool";

/// Connection to the sled database backing the mirror
///
/// The store connection string is the database directory.
#[derive(Clone)]
pub struct MirrorDb {
    db: Db,
    location: Option<PathBuf>,
}

impl MirrorDb {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        tracing::info!("Opening mirror database at {}", path.display());
        let db = sled::open(path).map_err(Error::store)?;
        Ok(Self {
            db,
            location: Some(path.to_path_buf()),
        })
    }

    /// In-memory database removed on drop
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(Error::store)?;
        Ok(Self { db, location: None })
    }

    /// Mirrored filesystem records
    pub fn mirror(&self) -> Result<SledMirror> {
        let tree = self.db.open_tree(FILE_SYSTEM_TREE).map_err(Error::store)?;
        Ok(SledMirror::new(self.db.clone(), tree))
    }

    /// Raw event log
    pub fn event_pool(&self) -> Result<SledEventPool> {
        let tree = self.db.open_tree(EVENT_POOL_TREE).map_err(Error::store)?;
        SledEventPool::new(tree)
    }

    /// Database directory, `None` for temporary databases
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush().map_err(Error::store)?;
        Ok(())
    }
}
