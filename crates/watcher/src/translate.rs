//! Translation of raw `notify` events into change notifications

use crate::fs::LocalFs;
use dbfs_core::{ChangeEvent, NodeKind};
use notify::event::{AccessKind, AccessMode, EventKind, ModifyKind, RenameMode};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::trace;

/// How long the `From` half of a rename waits for its `To` across idle polls
pub const RENAME_GRACE: Duration = Duration::from_millis(100);

/// `From` half of a rename waiting for its `To`
struct PendingFrom {
    tracker: Option<usize>,
    path: String,
    deadline: Instant,
}

/// Stateful translator pairing the two halves of a rename
pub struct EventTranslator {
    fs: Arc<LocalFs>,
    pending_from: Option<PendingFrom>,
    /// Last rename emitted from a `From`/`To` pair, to drop the trailing `Both`
    last_rename: Option<(String, String)>,
    grace: Duration,
}

impl EventTranslator {
    pub fn new(fs: Arc<LocalFs>) -> Self {
        Self {
            fs,
            pending_from: None,
            last_rename: None,
            grace: RENAME_GRACE,
        }
    }

    /// Override how long an unpaired `From` is held back
    pub fn with_rename_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Translate one raw event, in arrival order
    pub fn translate(&mut self, event: notify::Event) -> Vec<ChangeEvent> {
        let tracker = event.tracker();
        let mut out = Vec::new();

        match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                out.extend(self.flush_pending());
                if let Some(path) = self.first_path(&event.paths) {
                    self.pending_from = Some(PendingFrom {
                        tracker,
                        path,
                        deadline: Instant::now() + self.grace,
                    });
                }
                return out;
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                let Some(dst) = self.first_path(&event.paths) else {
                    return out;
                };
                match self.pending_from.take() {
                    Some(from) if from.tracker == tracker => {
                        self.last_rename = Some((from.path.clone(), dst.clone()));
                        out.push(rename(from.path, dst));
                    }
                    other => {
                        self.pending_from = other;
                        out.extend(self.flush_pending());
                        out.extend(self.create(&event.paths[0]));
                    }
                }
                return out;
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                out.extend(self.flush_pending());
                if event.paths.len() < 2 {
                    return out;
                }
                let (Some(src), Some(dst)) = (
                    self.fs.mirror_path(&event.paths[0]),
                    self.fs.mirror_path(&event.paths[1]),
                ) else {
                    return out;
                };
                let pair = (src, dst);
                if self.last_rename.as_ref() == Some(&pair) {
                    self.last_rename = None;
                    return out;
                }
                out.push(rename(pair.0, pair.1));
                return out;
            }
            _ => {}
        }

        out.extend(self.flush_pending());
        self.last_rename = None;

        for local in &event.paths {
            let translated = match event.kind {
                EventKind::Create(_) => self.create(local),
                EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => self
                    .fs
                    .mirror_path(local)
                    .map(|path| ChangeEvent::Append { path }),
                EventKind::Modify(ModifyKind::Metadata(_)) => self.metadata(local),
                // Platforms that cannot tell the two halves apart
                EventKind::Modify(ModifyKind::Name(_)) => {
                    if local.symlink_metadata().is_ok() {
                        self.create(local)
                    } else {
                        self.unlink(local)
                    }
                }
                EventKind::Access(AccessKind::Close(AccessMode::Write)) => self.close(local),
                EventKind::Remove(_) => self.unlink(local),
                _ => None,
            };
            match translated {
                Some(event) => out.push(event),
                None => trace!("Ignoring {:?} for {}", event.kind, local.display()),
            }
        }
        out
    }

    /// Turn an unpaired `From` into an unlink: the node left the source
    pub fn flush_pending(&mut self) -> Option<ChangeEvent> {
        let from = self.pending_from.take()?;
        Some(ChangeEvent::Unlink {
            path: from.path,
            timestamp: now_ms(),
        })
    }

    /// Like [`flush_pending`](Self::flush_pending), but only once the grace period is over
    pub fn flush_expired(&mut self) -> Option<ChangeEvent> {
        match &self.pending_from {
            Some(from) if Instant::now() >= from.deadline => self.flush_pending(),
            _ => None,
        }
    }

    fn first_path(&self, paths: &[std::path::PathBuf]) -> Option<String> {
        paths.first().and_then(|p| self.fs.mirror_path(p))
    }

    fn create(&self, local: &Path) -> Option<ChangeEvent> {
        // Gone already: the matching unlink follows
        let node = self.fs.stat_local(local).ok()?;
        Some(ChangeEvent::Create {
            path: node.path,
            kind: node.kind,
            owner: node.attrs.owner,
            group: node.attrs.group,
            permissions: node.attrs.permissions,
            mtime: node.attrs.modification_time,
        })
    }

    fn close(&self, local: &Path) -> Option<ChangeEvent> {
        let node = self.fs.stat_local(local).ok()?;
        if node.kind == NodeKind::Directory {
            return None;
        }
        Some(ChangeEvent::Close {
            path: node.path,
            size: node.attrs.size,
            timestamp: node.attrs.modification_time,
        })
    }

    fn metadata(&self, local: &Path) -> Option<ChangeEvent> {
        let node = self.fs.stat_local(local).ok()?;
        Some(ChangeEvent::MetadataUpdate {
            path: node.path,
            owner: Some(node.attrs.owner),
            group: Some(node.attrs.group),
            permissions: Some(node.attrs.permissions),
            acls: None,
            atime: Some(node.attrs.access_time),
        })
    }

    fn unlink(&self, local: &Path) -> Option<ChangeEvent> {
        let path = self.fs.mirror_path(local)?;
        Some(ChangeEvent::Unlink {
            path,
            timestamp: now_ms(),
        })
    }
}

fn rename(src: String, dst: String) -> ChangeEvent {
    ChangeEvent::Rename {
        src,
        dst,
        timestamp: now_ms(),
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
