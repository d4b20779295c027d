//! Local directory exposed as the source filesystem

use dbfs_core::path::{join, normalize, ROOT};
use dbfs_core::{Error, FileSystemNode, NodeAttributes, NodeKind, Result, SourceFs};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Source filesystem backed by a local directory.
///
/// The directory is the root (`/`) of the mirror namespace. Symlinks are
/// never followed.
pub struct LocalFs {
    root: PathBuf,
    names: NameCache,
}

impl LocalFs {
    /// Open the directory at `root` as a source filesystem
    pub fn open(root: &Path) -> Result<Self> {
        let root = root.canonicalize()?;
        if !root.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("source address {} is not a directory", root.display()),
            )));
        }

        Ok(Self {
            root,
            names: NameCache::default(),
        })
    }

    /// Local directory backing the source
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local location of a mirror path
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let path = normalize(path)?;
        Ok(self.root.join(path.trim_start_matches('/')))
    }

    /// Whether a local location, existing or not, lies inside the source directory
    pub fn contains(&self, local: &Path) -> bool {
        canonicalize_partial(local).map_or(false, |path| path.starts_with(&self.root))
    }

    /// Mirror path of a local location, `None` when it lies outside the
    /// source or a component is not valid UTF-8
    pub fn mirror_path(&self, local: &Path) -> Option<String> {
        let relative = local.strip_prefix(&self.root).ok()?;
        let mut path = ROOT.to_string();
        for component in relative.components() {
            match component {
                Component::Normal(name) => path = join(&path, name.to_str()?),
                Component::CurDir => continue,
                _ => return None,
            }
        }
        Some(path)
    }

    /// Status of a local location, without following symlinks
    pub fn stat_local(&self, local: &Path) -> Result<FileSystemNode> {
        let path = self.mirror_path(local).ok_or_else(|| Error::Path {
            path: local.display().to_string(),
            reason: "outside of the source directory",
        })?;
        let metadata = std::fs::symlink_metadata(local)?;
        Ok(self.node(path, &metadata))
    }

    fn node(&self, path: String, metadata: &Metadata) -> FileSystemNode {
        let file_type = metadata.file_type();
        let kind = if file_type.is_dir() {
            NodeKind::Directory
        } else if file_type.is_symlink() {
            NodeKind::Symlink
        } else {
            NodeKind::File
        };

        FileSystemNode {
            path,
            kind,
            attrs: self.attributes(kind, metadata),
        }
    }

    #[cfg(unix)]
    fn attributes(&self, kind: NodeKind, metadata: &Metadata) -> NodeAttributes {
        use std::os::unix::fs::MetadataExt;

        NodeAttributes {
            owner: self.names.user(metadata.uid()),
            group: self.names.group(metadata.gid()),
            permissions: metadata.mode() & 0o7777,
            size: if kind.is_dir() { 0 } else { metadata.size() },
            modification_time: metadata.mtime() * 1000 + metadata.mtime_nsec() / 1_000_000,
            access_time: metadata.atime() * 1000 + metadata.atime_nsec() / 1_000_000,
        }
    }

    #[cfg(not(unix))]
    fn attributes(&self, kind: NodeKind, metadata: &Metadata) -> NodeAttributes {
        let millis = |time: std::io::Result<std::time::SystemTime>| {
            time.ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0)
        };

        NodeAttributes {
            owner: String::new(),
            group: String::new(),
            permissions: if metadata.permissions().readonly() { 0o444 } else { 0o644 },
            size: if kind.is_dir() { 0 } else { metadata.len() },
            modification_time: millis(metadata.modified()),
            access_time: millis(metadata.accessed()),
        }
    }
}

impl SourceFs for LocalFs {
    fn stat(&self, path: &str) -> Result<FileSystemNode> {
        let local = self.resolve(path)?;
        let metadata = std::fs::symlink_metadata(&local)?;
        Ok(self.node(normalize(path)?, &metadata))
    }

    fn list_children(&self, path: &str) -> Result<Vec<FileSystemNode>> {
        let parent = normalize(path)?;
        let local = self.resolve(&parent)?;

        let mut children = Vec::new();
        for entry in std::fs::read_dir(&local)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                warn!("Skipping non UTF-8 entry {:?} under {}", file_name, parent);
                continue;
            };
            // Entries can disappear between listing and stat
            let metadata = match entry.path().symlink_metadata() {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            children.push(self.node(join(&parent, name), &metadata));
        }

        children.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(children)
    }
}

/// Absolute `path` with symlinks resolved for the part that exists.
///
/// Missing trailing components are appended unchanged, so a store
/// directory that is not created yet still resolves.
pub fn canonicalize_partial(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev());
                return Ok(resolved);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Resolved user and group names, keyed by numeric id
#[derive(Default)]
struct NameCache {
    users: Mutex<HashMap<u32, String>>,
    groups: Mutex<HashMap<u32, String>>,
}

#[cfg(unix)]
impl NameCache {
    fn user(&self, uid: u32) -> String {
        use nix::unistd::{Uid, User};

        self.users
            .lock()
            .entry(uid)
            .or_insert_with(|| match User::from_uid(Uid::from_raw(uid)) {
                Ok(Some(user)) => user.name,
                _ => uid.to_string(),
            })
            .clone()
    }

    fn group(&self, gid: u32) -> String {
        use nix::unistd::{Gid, Group};

        self.groups
            .lock()
            .entry(gid)
            .or_insert_with(|| match Group::from_gid(Gid::from_raw(gid)) {
                Ok(Some(group)) => group.name,
                _ => gid.to_string(),
            })
            .clone()
    }
}
