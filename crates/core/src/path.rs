//! Mirror path handling
//!
//! Mirror paths are absolute, `/`-separated strings inside the source
//! namespace. `/` is the root of the source filesystem.

use crate::{Error, Result};

/// Root of the mirror namespace
pub const ROOT: &str = "/";

/// Normalize a mirror path
///
/// - Requires a leading `/`
/// - Collapses repeated separators and `.` components
/// - Strips the trailing `/`
/// - Rejects `..`
pub fn normalize(path: &str) -> Result<String> {
    if !path.starts_with('/') {
        return Err(Error::Path {
            path: path.to_string(),
            reason: "must be absolute",
        });
    }

    let mut out = String::with_capacity(path.len());
    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                return Err(Error::Path {
                    path: path.to_string(),
                    reason: "parent components are not allowed",
                })
            }
            name => {
                out.push('/');
                out.push_str(name);
            }
        }
    }

    if out.is_empty() {
        out.push('/');
    }
    Ok(out)
}

/// Key prefix shared by every strict descendant of `path`
pub fn subtree_prefix(path: &str) -> String {
    if path == ROOT {
        ROOT.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Whether `path` is `root` or lies below it
pub fn is_within(root: &str, path: &str) -> bool {
    path == root || path.starts_with(&subtree_prefix(root))
}

/// Re-key `path` from prefix `from` to prefix `to`
///
/// Returns `None` when `path` is not inside `from`.
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if path == from {
        return Some(to.to_string());
    }
    let rest = path.strip_prefix(&subtree_prefix(from))?;
    Some(join(to, rest))
}

/// Append a child name to a directory path
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Final component of a path, empty for the root
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}
