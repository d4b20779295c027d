//! sled-backed mirror of the source filesystem

use dbfs_core::path::{rebase, subtree_prefix};
use dbfs_core::{Error, MirrorRecord, MirrorStore, NodeUpdate, Result};
use sled::{Batch, Db, Tree};
use tracing::debug;

/// Mirror store keeping one bincode-encoded [`MirrorRecord`] per path
#[derive(Clone)]
pub struct SledMirror {
    db: Db,
    tree: Tree,
}

impl SledMirror {
    pub(crate) fn new(db: Db, tree: Tree) -> Self {
        Self { db, tree }
    }

    /// Look up the record stored for `path`
    pub fn get(&self, path: &str) -> Result<Option<MirrorRecord>> {
        match self.tree.get(path.as_bytes()).map_err(Error::store)? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    /// All mirrored paths in key order
    pub fn paths(&self) -> Result<Vec<String>> {
        let mut paths = Vec::with_capacity(self.tree.len());
        for key in self.tree.iter().keys() {
            let key = key.map_err(Error::store)?;
            paths.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(paths)
    }

    /// Number of mirrored records
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// `path` itself followed by every record below it
    fn subtree(&self, path: &str) -> Result<Vec<(String, MirrorRecord)>> {
        let mut entries = Vec::new();
        if let Some(record) = self.get(path)? {
            entries.push((path.to_string(), record));
        }
        for item in self.tree.scan_prefix(subtree_prefix(path).as_bytes()) {
            let (key, value) = item.map_err(Error::store)?;
            let key = String::from_utf8_lossy(&key).into_owned();
            if key == path {
                continue;
            }
            entries.push((key, decode(&value)?));
        }
        Ok(entries)
    }

    fn merged(&self, path: &str, update: &NodeUpdate) -> Result<MirrorRecord> {
        let mut record = self
            .get(path)?
            .unwrap_or_else(|| MirrorRecord::new(path));
        record.apply(update);
        Ok(record)
    }
}

impl MirrorStore for SledMirror {
    fn wipe_all(&self) -> Result<()> {
        self.tree.clear().map_err(Error::store)?;
        Ok(())
    }

    fn upsert_node(&self, path: &str, update: &NodeUpdate) -> Result<()> {
        let record = self.merged(path, update)?;
        self.tree
            .insert(path.as_bytes(), encode(&record)?)
            .map_err(Error::store)?;
        Ok(())
    }

    fn upsert_batch(&self, updates: &[(String, NodeUpdate)]) -> Result<()> {
        let mut batch = Batch::default();
        for (path, update) in updates {
            let record = self.merged(path, update)?;
            batch.insert(path.as_bytes(), encode(&record)?);
        }
        self.tree.apply_batch(batch).map_err(Error::store)?;
        Ok(())
    }

    fn delete_subtree(&self, path: &str) -> Result<()> {
        let doomed = self.subtree(path)?;
        debug!("Deleting {} records under {}", doomed.len(), path);

        let mut batch = Batch::default();
        for (key, _) in &doomed {
            batch.remove(key.as_bytes());
        }
        self.tree.apply_batch(batch).map_err(Error::store)?;
        Ok(())
    }

    fn rename_subtree(&self, old_path: &str, new_path: &str) -> Result<()> {
        if old_path == new_path {
            return Ok(());
        }

        let moving = self.subtree(old_path)?;
        let replaced = self.subtree(new_path)?;
        debug!(
            "Renaming {} records from {} to {}",
            moving.len(),
            old_path,
            new_path
        );

        // Later writes to the same key win inside a sled batch
        let mut batch = Batch::default();
        for (key, _) in &replaced {
            batch.remove(key.as_bytes());
        }
        for (key, _) in &moving {
            batch.remove(key.as_bytes());
        }
        for (key, mut record) in moving {
            let Some(target) = rebase(&key, old_path, new_path) else {
                continue;
            };
            record.path = target.clone();
            batch.insert(target.as_bytes(), encode(&record)?);
        }
        self.tree.apply_batch(batch).map_err(Error::store)?;
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        self.db.size_on_disk().map_err(Error::store)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.db.flush().map_err(Error::store)?;
        Ok(())
    }
}

fn encode(record: &MirrorRecord) -> Result<Vec<u8>> {
    bincode::serialize(record).map_err(Error::codec)
}

fn decode(bytes: &[u8]) -> Result<MirrorRecord> {
    bincode::deserialize(bytes).map_err(Error::codec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MirrorDb;
    use dbfs_core::NodeKind;

    fn mirror_with(paths: &[&str]) -> SledMirror {
        let mirror = MirrorDb::temporary().unwrap().mirror().unwrap();
        for path in paths {
            mirror
                .upsert_node(
                    path,
                    &NodeUpdate {
                        kind: Some(NodeKind::File),
                        ..NodeUpdate::default()
                    },
                )
                .unwrap();
        }
        mirror
    }

    #[test]
    fn test_upsert_merges_into_existing_record() {
        let mirror = mirror_with(&[]);
        mirror
            .upsert_node(
                "/a.txt",
                &NodeUpdate {
                    owner: Some("alice".to_string()),
                    ..NodeUpdate::default()
                },
            )
            .unwrap();
        mirror
            .upsert_node(
                "/a.txt",
                &NodeUpdate {
                    size: Some(10),
                    ..NodeUpdate::default()
                },
            )
            .unwrap();

        let record = mirror.get("/a.txt").unwrap().unwrap();
        assert_eq!(record.path, "/a.txt");
        assert_eq!(record.owner.as_deref(), Some("alice"));
        assert_eq!(record.size, Some(10));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mirror = mirror_with(&[]);
        let update = NodeUpdate {
            size: Some(1),
            ..NodeUpdate::default()
        };
        mirror.upsert_node("/x", &update).unwrap();
        mirror.upsert_node("/x", &update).unwrap();
        assert_eq!(mirror.len(), 1);
    }

    #[test]
    fn test_upsert_batch_writes_all() {
        let mirror = mirror_with(&[]);
        let updates = vec![
            ("/d".to_string(), NodeUpdate::default()),
            ("/d/1".to_string(), NodeUpdate::default()),
            ("/d/2".to_string(), NodeUpdate::default()),
        ];
        mirror.upsert_batch(&updates).unwrap();
        assert_eq!(mirror.paths().unwrap(), vec!["/d", "/d/1", "/d/2"]);
    }

    #[test]
    fn test_delete_subtree_spares_siblings_with_shared_prefix() {
        let mirror = mirror_with(&["/a", "/a/x", "/a/y/z", "/ab", "/b"]);
        mirror.delete_subtree("/a").unwrap();
        assert_eq!(mirror.paths().unwrap(), vec!["/ab", "/b"]);

        // deleting something that is not mirrored is fine
        mirror.delete_subtree("/missing").unwrap();
        assert_eq!(mirror.len(), 2);
    }

    #[test]
    fn test_delete_root_clears_everything() {
        let mirror = mirror_with(&["/", "/a", "/a/b"]);
        mirror.delete_subtree("/").unwrap();
        assert!(mirror.is_empty());
    }

    #[test]
    fn test_rename_subtree() {
        let mirror = mirror_with(&["/A", "/A/x", "/A/y", "/Ab"]);
        mirror.rename_subtree("/A", "/B").unwrap();

        assert_eq!(mirror.paths().unwrap(), vec!["/Ab", "/B", "/B/x", "/B/y"]);
        assert_eq!(mirror.get("/B/x").unwrap().unwrap().path, "/B/x");
        assert!(mirror.get("/A/x").unwrap().is_none());
    }

    #[test]
    fn test_rename_replaces_destination_subtree() {
        let mirror = mirror_with(&["/src", "/src/keep", "/dst", "/dst/stale"]);
        mirror.rename_subtree("/src", "/dst").unwrap();
        assert_eq!(mirror.paths().unwrap(), vec!["/dst", "/dst/keep"]);
    }

    #[test]
    fn test_wipe_all_and_ping() {
        let mirror = mirror_with(&["/a", "/b"]);
        mirror.ping().unwrap();
        mirror.wipe_all().unwrap();
        assert!(mirror.is_empty());
    }
}
