//! Append-only log of raw change notifications

use dbfs_core::{ChangeEvent, Error, EventPool, Result, TxId};
use serde::{Deserialize, Serialize};
use sled::Tree;
use std::sync::atomic::{AtomicU64, Ordering};

/// One logged notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PooledEvent {
    pub txid: TxId,
    pub event: ChangeEvent,
}

/// Event pool stored in a sled tree.
///
/// Keys are big-endian sequence numbers so iteration follows append order.
pub struct SledEventPool {
    tree: Tree,
    /// Monotonic sequence counter
    seq_counter: AtomicU64,
}

impl SledEventPool {
    pub(crate) fn new(tree: Tree) -> Result<Self> {
        let next_seq = match tree.last().map_err(Error::store)? {
            Some((key, _)) => decode_seq(&key)? + 1,
            None => 1,
        };

        Ok(Self {
            tree,
            seq_counter: AtomicU64::new(next_seq),
        })
    }

    /// Number of logged events
    pub fn count(&self) -> usize {
        self.tree.len()
    }

    /// Every logged event in append order
    pub fn entries(&self) -> Result<Vec<(u64, PooledEvent)>> {
        let mut entries = Vec::with_capacity(self.tree.len());
        for item in self.tree.iter() {
            let (key, value) = item.map_err(Error::store)?;
            let pooled: PooledEvent = serde_json::from_slice(&value).map_err(Error::codec)?;
            entries.push((decode_seq(&key)?, pooled));
        }
        Ok(entries)
    }
}

impl EventPool for SledEventPool {
    fn append(&self, txid: TxId, event: &ChangeEvent) -> Result<u64> {
        let seq = self.seq_counter.fetch_add(1, Ordering::SeqCst);
        let value = serde_json::to_vec(&PooledEvent {
            txid,
            event: event.clone(),
        })
        .map_err(Error::codec)?;

        self.tree
            .insert(seq.to_be_bytes(), value)
            .map_err(Error::store)?;
        Ok(seq)
    }

    fn clear(&self) -> Result<()> {
        self.tree.clear().map_err(Error::store)?;
        Ok(())
    }
}

fn decode_seq(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(Error::codec)?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MirrorDb;
    use tempfile::TempDir;

    fn unlink(path: &str) -> ChangeEvent {
        ChangeEvent::Unlink {
            path: path.to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let pool = MirrorDb::temporary().unwrap().event_pool().unwrap();
        for (i, path) in ["/a", "/b", "/c"].iter().enumerate() {
            pool.append(10 + i as u64, &unlink(path)).unwrap();
        }

        let entries = pool.entries().unwrap();
        let seqs: Vec<u64> = entries.iter().map(|(seq, _)| *seq).collect();
        let txids: Vec<u64> = entries.iter().map(|(_, e)| e.txid).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(txids, vec![10, 11, 12]);
        assert_eq!(entries[2].1.event, unlink("/c"));
    }

    #[test]
    fn test_sequence_continues_after_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db");
        {
            let pool = MirrorDb::open(&path).unwrap().event_pool().unwrap();
            pool.append(1, &unlink("/a")).unwrap();
            pool.append(1, &unlink("/b")).unwrap();
        }

        let pool = MirrorDb::open(&path).unwrap().event_pool().unwrap();
        assert_eq!(pool.append(2, &unlink("/c")).unwrap(), 3);
        assert_eq!(pool.count(), 3);
    }

    #[test]
    fn test_clear() {
        let pool = MirrorDb::temporary().unwrap().event_pool().unwrap();
        pool.append(1, &unlink("/a")).unwrap();
        pool.clear().unwrap();
        assert_eq!(pool.count(), 0);
    }
}
