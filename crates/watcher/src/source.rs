//! Notification source over a local directory

use crate::fs::LocalFs;
use crate::translate::EventTranslator;
use crossbeam_channel::{Receiver, TryRecvError};
use dbfs_core::{ChangeBatch, ChangeEvent, Error, NotificationSource, Result, TxId};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info};

/// Change notifications for a whole local source directory.
///
/// Raw events are buffered from the moment the source is opened, so
/// changes made while the initial walk runs are delivered afterwards.
pub struct LocalSource {
    _watcher: Mutex<RecommendedWatcher>,
    rx: Receiver<notify::Result<notify::Event>>,
    state: Mutex<SourceState>,
}

struct SourceState {
    translator: EventTranslator,
    next_txid: TxId,
}

impl SourceState {
    fn next_batch(&mut self, events: Vec<ChangeEvent>) -> ChangeBatch {
        let txid = self.next_txid;
        self.next_txid += 1;
        ChangeBatch::new(txid, events)
    }
}

impl LocalSource {
    /// Start watching the directory behind `fs` recursively
    pub fn open(fs: Arc<LocalFs>) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if tx.send(res).is_err() {
                error!("Notification channel closed, dropping event");
            }
        })
        .map_err(Error::source)?;

        watcher
            .watch(fs.root(), RecursiveMode::Recursive)
            .map_err(Error::source)?;
        info!("Watching {} for changes", fs.root().display());

        Ok(Self {
            _watcher: Mutex::new(watcher),
            rx,
            state: Mutex::new(SourceState {
                translator: EventTranslator::new(fs),
                next_txid: 1,
            }),
        })
    }
}

impl NotificationSource for LocalSource {
    fn poll(&self) -> Result<Option<ChangeBatch>> {
        let mut state = self.state.lock();
        loop {
            match self.rx.try_recv() {
                Ok(Ok(event)) => {
                    let events = state.translator.translate(event);
                    if !events.is_empty() {
                        return Ok(Some(state.next_batch(events)));
                    }
                }
                Ok(Err(err)) => return Err(Error::source(err)),
                Err(TryRecvError::Empty) => {
                    let pending = state.translator.flush_expired();
                    return Ok(pending.map(|event| state.next_batch(vec![event])));
                }
                Err(TryRecvError::Disconnected) => {
                    return Err(Error::source("notification channel disconnected"))
                }
            }
        }
    }
}
