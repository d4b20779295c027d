//! Background event capture loop
//!
//! Drains the notification source batch by batch, applies each event
//! through the [`Dispatcher`] and sleeps with jitter while idle. Draining
//! blocks on the store and source, so it runs on tokio's blocking pool.
//! Any error stops the loop for good; callers observe it through
//! [`CaptureHandle::is_stopped`].

use crate::dispatch::Dispatcher;
use dbfs_core::{Error, NotificationSource, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

/// Idle polling base; each wait adds a random `[0, base)` on top
pub const POLLING_INTERVAL: Duration = Duration::from_millis(250);

/// Source and dispatcher, shared with each blocking drain
struct CaptureWork {
    source: Arc<dyn NotificationSource>,
    dispatcher: Dispatcher,
}

/// Event capture loop, run on its own task
pub struct EventCapture {
    work: Arc<CaptureWork>,
    stopped: Arc<AtomicBool>,
    interval: Duration,
    rng: StdRng,
}

impl EventCapture {
    pub fn new(source: Arc<dyn NotificationSource>, dispatcher: Dispatcher) -> Self {
        Self {
            work: Arc::new(CaptureWork { source, dispatcher }),
            stopped: Arc::new(AtomicBool::new(false)),
            interval: POLLING_INTERVAL,
            rng: StdRng::from_entropy(),
        }
    }

    /// Override the idle polling base
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Spawn the loop on the current runtime
    pub fn spawn(self) -> CaptureHandle {
        self.spawn_on(&Handle::current())
    }

    /// Spawn the loop on `runtime`
    pub fn spawn_on(self, runtime: &Handle) -> CaptureHandle {
        let stopped = self.stopped.clone();
        let join = runtime.spawn(self.run());
        CaptureHandle { stopped, join }
    }

    /// Run until terminated or until the first error
    pub async fn run(mut self) {
        info!("Event capture started");
        while !self.stopped.load(Ordering::Acquire) {
            let work = self.work.clone();
            let drained = tokio::task::spawn_blocking(move || work.drain())
                .await
                .map_err(|e| Error::Join(e.to_string()))
                .and_then(|applied| applied);
            if let Err(err) = drained {
                error!("Event capture interrupted: {}", err);
                self.stopped.store(true, Ordering::Release);
                break;
            }

            let interval = self.next_interval();
            trace!("Waiting to poll, interval={:?}", interval);
            tokio::time::sleep(interval).await;
        }
        info!("Event capture stopped");
    }

    fn next_interval(&mut self) -> Duration {
        let base = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX);
        if base == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(base.saturating_add(self.rng.gen_range(0..base)))
    }
}

impl CaptureWork {
    /// Apply every batch currently available, returning how many were applied
    fn drain(&self) -> Result<usize> {
        let mut applied = 0;
        while let Some(batch) = self.source.poll()? {
            debug!(
                "Processing batch transaction {} ({} events)",
                batch.txid,
                batch.events.len()
            );
            self.dispatcher.process_batch(&batch)?;
            applied += 1;
        }
        Ok(applied)
    }
}

/// Handle to a spawned capture loop
pub struct CaptureHandle {
    stopped: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl CaptureHandle {
    /// Ask the loop to exit at its next iteration
    pub fn terminate(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Whether the loop was terminated, failed, or is otherwise gone
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire) || self.join.is_finished()
    }

    /// Wait for the loop to exit
    pub async fn join(self) -> Result<()> {
        self.join.await.map_err(|e| Error::Join(e.to_string()))
    }
}
