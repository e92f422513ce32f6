//! Periodic background sweep owned by an in-process backend.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Handle to a running sweep task
///
/// The task stops when `stop` is called or when the handle is dropped.
pub struct Sweeper {
    name: &'static str,
    stop_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Spawn a task running `sweep` every `interval`
    ///
    /// `sweep` returns the number of entries it removed. The first run
    /// happens one interval after the spawn.
    pub fn spawn<F>(name: &'static str, interval: Duration, sweep: F) -> Self
    where
        F: Fn() -> usize + Send + 'static,
    {
        // tokio intervals must be non-zero
        let interval = interval.max(Duration::from_millis(1));
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!(sweeper = name, interval_s = interval.as_secs(), "Sweeper started");

            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = sweep();
                        debug!(sweeper = name, removed, event = "sweep_completed", "Sweep completed");
                    }
                    changed = stop_rx.changed() => {
                        // Sender dropped or stop requested
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!(sweeper = name, "Sweeper stopped");
        });

        Self {
            name,
            stop_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stop the task and wait for it to exit; idempotent
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(true);

        let handle = match self.handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(sweeper = self.name, error = %e, "Sweeper task ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        match self.handle.lock() {
            Ok(slot) => slot.as_ref().map_or(true, |h| h.is_finished()),
            Err(_) => true,
        }
    }
}
