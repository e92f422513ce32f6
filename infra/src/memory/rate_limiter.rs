//! In-process sliding-window attempt limiter.

use async_trait::async_trait;
use chrono::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use og_core::domain::AttemptWindow;
use og_core::errors::{ceil_seconds, OtpError, OtpResult};
use og_core::services::{AttemptLimiter, Clock};
use og_shared::config::RateLimitConfig;
use og_shared::utils::mask_phone_number;

use super::shards::ShardedMap;
use super::sweeper::Sweeper;

/// Attempt limiter held in process memory
pub struct InMemoryAttemptLimiter {
    windows: Arc<ShardedMap<AttemptWindow>>,
    window: Duration,
    max_attempts: u32,
    clock: Arc<dyn Clock>,
    sweeper: Mutex<Option<Sweeper>>,
    closed: AtomicBool,
}

impl InMemoryAttemptLimiter {
    pub fn new(config: &RateLimitConfig, shard_count: usize, clock: Arc<dyn Clock>) -> OtpResult<Self> {
        config.validate().map_err(|e| OtpError::transient(e.to_string()))?;
        let window = Duration::from_std(config.window()).map_err(|e| OtpError::transient(e.to_string()))?;

        Ok(Self {
            windows: Arc::new(ShardedMap::new(shard_count)),
            window,
            max_attempts: config.max_attempts,
            clock,
            sweeper: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Start dropping idle windows every `interval`
    pub fn start_sweeper(&self, interval: std::time::Duration) {
        let windows = Arc::clone(&self.windows);
        let clock = Arc::clone(&self.clock);
        let window = self.window;
        let sweeper = Sweeper::spawn("attempt_windows", interval, move || {
            let now = clock.now();
            windows.remove_stale(|attempts| attempts.is_idle_at(now, window))
        });

        let mut slot = self.sweeper.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(sweeper);
    }

    /// Drop windows with no attempts left inside them; returns how many
    pub fn sweep_idle(&self) -> usize {
        let now = self.clock.now();
        let window = self.window;
        self.windows.remove_stale(|attempts| attempts.is_idle_at(now, window))
    }

    /// Identifiers currently tracked
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

#[async_trait]
impl AttemptLimiter for InMemoryAttemptLimiter {
    async fn admit(&self, identifier: &str) -> OtpResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(OtpError::transient("in-memory attempt limiter is shut down"));
        }

        let now = self.clock.now();
        let window = self.window;
        let max_attempts = self.max_attempts;

        let outcome = self.windows.with_shard(identifier, |windows| {
            windows
                .entry(identifier.to_string())
                .or_default()
                .try_admit(now, window, max_attempts)
        })?;

        match outcome {
            Ok(count) => {
                debug!(phone = %mask_phone_number(identifier), count, "Admitted verification attempt");
                Ok(())
            }
            Err(retry_after) => Err(OtpError::RateLimited {
                retry_after_seconds: ceil_seconds(retry_after),
            }),
        }
    }

    async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }
        debug!("In-memory attempt limiter shut down");
    }
}
