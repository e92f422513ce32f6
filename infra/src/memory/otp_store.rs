//! In-process OTP store
//!
//! Records live in a sharded map. Expiry is checked on every read; the
//! optional sweeper only reclaims memory held by records nobody asked about.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use og_core::domain::OtpRecord;
use og_core::errors::{ceil_seconds, OtpError, OtpResult};
use og_core::services::{Clock, CodeGenerator, OtpStore};
use og_shared::config::OtpConfig;
use og_shared::utils::mask_phone_number;

use super::shards::ShardedMap;
use super::sweeper::Sweeper;

/// OTP store held in process memory
pub struct InMemoryOtpStore {
    records: Arc<ShardedMap<OtpRecord>>,
    generator: CodeGenerator,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    sweeper: Mutex<Option<Sweeper>>,
    closed: AtomicBool,
}

impl InMemoryOtpStore {
    /// Create an empty store; no background work starts until `start_sweeper`
    pub fn new(config: &OtpConfig, shard_count: usize, clock: Arc<dyn Clock>) -> OtpResult<Self> {
        config.validate().map_err(|e| OtpError::transient(e.to_string()))?;
        let ttl = Duration::from_std(config.code_ttl()).map_err(|e| OtpError::transient(e.to_string()))?;

        Ok(Self {
            records: Arc::new(ShardedMap::new(shard_count)),
            generator: CodeGenerator::new(config.code_digits)?,
            ttl,
            clock,
            sweeper: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Start removing expired records every `interval`
    ///
    /// Must be called from inside a tokio runtime. Replaces any running
    /// sweeper; the old task stops when its handle drops.
    pub fn start_sweeper(&self, interval: std::time::Duration) {
        let records = Arc::clone(&self.records);
        let clock = Arc::clone(&self.clock);
        let ttl = self.ttl;
        let sweeper = Sweeper::spawn("otp_records", interval, move || {
            sweep_records(&records, clock.now(), ttl)
        });

        let mut slot = self.sweeper.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(sweeper);
    }

    /// Remove every expired record now; returns how many were removed
    pub fn sweep_expired(&self) -> usize {
        sweep_records(&self.records, self.clock.now(), self.ttl)
    }

    /// Records currently held, live or not yet swept
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_open(&self) -> OtpResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(OtpError::transient("in-memory OTP store is shut down"));
        }
        Ok(())
    }
}

fn sweep_records(records: &ShardedMap<OtpRecord>, now: DateTime<Utc>, ttl: Duration) -> usize {
    records.remove_stale(|record| record.is_expired_at(now, ttl))
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn issue(&self, identifier: &str) -> OtpResult<String> {
        self.ensure_open()?;

        let code = self.generator.generate()?;
        let now = self.clock.now();
        let ttl = self.ttl;

        self.records.with_shard(identifier, |records| {
            if let Some(existing) = records.get(identifier) {
                if !existing.is_expired_at(now, ttl) {
                    return Err(OtpError::StillValid {
                        retry_after_seconds: ceil_seconds(existing.remaining_at(now, ttl)),
                    });
                }
            }
            records.insert(identifier.to_string(), OtpRecord::new(identifier, code.clone(), now));
            Ok(())
        })??;

        debug!(phone = %mask_phone_number(identifier), "Stored code in memory");
        Ok(code)
    }

    async fn verify(&self, identifier: &str, code: &str) -> OtpResult<()> {
        self.ensure_open()?;

        let now = self.clock.now();
        let ttl = self.ttl;

        self.records.with_shard(identifier, |records| {
            let state = records
                .get(identifier)
                .map(|record| (record.is_expired_at(now, ttl), record.matches(code)));

            match state {
                Some((true, _)) => {
                    records.remove(identifier);
                    Err(OtpError::InvalidCode)
                }
                Some((false, true)) => {
                    records.remove(identifier);
                    Ok(())
                }
                _ => Err(OtpError::InvalidCode),
            }
        })?
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
        debug!("In-memory OTP store shut down");
    }
}
