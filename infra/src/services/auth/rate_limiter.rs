//! Redis-based sliding-window limiter for verification attempts
//!
//! Attempts for a phone are members of the sorted set `req:{phone}`, scored
//! by the attempt time in milliseconds. Prune, count and conditional add run
//! as one Lua script, so concurrent attempts cannot both take the last slot.

use async_trait::async_trait;
use chrono::Duration;
use redis::Script;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use og_core::errors::{ceil_seconds, OtpError, OtpResult};
use og_core::services::{AttemptLimiter, Clock};
use og_shared::config::RateLimitConfig;
use og_shared::utils::mask_phone_number;

use crate::cache::RedisClient;

/// Prune, count, and record the attempt if under the cap
///
/// KEYS[1] window key; ARGV now_ms, window_ms, max_attempts, member,
/// exclusive prune bound. An attempt exactly `window_ms` old still counts.
/// Returns {1, count} when admitted, {0, retry_after_ms} when rejected.
const ADMIT_SCRIPT: &str = r#"
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', ARGV[5])
local count = redis.call('ZCARD', KEYS[1])
if count >= tonumber(ARGV[3]) then
  local oldest = redis.call('ZRANGE', KEYS[1], 0, 0, 'WITHSCORES')
  local retry = window
  if oldest[2] then
    retry = tonumber(oldest[2]) + window - now
  end
  return {0, retry}
end
redis.call('ZADD', KEYS[1], now, ARGV[4])
redis.call('PEXPIRE', KEYS[1], window + 1)
return {1, count + 1}
"#;

/// Redis key for the attempt window of `phone`
pub fn attempts_key(phone: &str) -> String {
    format!("req:{}", phone)
}

/// `ZREMRANGEBYSCORE` bound dropping attempts strictly older than the window
pub(crate) fn prune_bound(now_ms: i64, window_ms: i64) -> String {
    format!("({}", now_ms.saturating_sub(window_ms))
}

/// Outcome of one admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitStatus {
    /// Attempt recorded
    Ok {
        /// Attempts in the window including this one
        count: u32,
        limit: u32,
        window_seconds: u64,
    },
    /// Cap reached; attempt not recorded
    Exceeded {
        retry_after_seconds: u64,
        limit: u32,
        window_seconds: u64,
    },
}

impl RateLimitStatus {
    /// Interpret the `{admitted, value}` pair returned by the admit script
    pub fn from_script_reply(reply: (i64, i64), config: &RateLimitConfig) -> Self {
        let (admitted, value) = reply;
        if admitted == 1 {
            RateLimitStatus::Ok {
                count: value.max(0) as u32,
                limit: config.max_attempts,
                window_seconds: config.window_seconds,
            }
        } else {
            RateLimitStatus::Exceeded {
                retry_after_seconds: ceil_seconds(Duration::milliseconds(value)),
                limit: config.max_attempts,
                window_seconds: config.window_seconds,
            }
        }
    }

    pub fn into_result(self) -> OtpResult<()> {
        match self {
            RateLimitStatus::Ok { .. } => Ok(()),
            RateLimitStatus::Exceeded {
                retry_after_seconds, ..
            } => Err(OtpError::RateLimited { retry_after_seconds }),
        }
    }
}

/// Redis-based implementation of the attempt limiter
pub struct RedisAttemptLimiter {
    redis_client: Arc<RedisClient>,
    config: RateLimitConfig,
    window_ms: i64,
    clock: Arc<dyn Clock>,
    admit_script: Script,
}

impl RedisAttemptLimiter {
    /// Create a new Redis-based attempt limiter
    pub fn new(redis_client: Arc<RedisClient>, config: RateLimitConfig, clock: Arc<dyn Clock>) -> OtpResult<Self> {
        config.validate().map_err(|e| OtpError::transient(e.to_string()))?;
        let window = Duration::from_std(config.window()).map_err(|e| OtpError::transient(e.to_string()))?;

        Ok(Self {
            redis_client,
            config,
            window_ms: window.num_milliseconds(),
            clock,
            admit_script: Script::new(ADMIT_SCRIPT),
        })
    }

    /// Run the admission check and report the full status
    pub async fn check(&self, identifier: &str) -> OtpResult<RateLimitStatus> {
        let now_ms = self.clock.now().timestamp_millis();
        let window_ms = self.window_ms;
        let key = self.redis_client.key(&attempts_key(identifier));
        // Unique per attempt so two attempts in the same millisecond both count
        let member = format!("{}-{}", now_ms, Uuid::new_v4());

        let reply: (i64, i64) = self
            .redis_client
            .run_script(
                &self.admit_script,
                &[key],
                &[
                    now_ms.to_string(),
                    window_ms.to_string(),
                    self.config.max_attempts.to_string(),
                    member,
                    prune_bound(now_ms, window_ms),
                ],
            )
            .await?;

        let status = RateLimitStatus::from_script_reply(reply, &self.config);
        debug!(phone = %mask_phone_number(identifier), status = ?status, "Checked attempt window");
        Ok(status)
    }
}

#[async_trait]
impl AttemptLimiter for RedisAttemptLimiter {
    async fn admit(&self, identifier: &str) -> OtpResult<()> {
        self.check(identifier).await?.into_result()
    }

    async fn shutdown(&self) {
        self.redis_client.close();
    }
}
