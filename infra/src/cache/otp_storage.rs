//! OTP Redis storage
//!
//! Each code lives in a hash at `otp:{phone}:login` holding the code and the
//! issuance time in milliseconds. Issue and verify each run as one Lua script
//! so check-then-set and match-then-delete are atomic on the server.
//!
//! Native key expiry only reclaims memory. Whether a record is live is
//! decided on every read from the stored issuance time and the caller's
//! clock, so a code stops matching the instant its validity elapses.

use async_trait::async_trait;
use chrono::Duration;
use redis::Script;
use std::sync::Arc;
use tracing::debug;

use og_core::errors::{ceil_seconds, OtpError, OtpResult};
use og_core::services::{Clock, CodeGenerator, OtpStore};
use og_shared::config::OtpConfig;
use og_shared::utils::mask_phone_number;

use crate::cache::RedisClient;

/// Store the code unless a live one exists
///
/// KEYS[1] record key; ARGV code, now_ms, ttl_ms.
/// Returns {1, 0} when stored, {0, remaining_ms} when a live code exists.
const ISSUE_SCRIPT: &str = r#"
local issued = redis.call('HGET', KEYS[1], 'issued_at')
if issued then
  local remaining = tonumber(issued) + tonumber(ARGV[3]) - tonumber(ARGV[2])
  if remaining > 0 then
    return {0, remaining}
  end
end
redis.call('DEL', KEYS[1])
redis.call('HSET', KEYS[1], 'code', ARGV[1], 'issued_at', ARGV[2])
redis.call('PEXPIRE', KEYS[1], ARGV[3])
return {1, 0}
"#;

/// Delete the record if it is live and matches
///
/// KEYS[1] record key; ARGV candidate, now_ms, ttl_ms.
/// Returns 1 on match, 0 otherwise. Expired records are deleted on sight.
const VERIFY_SCRIPT: &str = r#"
local fields = redis.call('HMGET', KEYS[1], 'code', 'issued_at')
local code, issued = fields[1], fields[2]
if not code or not issued then
  return 0
end
if tonumber(ARGV[2]) - tonumber(issued) >= tonumber(ARGV[3]) then
  redis.call('DEL', KEYS[1])
  return 0
end
if code ~= ARGV[1] then
  return 0
end
redis.call('DEL', KEYS[1])
return 1
"#;

/// Redis key for the code issued to `phone`
pub fn otp_key(phone: &str) -> String {
    format!("otp:{}:login", phone)
}

/// OTP store backed by Redis
pub struct RedisOtpStore {
    /// Redis client for cache operations
    redis_client: Arc<RedisClient>,
    /// Source of new codes
    generator: CodeGenerator,
    /// Code validity
    ttl: Duration,
    /// Time source for issuance and expiry
    clock: Arc<dyn Clock>,
    issue_script: Script,
    verify_script: Script,
}

impl RedisOtpStore {
    /// Create a new OTP Redis store
    pub fn new(redis_client: Arc<RedisClient>, config: &OtpConfig, clock: Arc<dyn Clock>) -> OtpResult<Self> {
        config.validate().map_err(|e| OtpError::transient(e.to_string()))?;
        let ttl = Duration::from_std(config.code_ttl()).map_err(|e| OtpError::transient(e.to_string()))?;

        Ok(Self {
            redis_client,
            generator: CodeGenerator::new(config.code_digits)?,
            ttl,
            clock,
            issue_script: Script::new(ISSUE_SCRIPT),
            verify_script: Script::new(VERIFY_SCRIPT),
        })
    }

    fn ttl_ms(&self) -> String {
        self.ttl.num_milliseconds().to_string()
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn issue(&self, identifier: &str) -> OtpResult<String> {
        let code = self.generator.generate()?;
        let now_ms = self.clock.now().timestamp_millis();
        let key = self.redis_client.key(&otp_key(identifier));

        let (stored, remaining_ms): (i64, i64) = self
            .redis_client
            .run_script(
                &self.issue_script,
                &[key],
                &[code.clone(), now_ms.to_string(), self.ttl_ms()],
            )
            .await?;

        if stored == 1 {
            debug!(phone = %mask_phone_number(identifier), "Stored code in Redis");
            Ok(code)
        } else {
            Err(OtpError::StillValid {
                retry_after_seconds: ceil_seconds(Duration::milliseconds(remaining_ms)),
            })
        }
    }

    async fn verify(&self, identifier: &str, code: &str) -> OtpResult<()> {
        let now_ms = self.clock.now().timestamp_millis();
        let key = self.redis_client.key(&otp_key(identifier));

        let matched: i64 = self
            .redis_client
            .run_script(
                &self.verify_script,
                &[key],
                &[code.to_string(), now_ms.to_string(), self.ttl_ms()],
            )
            .await?;

        if matched == 1 {
            debug!(phone = %mask_phone_number(identifier), "Consumed code in Redis");
            Ok(())
        } else {
            Err(OtpError::InvalidCode)
        }
    }

    async fn shutdown(&self) {
        self.redis_client.close();
    }
}
