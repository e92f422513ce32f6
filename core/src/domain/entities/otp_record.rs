//! Issued one-time passcode record.

use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;

/// A code issued for one identifier
///
/// Records are never mutated after creation. Re-issuance replaces the whole
/// record, and only once the previous one has expired or been consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    /// Phone number (or equivalent) the code was issued for
    pub identifier: String,

    /// Zero-padded numeric code
    pub code: String,

    /// Timestamp when the code was issued
    pub issued_at: DateTime<Utc>,
}

impl OtpRecord {
    /// Creates a record issued at `issued_at`
    pub fn new(identifier: impl Into<String>, code: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            code: code.into(),
            issued_at,
        }
    }

    /// A record is expired once `now - issued_at >= ttl`
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.issued_at >= ttl
    }

    /// Time left before expiry, zero if already expired
    pub fn remaining_at(&self, now: DateTime<Utc>, ttl: Duration) -> Duration {
        match ttl.checked_sub(&(now - self.issued_at)) {
            Some(remaining) if remaining > Duration::zero() => remaining,
            Some(_) => Duration::zero(),
            None => ttl,
        }
    }

    /// Exact, constant-time comparison against a candidate code
    pub fn matches(&self, candidate: &str) -> bool {
        self.code.len() == candidate.len() && constant_time_eq(self.code.as_bytes(), candidate.as_bytes())
    }
}
