//! Contracts implemented by the storage backends

use async_trait::async_trait;

use crate::errors::OtpResult;

/// Owner of issued codes
///
/// Implementations keep at most one live code per identifier and consume a
/// code the moment it matches.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Issue a new code unless a live one exists (`StillValid`)
    async fn issue(&self, identifier: &str) -> OtpResult<String>;

    /// Consume the live code if `code` matches it exactly, else `InvalidCode`
    async fn verify(&self, identifier: &str, code: &str) -> OtpResult<()>;

    /// Release background tasks and connections; safe to call repeatedly
    async fn shutdown(&self) {}
}

/// Sliding-window limiter on verification attempts
#[async_trait]
pub trait AttemptLimiter: Send + Sync {
    /// Record an attempt, or reject with `RateLimited` once the cap is reached
    async fn admit(&self, identifier: &str) -> OtpResult<()>;

    /// Release background tasks and connections; safe to call repeatedly
    async fn shutdown(&self) {}
}
