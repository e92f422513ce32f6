//! In-process backend
//!
//! Codes and attempt windows live in sharded maps inside the process. Each
//! identifier maps to one shard, so unrelated identifiers never contend.
//! Optional sweep tasks reclaim expired entries in the background.

mod shards;
pub mod otp_store;
pub mod rate_limiter;
pub mod sweeper;

#[cfg(test)]
mod tests;

pub use otp_store::InMemoryOtpStore;
pub use rate_limiter::InMemoryAttemptLimiter;
pub use sweeper::Sweeper;
