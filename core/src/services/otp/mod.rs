//! OTP service module for phone-number login
//!
//! This module provides the issuance and verification workflow:
//! - Storage contract enforcing one live code per identifier
//! - Attempt limiter contract enforcing a sliding-window cap
//! - Service composing both, limiter first on every verification

mod service;
mod traits;

#[cfg(test)]
mod tests;

pub use service::OtpService;
pub use traits::{AttemptLimiter, OtpStore};
