//! # otpgate core
//!
//! Core OTP lifecycle for phone-number login. This crate contains the
//! error taxonomy, the domain records, the clock and code generator, the
//! storage/limiter contracts and the service that composes them.
//! Concrete backends live in `og_infra`.

pub mod domain;
pub mod errors;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use services::*;
