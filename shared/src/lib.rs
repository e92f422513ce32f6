//! Shared configuration and utilities for otpgate
//!
//! This crate provides functionality used across the workspace:
//! - Configuration types for the OTP engine, the attempt limiter and the
//!   storage backends
//! - Environment and logging settings
//! - Log-safe identifier masking

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, CacheConfig, CacheStrategyConfig, CacheType, ConfigError, Environment,
    LogFormat, LoggingConfig, MemoryCacheConfig, OtpConfig, RateLimitConfig,
};
pub use utils::phone;
