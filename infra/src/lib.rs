//! # Infrastructure Layer
//!
//! Concrete backends for the otpgate core:
//! - **Cache**: Redis client plus the scripted OTP store
//! - **Services**: Redis sliding-window attempt limiter
//! - **Memory**: sharded in-process store and limiter with a background sweep
//! - **Telemetry**: tracing subscriber setup
//!
//! `build_service` wires whichever backend `AppConfig` selects into an
//! `OtpService`.

use std::sync::Arc;

use og_core::errors::OtpError;
use og_core::services::{AttemptLimiter, Clock, OtpService, OtpStore, SystemClock};
use og_shared::config::{AppConfig, CacheType, ConfigError};

/// Cache module - Redis client and OTP storage
pub mod cache;

/// In-process backend
pub mod memory;

/// Services module - Infrastructure service implementations
pub mod services;

/// Tracing subscriber setup
pub mod telemetry;

use cache::{RedisClient, RedisOtpStore};
use memory::{InMemoryAttemptLimiter, InMemoryOtpStore};
use services::auth::RedisAttemptLimiter;

/// OTP service over whichever backend the configuration selects
pub type DynOtpService = OtpService<dyn OtpStore, dyn AttemptLimiter>;

/// Build the OTP service described by `config` on the wall clock
pub async fn build_service(config: &AppConfig) -> Result<DynOtpService, InfrastructureError> {
    build_service_with_clock(config, Arc::new(SystemClock)).await
}

/// Build the OTP service described by `config` on the given clock
///
/// Must be called inside a tokio runtime; the in-process backend starts its
/// sweep tasks here.
pub async fn build_service_with_clock(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<DynOtpService, InfrastructureError> {
    config.validate()?;

    tracing::info!(
        backend = ?config.cache.cache_type,
        environment = %config.environment,
        code_digits = config.otp.code_digits,
        code_ttl_seconds = config.otp.code_ttl_seconds,
        "Initializing OTP service"
    );

    let (store, limiter): (Arc<dyn OtpStore>, Arc<dyn AttemptLimiter>) = match config.cache.cache_type {
        CacheType::Redis => {
            let client = Arc::new(RedisClient::new(config.cache.redis.clone()).await?);
            let store = RedisOtpStore::new(client.clone(), &config.otp, clock.clone())?;
            let limiter = RedisAttemptLimiter::new(client, config.rate_limit.clone(), clock)?;
            (Arc::new(store), Arc::new(limiter))
        }
        CacheType::Memory => {
            let memory = &config.cache.memory;
            let sweep_interval = std::time::Duration::from_secs(memory.sweep_interval);

            let store = InMemoryOtpStore::new(&config.otp, memory.shard_count, clock.clone())?;
            store.start_sweeper(sweep_interval);
            let limiter = InMemoryAttemptLimiter::new(&config.rate_limit, memory.shard_count, clock)?;
            limiter.start_sweeper(sweep_interval);
            (Arc::new(store), Arc::new(limiter))
        }
    };

    tracing::info!("OTP service initialized");

    Ok(OtpService::new(store, limiter))
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// A backend call did not answer in time
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend has been shut down
    #[error("Backend is shut down")]
    ShutDown,
}

impl From<ConfigError> for InfrastructureError {
    fn from(err: ConfigError) -> Self {
        InfrastructureError::Config(err.to_string())
    }
}

impl From<OtpError> for InfrastructureError {
    fn from(err: OtpError) -> Self {
        InfrastructureError::Config(err.to_string())
    }
}

impl From<InfrastructureError> for OtpError {
    fn from(err: InfrastructureError) -> Self {
        OtpError::transient(err.to_string())
    }
}
