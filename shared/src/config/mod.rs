//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `otp` - Code width and validity
//! - `rate_limit` - Sliding-window limit on verification attempts
//! - `cache` - Backend selection, Redis and in-process settings
//! - `environment` - Environment detection and logging configuration

pub mod cache;
pub mod environment;
pub mod otp;
pub mod rate_limit;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export commonly used types
pub use cache::{CacheConfig, CacheStrategyConfig, CacheType, MemoryCacheConfig};
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use otp::{OtpConfig, MAX_CODE_TTL_SECONDS};
pub use rate_limit::{RateLimitConfig, MAX_WINDOW_SECONDS};

/// Prefix for environment overrides read by [`AppConfig::load`], e.g. `OTP__OTP__CODE_DIGITS`
pub const ENV_PREFIX: &str = "OTP";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Code issuance configuration
    pub otp: OtpConfig,

    /// Verification attempt limits
    pub rate_limit: RateLimitConfig,

    /// Backend configuration
    pub cache: CacheStrategyConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            otp: OtpConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            cache: CacheStrategyConfig::from_env(),
            logging: LoggingConfig::for_environment(environment),
        }
    }

    /// Load layered configuration
    ///
    /// Sources, lowest precedence first: built-in defaults, the optional
    /// `config.<environment>.toml` file, then `OTP__<section>__<field>`
    /// environment variables. A `.env` file is read first if present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let environment = Environment::from_env();

        let builder = ::config::Config::builder()
            .add_source(::config::File::with_name(environment.config_file()).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        let mut config = Self::build(builder)?;
        config.environment = environment;
        Ok(config)
    }

    /// Parse configuration from TOML text on top of the defaults
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let builder = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml));
        Self::build(builder)
    }

    fn build(
        builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the sections are usable together
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.otp.validate()?;
        self.rate_limit.validate()?;

        if self.cache.cache_type == CacheType::Memory {
            let sweep = self.cache.memory.sweep_interval;
            if sweep == 0 || sweep > self.otp.code_ttl_seconds {
                return Err(ConfigError::Invalid(format!(
                    "cache.memory.sweep_interval must be between 1 and otp.code_ttl_seconds ({}), got {}",
                    self.otp.code_ttl_seconds, sweep
                )));
            }
            if self.cache.memory.shard_count == 0 {
                return Err(ConfigError::Invalid(
                    "cache.memory.shard_count must be greater than zero".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.otp.code_digits, 6);
        assert_eq!(config.rate_limit.max_attempts, 3);
    }

    #[test]
    fn test_from_toml_overrides_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [otp]
            code_ttl_seconds = 300

            [rate_limit]
            max_attempts = 5

            [cache]
            cache_type = "memory"

            [cache.memory]
            sweep_interval = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.otp.code_ttl_seconds, 300);
        assert_eq!(config.otp.code_digits, 6);
        assert_eq!(config.rate_limit.max_attempts, 5);
        assert_eq!(config.rate_limit.window_seconds, 600);
        assert_eq!(config.cache.cache_type, CacheType::Memory);
        assert_eq!(config.cache.memory.sweep_interval, 30);
        assert_eq!(config.cache.memory.shard_count, 16);
    }

    #[test]
    fn test_sweep_interval_must_not_exceed_ttl() {
        let mut config = AppConfig::default();
        config.cache = CacheStrategyConfig::memory();
        config.cache.memory.sweep_interval = 300;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.cache.memory.sweep_interval = 120;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_values_are_rejected() {
        let result = AppConfig::from_toml_str("[otp]\ncode_digits = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_out_of_range_durations_are_rejected() {
        let huge_ttl = AppConfig::from_toml_str("[otp]\ncode_ttl_seconds = 9223372036854775807\n");
        assert!(matches!(huge_ttl, Err(ConfigError::Invalid(_))));

        let huge_window = AppConfig::from_toml_str("[rate_limit]\nwindow_seconds = 9223372036854775807\n");
        assert!(matches!(huge_window, Err(ConfigError::Invalid(_))));
    }
}
