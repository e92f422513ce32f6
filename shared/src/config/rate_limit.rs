//! Verification attempt rate limiting configuration module

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Longest accepted attempt window (7 days)
pub const MAX_WINDOW_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Sliding-window limit on verification attempts per identifier
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Length of the trailing window in seconds
    pub window_seconds: u64,

    /// Max verification attempts admitted inside one window
    pub max_attempts: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 600, // 10 minutes
            max_attempts: 3,
        }
    }
}

impl RateLimitConfig {
    /// Create a new rate limit configuration
    pub fn new(max_attempts: u32, window_seconds: u64) -> Self {
        Self {
            window_seconds,
            max_attempts,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            window_seconds: std::env::var("OTP_RATE_LIMIT_WINDOW_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.window_seconds),
            max_attempts: std::env::var("OTP_RATE_LIMIT_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_attempts),
        }
    }

    /// Window as a std duration
    pub fn window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.window_seconds)
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_seconds == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.window_seconds must be greater than zero".to_string(),
            ));
        }
        if self.window_seconds > MAX_WINDOW_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "rate_limit.window_seconds must be at most {}, got {}",
                MAX_WINDOW_SECONDS, self.window_seconds
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_default() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.window_seconds, 600);
        assert_eq!(config.window(), std::time::Duration::from_secs(600));
    }

    #[test]
    fn test_rate_limit_rejects_zero_window() {
        assert!(RateLimitConfig::new(3, 0).validate().is_err());
        assert!(RateLimitConfig::new(0, 60).validate().is_ok());
    }

    #[test]
    fn test_rate_limit_rejects_oversized_window() {
        assert!(RateLimitConfig::new(3, MAX_WINDOW_SECONDS).validate().is_ok());
        assert!(RateLimitConfig::new(3, MAX_WINDOW_SECONDS + 1).validate().is_err());
        assert!(RateLimitConfig::new(3, u64::MAX).validate().is_err());
    }
}
