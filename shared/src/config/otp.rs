//! One-time passcode configuration module

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Largest supported code width; `10^18` still fits in a `u64`
pub const MAX_CODE_DIGITS: u32 = 18;

/// Longest accepted code validity (1 day)
pub const MAX_CODE_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Code issuance configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OtpConfig {
    /// Number of decimal digits in a generated code
    pub code_digits: u32,

    /// How long an issued code stays valid, in seconds
    pub code_ttl_seconds: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_digits: 6,
            code_ttl_seconds: 120, // 2 minutes
        }
    }
}

impl OtpConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            code_digits: std::env::var("OTP_CODE_DIGITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.code_digits),
            code_ttl_seconds: std::env::var("OTP_CODE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.code_ttl_seconds),
        }
    }

    /// Set the code width
    pub fn with_digits(mut self, digits: u32) -> Self {
        self.code_digits = digits;
        self
    }

    /// Set the code validity in seconds
    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.code_ttl_seconds = seconds;
        self
    }

    /// Validity as a std duration
    pub fn code_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.code_ttl_seconds)
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.code_digits == 0 || self.code_digits > MAX_CODE_DIGITS {
            return Err(ConfigError::Invalid(format!(
                "otp.code_digits must be between 1 and {}, got {}",
                MAX_CODE_DIGITS, self.code_digits
            )));
        }
        if self.code_ttl_seconds == 0 {
            return Err(ConfigError::Invalid(
                "otp.code_ttl_seconds must be greater than zero".to_string(),
            ));
        }
        if self.code_ttl_seconds > MAX_CODE_TTL_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "otp.code_ttl_seconds must be at most {}, got {}",
                MAX_CODE_TTL_SECONDS, self.code_ttl_seconds
            )));
        }
        Ok(())
    }
}
