//! Error taxonomy returned across the OTP service boundary.
//!
//! Exactly four kinds are surfaced. `InvalidCode` deliberately covers a wrong
//! code, a consumed code, an expired code and an identifier that never had a
//! code, so callers cannot tell which one happened.

use thiserror::Error;

/// OTP lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    /// A live code already exists for this identifier
    #[error("A valid code already exists; try again in {retry_after_seconds} seconds")]
    StillValid { retry_after_seconds: u64 },

    /// Too many verification attempts inside the current window
    #[error("Rate limit exceeded; try again in {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: u64 },

    /// No live code matched
    #[error("Invalid verification code")]
    InvalidCode,

    /// Storage or random source failure; the caller may retry
    #[error("Temporary failure: {message}")]
    Transient { message: String },
}

impl OtpError {
    /// Build a `Transient` error from any message
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Whether the same request may succeed later without user action
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidCode)
    }

    /// Seconds the caller should wait before retrying, if known
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::StillValid { retry_after_seconds } | Self::RateLimited { retry_after_seconds } => {
                Some(*retry_after_seconds)
            }
            Self::InvalidCode | Self::Transient { .. } => None,
        }
    }
}

pub type OtpResult<T> = Result<T, OtpError>;

/// Whole seconds covering `duration`, never less than one
///
/// Used for retry hints so a caller told to wait never retries early.
pub fn ceil_seconds(duration: chrono::Duration) -> u64 {
    let millis = duration.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_hints() {
        let still_valid = OtpError::StillValid { retry_after_seconds: 42 };
        assert_eq!(still_valid.retry_after_seconds(), Some(42));
        assert!(still_valid.is_retryable());

        assert_eq!(OtpError::InvalidCode.retry_after_seconds(), None);
        assert!(!OtpError::InvalidCode.is_retryable());

        let transient = OtpError::transient("redis timed out");
        assert!(transient.is_retryable());
        assert_eq!(transient.to_string(), "Temporary failure: redis timed out");
    }

    #[test]
    fn test_ceil_seconds() {
        assert_eq!(ceil_seconds(chrono::Duration::milliseconds(1)), 1);
        assert_eq!(ceil_seconds(chrono::Duration::milliseconds(1000)), 1);
        assert_eq!(ceil_seconds(chrono::Duration::milliseconds(1001)), 2);
        assert_eq!(ceil_seconds(chrono::Duration::seconds(-5)), 1);
    }
}
