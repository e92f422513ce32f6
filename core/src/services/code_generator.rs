//! Fixed-width numeric code generation.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::errors::{OtpError, OtpResult};

/// Default number of digits in a code
pub const DEFAULT_CODE_DIGITS: u32 = 6;

/// Generates zero-padded numeric codes uniformly over `[0, 10^digits)`
///
/// Codes come from the operating system CSPRNG. Sampling uses rejection
/// so no value is more likely than another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeGenerator {
    digits: u32,
    space: u64,
}

impl CodeGenerator {
    /// Create a generator for codes of `digits` width (1..=18)
    pub fn new(digits: u32) -> OtpResult<Self> {
        if digits == 0 || digits > og_shared::config::otp::MAX_CODE_DIGITS {
            return Err(OtpError::transient(format!(
                "unsupported code width: {}",
                digits
            )));
        }
        Ok(Self {
            digits,
            space: 10u64.pow(digits),
        })
    }

    /// Code width in digits
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Generate a code from the OS random source
    pub fn generate(&self) -> OtpResult<String> {
        self.generate_with(&mut OsRng)
    }

    /// Generate a code from the given cryptographically secure source
    ///
    /// A failing source is reported as `Transient`; there is no fallback.
    pub fn generate_with<R: RngCore + CryptoRng>(&self, rng: &mut R) -> OtpResult<String> {
        // Largest multiple of `space` representable; draws at or above it are rejected
        let zone = (u64::MAX / self.space) * self.space;
        let mut bytes = [0u8; 8];

        let value = loop {
            rng.try_fill_bytes(&mut bytes).map_err(|e| {
                tracing::error!(error = %e, event = "random_source_failed", "Random source failed");
                OtpError::transient(format!("random source unavailable: {}", e))
            })?;
            let draw = u64::from_le_bytes(bytes);
            if draw < zone {
                break draw % self.space;
            }
        };

        Ok(format!("{:0width$}", value, width = self.digits as usize))
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self {
            digits: DEFAULT_CODE_DIGITS,
            space: 10u64.pow(DEFAULT_CODE_DIGITS),
        }
    }
}
