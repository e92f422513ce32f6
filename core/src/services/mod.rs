//! Business services containing the OTP lifecycle.

pub mod clock;
pub mod code_generator;
pub mod otp;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use code_generator::{CodeGenerator, DEFAULT_CODE_DIGITS};
pub use otp::{AttemptLimiter, OtpService, OtpStore};
