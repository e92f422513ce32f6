//! Domain entities

pub mod attempt_window;
pub mod otp_record;

pub use attempt_window::AttemptWindow;
pub use otp_record::OtpRecord;
