//! Domain layer containing the records owned by the OTP store and the
//! attempt limiter.

pub mod entities;

pub use entities::*;
