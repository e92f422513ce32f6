//! Cache module for Redis-backed OTP storage
//!
//! This module provides the Redis client with bounded command latency and the
//! OTP store built on server-side scripts.

pub mod otp_storage;
pub mod redis_client;


pub use otp_storage::RedisOtpStore;
pub use redis_client::RedisClient;

// Re-export commonly used types
pub use og_shared::config::cache::CacheConfig;
