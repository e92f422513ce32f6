//! Storage backend configuration module

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Bytes escaped in URL userinfo; RFC 3986 unreserved characters pass through
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Redis cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection timeout in seconds
    pub connection_timeout: u64,

    /// Response timeout in seconds, applied to every command
    pub response_timeout: u64,

    /// Connection attempts made when the client is created
    pub connect_retries: u32,

    /// Base delay between connection attempts in milliseconds
    pub retry_delay_ms: u64,

    /// Enable cache key prefix
    pub key_prefix: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://localhost:6379"),
            connection_timeout: 5,
            response_timeout: 2,
            connect_retries: 3,
            retry_delay_ms: 100,
            key_prefix: None,
        }
    }
}

impl CacheConfig {
    /// Create from environment variables
    ///
    /// `REDIS_URL` wins when present. Otherwise the URL is assembled from
    /// `REDIS_ADDRESS`, `REDIS_USERNAME`, `REDIS_PASSWORD` and `REDIS_DATABASE`.
    pub fn from_env() -> Self {
        let url = match std::env::var("REDIS_URL") {
            Ok(url) => url,
            Err(_) => Self::url_from_parts(
                &std::env::var("REDIS_ADDRESS").unwrap_or_else(|_| "localhost:6379".to_string()),
                std::env::var("REDIS_USERNAME").ok().as_deref(),
                std::env::var("REDIS_PASSWORD").ok().as_deref(),
                std::env::var("REDIS_DATABASE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
            ),
        };
        let response_timeout = std::env::var("REDIS_RESPONSE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        Self {
            url,
            response_timeout,
            key_prefix: std::env::var("REDIS_KEY_PREFIX").ok(),
            ..Default::default()
        }
    }

    /// Create a new cache configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Build a `redis://` URL from separate connection parameters
    ///
    /// Username and password are percent-encoded.
    pub fn url_from_parts(
        address: &str,
        username: Option<&str>,
        password: Option<&str>,
        database: u8,
    ) -> String {
        let encode = |value: &str| utf8_percent_encode(value, USERINFO).to_string();
        let username = username.filter(|u| !u.is_empty()).map(encode);
        let password = password.filter(|p| !p.is_empty()).map(encode);

        let credentials = match (username, password) {
            (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
            (None, Some(pass)) => format!(":{}@", pass),
            (Some(user), None) => format!("{}@", user),
            (None, None) => String::new(),
        };
        format!("redis://{}{}/{}", credentials, address, database)
    }

    /// Set the key prefix for all cache keys
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the per-command response timeout
    pub fn with_response_timeout(mut self, seconds: u64) -> Self {
        self.response_timeout = seconds;
        self
    }

    /// Generate a cache key with prefix
    pub fn make_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

/// In-process backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MemoryCacheConfig {
    /// Number of independently locked shards
    pub shard_count: usize,

    /// Sweep interval in seconds; must not exceed the code validity
    pub sweep_interval: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            shard_count: 16,
            sweep_interval: 60, // 1 minute
        }
    }
}

/// Cache strategy configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheStrategyConfig {
    /// Which backend holds codes and attempt windows
    pub cache_type: CacheType,

    /// Redis configuration
    pub redis: CacheConfig,

    /// In-process configuration
    pub memory: MemoryCacheConfig,
}

/// Cache type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    #[default]
    Redis,
    Memory,
}

impl Default for CacheStrategyConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::default(),
            redis: CacheConfig::default(),
            memory: MemoryCacheConfig::default(),
        }
    }
}

impl CacheStrategyConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let cache_type = match std::env::var("CACHE_TYPE").as_deref() {
            Ok("memory") => CacheType::Memory,
            _ => CacheType::Redis,
        };
        Self {
            cache_type,
            redis: CacheConfig::from_env(),
            memory: MemoryCacheConfig::default(),
        }
    }

    /// In-process backend with default settings
    pub fn memory() -> Self {
        Self {
            cache_type: CacheType::Memory,
            ..Default::default()
        }
    }
}
