//! Redis cache client implementation
//!
//! Wraps a multiplexed connection with connection retries at construction,
//! a PING check, and a response timeout around every command. Commands are
//! never retried; a failed or slow command is reported to the caller.

use redis::{aio::MultiplexedConnection, Client, FromRedisValue, RedisResult, Script};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use og_shared::config::CacheConfig;

use crate::InfrastructureError;

/// Upper bound on the delay between connection attempts
const MAX_RETRY_DELAY_MS: u64 = 5000;

/// Redis cache client with bounded command latency
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Configuration used to create this client
    config: CacheConfig,
    /// Budget for each command
    response_timeout: Duration,
    /// Set by `close`; later commands fail with `ShutDown`
    closed: AtomicBool,
}

impl RedisClient {
    /// Connect to Redis and verify the connection with PING
    ///
    /// # Arguments
    /// * `config` - Cache configuration settings
    ///
    /// # Returns
    /// * `Result<Self, InfrastructureError>` - Redis client or error
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        info!(
            url = %mask_url(&config.url),
            connect_retries = config.connect_retries,
            response_timeout_s = config.response_timeout,
            "Creating Redis client"
        );

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!(error = %e, "Failed to parse Redis URL");
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection = Self::create_connection_with_retry(&client, &config).await?;

        let redis_client = Self {
            connection,
            response_timeout: Duration::from_secs(config.response_timeout),
            config,
            closed: AtomicBool::new(false),
        };

        if !redis_client.health_check().await? {
            return Err(InfrastructureError::Config(
                "Redis did not answer PING with PONG".to_string(),
            ));
        }

        info!("Redis client created successfully");
        Ok(redis_client)
    }

    /// Create multiplexed connection with retry logic
    async fn create_connection_with_retry(
        client: &Client,
        config: &CacheConfig,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let max_attempts = config.connect_retries.max(1);
        let connect_timeout = Duration::from_secs(config.connection_timeout);
        let mut attempts = 0;
        let mut delay = config.retry_delay_ms;

        loop {
            attempts += 1;
            debug!(attempt = attempts, "Attempting to connect to Redis");

            let outcome = match timeout(connect_timeout, client.get_multiplexed_async_connection()).await {
                Ok(Ok(connection)) => Ok(connection),
                Ok(Err(e)) => Err(InfrastructureError::Cache(e)),
                Err(_) => Err(InfrastructureError::Timeout {
                    operation: "CONNECT".to_string(),
                    timeout_ms: connect_timeout.as_millis() as u64,
                }),
            };

            match outcome {
                Ok(connection) => {
                    info!(attempt = attempts, "Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_attempts => {
                    warn!(
                        attempt = attempts,
                        max_attempts,
                        error = %e,
                        retry_in_ms = delay,
                        "Failed to connect to Redis, retrying"
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
                }
                Err(e) => {
                    error!(attempts, error = %e, "Failed to connect to Redis");
                    return Err(e);
                }
            }
        }
    }

    /// Apply the configured key prefix
    pub fn key(&self, key: &str) -> String {
        self.config.make_key(key)
    }

    /// Run a Lua script atomically on the server
    ///
    /// Uses EVALSHA and falls back to loading the script when the server
    /// does not have it cached.
    pub async fn run_script<T>(
        &self,
        script: &Script,
        keys: &[String],
        args: &[String],
    ) -> Result<T, InfrastructureError>
    where
        T: FromRedisValue + Send,
    {
        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        for arg in args {
            invocation.arg(arg);
        }

        self.execute("EVALSHA", |mut conn| async move {
            invocation.invoke_async(&mut conn).await
        })
        .await
    }

    /// Delete a key from cache
    ///
    /// # Returns
    /// * `Result<bool, InfrastructureError>` - True if key was deleted, false if not found
    pub async fn delete(&self, key: &str) -> Result<bool, InfrastructureError> {
        let deleted: u32 = self
            .execute("DEL", |mut conn| async move {
                redis::cmd("DEL").arg(key).query_async(&mut conn).await
            })
            .await?;

        debug!(deleted = deleted > 0, "Deleted key");
        Ok(deleted > 0)
    }

    /// Check if the Redis connection is healthy
    ///
    /// Performs a PING command to verify connectivity.
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        let response: String = self
            .execute("PING", |mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;

        if response == "PONG" {
            debug!("Redis health check passed");
            Ok(true)
        } else {
            warn!(response = %response, "Redis health check returned unexpected response");
            Ok(false)
        }
    }

    /// Stop accepting commands
    ///
    /// The underlying connection closes once the last clone of it is dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Redis client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Run one command under the response timeout
    async fn execute<T, F, Fut>(&self, operation: &'static str, command: F) -> Result<T, InfrastructureError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        if self.is_closed() {
            return Err(InfrastructureError::ShutDown);
        }

        match timeout(self.response_timeout, command(self.connection.clone())).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(operation, error = %e, "Redis operation failed");
                Err(InfrastructureError::Cache(e))
            }
            Err(_) => {
                let timeout_ms = self.response_timeout.as_millis() as u64;
                error!(operation, timeout_ms, "Redis operation timed out");
                Err(InfrastructureError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms,
                })
            }
        }
    }
}

/// Mask credentials in a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(proto_end) = url.find("://") {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
