//! Redis client wrapper with connection management and health checks
//!
//! Wraps `redis::aio::ConnectionManager` for ordinary commands (XADD,
//! XREVRANGE, PING) and hands out dedicated multiplexed connections for
//! blocking reads, so one subscription's `XREAD BLOCK` never stalls another
//! caller's commands.
//!
//! # Example
//!
//! ```no_run
//! use taskboard_shared::redis::client::{RedisClient, RedisConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RedisConfig::from_env()?;
//! let client = RedisClient::new(config).await?;
//!
//! let healthy = client.ping().await?;
//! println!("Redis healthy: {}", healthy);
//! # Ok(())
//! # }
//! ```

use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::{Client, RedisError};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Redis client errors
#[derive(Error, Debug)]
pub enum RedisClientError {
    /// Connection error
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    /// Command execution error
    #[error("Redis command error: {0}")]
    CommandError(String),

    /// Configuration error
    #[error("Redis configuration error: {0}")]
    ConfigError(String),

    /// Health check failed
    #[error("Redis health check failed: {0}")]
    HealthCheckFailed(String),
}

impl From<RedisError> for RedisClientError {
    fn from(err: RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => {
                RedisClientError::ConnectionError(format!("IO error: {}", err))
            }
            redis::ErrorKind::ResponseError => {
                RedisClientError::CommandError(format!("Response error: {}", err))
            }
            _ => RedisClientError::CommandError(err.to_string()),
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    ///
    /// Format: redis://[username:password@]host:port[/db]
    pub url: String,

    /// Command timeout in seconds (PING and friends)
    pub command_timeout_secs: u64,

    /// Max retries for change notifications
    pub max_retries: u32,
}

impl RedisConfig {
    /// Creates a configuration with default timeouts for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            command_timeout_secs: 10,
            max_retries: 3,
        }
    }

    /// Loads the configuration from environment variables
    ///
    /// # Environment Variables
    ///
    /// - `REDIS_URL`: Redis connection URL (required)
    /// - `REDIS_COMMAND_TIMEOUT_SECS`: Command timeout (default: 10)
    /// - `REDIS_MAX_RETRIES`: Max retries (default: 3)
    ///
    /// # Errors
    ///
    /// Returns an error if `REDIS_URL` is not set.
    pub fn from_env() -> Result<Self, RedisClientError> {
        dotenvy::dotenv().ok();

        let url = env::var("REDIS_URL").map_err(|_| {
            RedisClientError::ConfigError("REDIS_URL environment variable is required".to_string())
        })?;

        let mut config = Self::new(url);

        if let Some(timeout) = env::var("REDIS_COMMAND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.command_timeout_secs = timeout;
        }

        if let Some(retries) = env::var("REDIS_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.max_retries = retries;
        }

        Ok(config)
    }
}

/// Redis client with a shared managed connection
///
/// Cheap to clone.
#[derive(Clone)]
pub struct RedisClient {
    client: Client,
    manager: ConnectionManager,
    config: Arc<RedisConfig>,
}

impl RedisClient {
    /// Connects to Redis
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection fails.
    pub async fn new(config: RedisConfig) -> Result<Self, RedisClientError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            RedisClientError::ConfigError(format!("Invalid Redis URL: {}", e))
        })?;

        // Reconnects automatically on failure
        let manager = ConnectionManager::new(client.clone()).await.map_err(|e| {
            RedisClientError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        tracing::info!(
            "Redis client connected successfully to {}",
            sanitize_url(&config.url)
        );

        Ok(Self {
            client,
            manager,
            config: Arc::new(config),
        })
    }

    /// Sends PING and reports whether PONG came back
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or times out.
    pub async fn ping(&self) -> Result<bool, RedisClientError> {
        let mut conn = self.manager.clone();

        let result: Result<String, RedisError> = tokio::time::timeout(
            Duration::from_secs(self.config.command_timeout_secs),
            redis::cmd("PING").query_async(&mut conn),
        )
        .await
        .map_err(|_| RedisClientError::HealthCheckFailed("PING command timed out".to_string()))?;

        match result {
            Ok(pong) if pong == "PONG" => {
                tracing::debug!("Redis health check: PONG received");
                Ok(true)
            }
            Ok(other) => {
                tracing::warn!("Redis health check: unexpected response: {}", other);
                Ok(false)
            }
            Err(e) => {
                tracing::error!("Redis health check failed: {}", e);
                Err(RedisClientError::HealthCheckFailed(e.to_string()))
            }
        }
    }

    /// Shared managed connection for short commands
    pub fn get_connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Opens a connection reserved for one blocking reader
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn dedicated_connection(&self) -> Result<MultiplexedConnection, RedisClientError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RedisClientError::ConnectionError(format!("Failed to open connection: {}", e)))
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

/// Replaces credentials in a Redis URL with `***:***` for logging
pub fn sanitize_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..scheme_end + 3];
            let host = &url[at_pos + 1..];
            return format!("{}***:***@{}", scheme, host);
        }
    }
    url.to_string()
}
