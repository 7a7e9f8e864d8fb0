//! Collection change feed on Redis Streams
//!
//! Every insert or delete performed by the PostgreSQL store appends a small
//! notice to a per-collection stream. Live queries tail the stream and
//! re-run their query whenever a notice arrives.
//!
//! ```text
//! PgStore::insert/delete
//!     │
//!     │ XADD {namespace}:changes:{collection} MAXLEN ~ 1000 * collection … id … op …
//!     ▼
//! Redis Stream ──XREAD BLOCK──> ChangeTail (one per live query)
//! ```
//!
//! Notices carry no document data; the stream only signals that a fresh
//! snapshot is due.

use crate::redis::client::{RedisClient, RedisClientError};
use crate::store::{Collection, DocumentId};
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamMaxlen, StreamRangeReply, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stream ID that sorts before every real entry
pub const STREAM_START: &str = "0-0";

/// Change feed errors
#[derive(Error, Debug)]
pub enum ChangeFeedError {
    /// Redis client error
    #[error("Redis error: {0}")]
    RedisError(#[from] RedisClientError),

    /// Raw Redis error
    #[error("Redis command error: {0}")]
    RedisCommandError(#[from] redis::RedisError),

    /// Write failed after retries
    #[error("Failed to publish change after {attempts} attempts: {last_error}")]
    PublishFailed { attempts: u32, last_error: String },
}

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Delete,
}

impl ChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Insert => "insert",
            ChangeOp::Delete => "delete",
        }
    }
}

/// A single change notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub collection: Collection,
    pub id: DocumentId,
    pub op: ChangeOp,
}

/// Change feed tuning
#[derive(Debug, Clone)]
pub struct ChangeFeedConfig {
    /// Approximate number of notices kept per stream
    pub max_len: usize,

    /// Maximum number of publish retries
    pub max_retries: u32,

    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,

    /// How long one XREAD blocks before the tail re-checks for cancellation
    pub block_ms: usize,
}

impl Default for ChangeFeedConfig {
    fn default() -> Self {
        Self {
            max_len: 1000,
            max_retries: 3,
            base_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
            block_ms: 5000,
        }
    }
}

/// Stream key holding the notices of one collection
pub fn change_stream_key(namespace: &str, collection: Collection) -> String {
    format!("{}:changes:{}", namespace, collection.as_str())
}

/// Publisher and tail factory for collection changes
#[derive(Clone)]
pub struct ChangeFeed {
    client: RedisClient,
    namespace: String,
    config: ChangeFeedConfig,
}

impl ChangeFeed {
    /// Creates a change feed scoped to a store namespace
    pub fn new(client: RedisClient, namespace: impl Into<String>) -> Self {
        let config = ChangeFeedConfig {
            max_retries: client.config().max_retries,
            ..ChangeFeedConfig::default()
        };
        Self::with_config(client, namespace, config)
    }

    pub fn with_config(
        client: RedisClient,
        namespace: impl Into<String>,
        config: ChangeFeedConfig,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            config,
        }
    }

    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    /// Appends a notice, retrying with exponential backoff
    ///
    /// # Returns
    ///
    /// The stream entry ID of the notice
    ///
    /// # Errors
    ///
    /// Returns `ChangeFeedError::PublishFailed` once retries are exhausted.
    pub async fn publish(&self, notice: &ChangeNotice) -> Result<String, ChangeFeedError> {
        let key = change_stream_key(&self.namespace, notice.collection);
        let items = [
            ("collection", notice.collection.as_str()),
            ("id", notice.id.as_str()),
            ("op", notice.op.as_str()),
        ];

        let mut attempt = 0;
        loop {
            let mut conn = self.client.get_connection();
            let result: Result<String, redis::RedisError> = conn
                .xadd_maxlen(&key, StreamMaxlen::Approx(self.config.max_len), "*", &items)
                .await;

            match result {
                Ok(entry_id) => {
                    tracing::debug!(
                        stream_key = %key,
                        id = %notice.id,
                        op = notice.op.as_str(),
                        entry_id = %entry_id,
                        "Published change notice"
                    );
                    return Ok(entry_id);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        return Err(ChangeFeedError::PublishFailed {
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }

                    let delay_ms = std::cmp::min(
                        self.config.base_retry_delay_ms * 2u64.pow(attempt - 1),
                        self.config.max_retry_delay_ms,
                    );

                    tracing::warn!(
                        stream_key = %key,
                        attempt = attempt,
                        delay_ms = delay_ms,
                        error = %e,
                        "XADD failed, retrying..."
                    );

                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    /// ID of the newest notice for a collection, or [`STREAM_START`]
    pub async fn latest_id(&self, collection: Collection) -> Result<String, ChangeFeedError> {
        let key = change_stream_key(&self.namespace, collection);
        let mut conn = self.client.get_connection();

        let reply: StreamRangeReply = conn.xrevrange_count(&key, "+", "-", 1).await?;

        Ok(reply
            .ids
            .into_iter()
            .next()
            .map(|entry| entry.id)
            .unwrap_or_else(|| STREAM_START.to_string()))
    }

    /// Starts tailing a collection after the newest existing notice
    ///
    /// Call this before reading the initial snapshot so that changes landing
    /// in between are still observed.
    pub async fn tail(&self, collection: Collection) -> Result<ChangeTail, ChangeFeedError> {
        let last_id = self.latest_id(collection).await?;
        self.tail_after(collection, last_id).await
    }

    /// Resumes tailing a collection after a known notice ID
    pub async fn tail_after(
        &self,
        collection: Collection,
        last_id: String,
    ) -> Result<ChangeTail, ChangeFeedError> {
        let conn = self.client.dedicated_connection().await?;

        Ok(ChangeTail {
            conn,
            key: change_stream_key(&self.namespace, collection),
            last_id,
            block_ms: self.config.block_ms,
        })
    }
}

/// Blocking reader over one collection's notices
pub struct ChangeTail {
    conn: MultiplexedConnection,
    key: String,
    last_id: String,
    block_ms: usize,
}

impl ChangeTail {
    /// Blocks until new notices arrive or the block window passes
    ///
    /// # Returns
    ///
    /// Number of notices consumed (`0` on timeout)
    pub async fn wait(&mut self) -> Result<usize, ChangeFeedError> {
        let opts = StreamReadOptions::default().block(self.block_ms);

        let reply: Option<StreamReadReply> = self
            .conn
            .xread_options(&[&self.key], &[&self.last_id], &opts)
            .await?;

        let mut consumed = 0;
        for stream in reply.map(|r| r.keys).unwrap_or_default() {
            for entry in stream.ids {
                self.last_id = entry.id;
                consumed += 1;
            }
        }

        if consumed > 0 {
            tracing::trace!(stream_key = %self.key, consumed, last_id = %self.last_id, "Change notices received");
        }

        Ok(consumed)
    }

    /// Last notice ID seen by this tail
    pub fn last_id(&self) -> &str {
        &self.last_id
    }
}
