//! Redis integration for the store change feed
//!
//! - [`client`]: connection management and health checks
//! - [`change_feed`]: per-collection change notices on Redis Streams
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   PgStore   │ ──XADD──> {namespace}:changes:{collection}
//! └─────────────┘                       │
//!                                       │ XREAD BLOCK
//!                                       ▼
//!                           ┌──────────────────────┐
//!                           │ live query (per SSE) │ ──> re-query, new snapshot
//!                           └──────────────────────┘
//! ```

pub mod change_feed;
pub mod client;

pub use change_feed::{ChangeFeed, ChangeFeedConfig, ChangeFeedError, ChangeNotice, ChangeOp, ChangeTail};
pub use client::{RedisClient, RedisClientError, RedisConfig};
