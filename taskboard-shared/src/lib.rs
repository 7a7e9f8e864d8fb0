//! # Taskboard+ Shared Library
//!
//! Domain logic of the Taskboard+ task-sharing service, used by the API
//! server.
//!
//! ## Module Organization
//!
//! - `store`: document store adapter (in-memory and PostgreSQL backends)
//! - `redis`: Redis client and the store change feed
//! - `db`: PostgreSQL pool and migrations
//! - `models`: tasks and comments
//! - `auth`: session tokens, cookies, session middleware, delete policy
//! - `flows`: dashboard, public task, landing and page-access flows

pub mod auth;
pub mod db;
pub mod flows;
pub mod models;
pub mod redis;
pub mod store;

/// Current version of the Taskboard+ shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
