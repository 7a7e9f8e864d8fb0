//! Landing page counters
//!
//! The landing page shows how many tasks and comments exist. Counting is a
//! full collection read, so the numbers are cached for a refresh window:
//! within the window every visitor gets the same counts, and the first
//! visitor after it expires triggers the refresh. Writes never invalidate
//! the cache.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::FlowResult;
use crate::store::{Collection, DocumentStore};

/// Default refresh window
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(60);

/// Counts shown on the landing page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingCounts {
    /// Number of tasks
    pub posts: u64,

    /// Number of comments
    pub comments: u64,
}

#[derive(Debug, Clone, Copy)]
struct CachedCounts {
    counts: LandingCounts,
    fetched_at: Instant,
}

/// Cached task and comment counts
pub struct LandingStats {
    store: Arc<dyn DocumentStore>,
    refresh: Duration,
    // Held across the refresh so concurrent visitors wait for one fetch
    cache: Mutex<Option<CachedCounts>>,
}

impl LandingStats {
    pub fn new(store: Arc<dyn DocumentStore>, refresh: Duration) -> Self {
        Self {
            store,
            refresh,
            cache: Mutex::new(None),
        }
    }

    pub fn refresh_window(&self) -> Duration {
        self.refresh
    }

    /// Current counts, refreshed when the window has elapsed
    ///
    /// # Errors
    ///
    /// A failed refresh falls back to the previous counts. Only when no
    /// counts were ever fetched does the store error propagate.
    pub async fn counts(&self) -> FlowResult<LandingCounts> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.refresh {
                return Ok(cached.counts);
            }
        }

        match self.fetch().await {
            Ok(counts) => {
                tracing::debug!(posts = counts.posts, comments = counts.comments, "Landing counts refreshed");
                *cache = Some(CachedCounts {
                    counts,
                    fetched_at: Instant::now(),
                });
                Ok(counts)
            }
            Err(e) => match cache.as_ref() {
                Some(stale) => {
                    tracing::warn!(error = %e, "Landing counts refresh failed, serving stale counts");
                    Ok(stale.counts)
                }
                None => Err(e),
            },
        }
    }

    async fn fetch(&self) -> FlowResult<LandingCounts> {
        let (posts, comments) = tokio::try_join!(
            self.store.count(Collection::Tasks),
            self.store.count(Collection::Comments),
        )?;

        Ok(LandingCounts { posts, comments })
    }
}
