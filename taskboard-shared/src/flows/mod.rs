//! Page flows
//!
//! The flows sit between the HTTP handlers and the [`DocumentStore`]. They
//! scope every query to the right owner or task, turn documents into typed
//! models and decide what happens with incomplete input.
//!
//! - [`tasks::TaskRepository`]: the dashboard (list, create, delete, share)
//! - [`comments::PublicTaskFlow`]: a public task page and its comments
//! - [`landing::LandingStats`]: cached task and comment counts
//! - [`guard::AccessGuard`]: render-or-redirect decisions for pages
//!
//! Incomplete input is not an error: a flow answers
//! [`Outcome::Ignored`] and writes nothing.
//!
//! [`DocumentStore`]: crate::store::DocumentStore

pub mod comments;
pub mod guard;
pub mod landing;
pub mod live;
pub mod tasks;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::authorization::AuthzError;
use crate::store::{DocumentId, StoreError};

pub use comments::{CommentDraft, PublicTaskFlow};
pub use guard::{AccessGuard, PageDecision, RedirectTarget};
pub use landing::{LandingCounts, LandingStats};
pub use live::{Live, LiveSnapshot};
pub use tasks::{ShareLink, TaskDraft, TaskRepository};

/// Flow result type alias
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors surfaced by the flows
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Caller may not perform the operation
    #[error(transparent)]
    Authz(#[from] AuthzError),

    /// Task is missing or not public
    #[error("Task {0} not found")]
    TaskNotFound(DocumentId),
}

/// Why a mutation wrote nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Task content was empty
    EmptyContent,

    /// Comment text was empty
    EmptyComment,

    /// No session
    NotSignedIn,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::EmptyContent => "empty_content",
            IgnoreReason::EmptyComment => "empty_comment",
            IgnoreReason::NotSignedIn => "not_signed_in",
        }
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a mutation that may be skipped
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The write happened
    Applied(T),

    /// Nothing was written
    Ignored(IgnoreReason),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Ignored(_) => None,
        }
    }

    pub fn ignored_reason(&self) -> Option<IgnoreReason> {
        match self {
            Outcome::Applied(_) => None,
            Outcome::Ignored(reason) => Some(*reason),
        }
    }
}
