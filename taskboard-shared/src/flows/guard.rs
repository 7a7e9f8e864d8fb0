//! Page access decisions
//!
//! Each page asks the guard before rendering. The answer is a value, not an
//! error: either render with the data the page needs or redirect somewhere
//! else. Nothing is cached; every navigation is decided afresh.
//!
//! | page          | condition             | decision          |
//! |---------------|-----------------------|-------------------|
//! | dashboard     | no session            | redirect to `/`   |
//! | public task   | unknown id            | redirect to `/404`|
//! | public task   | task is private       | redirect to `/`   |

use serde::Serialize;
use std::sync::Arc;

use super::FlowResult;
use crate::auth::session::SessionUser;
use crate::models::Task;
use crate::store::{Collection, DocumentId, DocumentStore, FromDocument};

/// Where a redirected visitor is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RedirectTarget {
    /// `/`
    Landing,

    /// `/404`
    NotFound,
}

impl RedirectTarget {
    pub fn path(&self) -> &'static str {
        match self {
            RedirectTarget::Landing => "/",
            RedirectTarget::NotFound => "/404",
        }
    }
}

/// Render with `T` or redirect
#[derive(Debug, Clone, PartialEq)]
pub enum PageDecision<T> {
    Render(T),
    Redirect(RedirectTarget),
}

impl<T> PageDecision<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PageDecision<U> {
        match self {
            PageDecision::Render(value) => PageDecision::Render(f(value)),
            PageDecision::Redirect(target) => PageDecision::Redirect(target),
        }
    }

    pub fn redirect_target(&self) -> Option<RedirectTarget> {
        match self {
            PageDecision::Render(_) => None,
            PageDecision::Redirect(target) => Some(*target),
        }
    }
}

/// Access checks for pages
#[derive(Clone)]
pub struct AccessGuard {
    store: Arc<dyn DocumentStore>,
}

impl AccessGuard {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Session-gated page: render for a signed-in user, otherwise go home
    pub fn require_session(session: Option<&SessionUser>) -> PageDecision<SessionUser> {
        match session {
            Some(user) => PageDecision::Render(user.clone()),
            None => PageDecision::Redirect(RedirectTarget::Landing),
        }
    }

    /// Public task page: unknown ids go to `/404`, private tasks to `/`
    pub async fn public_task(&self, id: &DocumentId) -> FlowResult<PageDecision<Task>> {
        let Some(document) = self.store.get(Collection::Tasks, id).await? else {
            tracing::debug!(task_id = %id, "Task not found");
            return Ok(PageDecision::Redirect(RedirectTarget::NotFound));
        };

        let task = Task::from_document(document)?;
        if !task.is_public {
            tracing::debug!(task_id = %id, "Task is private");
            return Ok(PageDecision::Redirect(RedirectTarget::Landing));
        }

        Ok(PageDecision::Render(task))
    }
}
