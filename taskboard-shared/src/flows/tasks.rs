//! Dashboard flow: a signed-in user's own tasks
//!
//! Listings are always scoped to the owner's email and ordered newest first.
//! Creating a task consumes a [`TaskDraft`] (the dashboard form state) and
//! resets it once the task is stored.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::live::{decode_all, Live};
use super::{FlowResult, IgnoreReason, Outcome};
use crate::auth::authorization::DeletePolicy;
use crate::auth::session::SessionUser;
use crate::models::{NewTask, Task};
use crate::store::{
    to_fields, Collection, Direction, DocumentId, DocumentStore, FromDocument, Query,
    StoreTimestamp,
};

/// Message shown after a share link was produced
pub const SHARE_CONFIRMATION: &str = "Task URL copied to clipboard!";

/// Dashboard form state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub content: String,

    #[serde(default, rename = "public")]
    pub is_public: bool,
}

impl TaskDraft {
    pub fn new(content: impl Into<String>, is_public: bool) -> Self {
        Self {
            content: content.into(),
            is_public,
        }
    }

    /// Clears the content and unticks the public flag
    pub fn reset(&mut self) {
        self.content.clear();
        self.is_public = false;
    }
}

/// Shareable link to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    pub url: String,
    pub message: String,
}

/// Create, list, delete and share tasks
#[derive(Clone)]
pub struct TaskRepository {
    store: Arc<dyn DocumentStore>,
    policy: DeletePolicy,
    public_url: String,
}

impl TaskRepository {
    /// Creates the flow
    ///
    /// `public_url` is the externally visible base of share links.
    pub fn new(store: Arc<dyn DocumentStore>, policy: DeletePolicy, public_url: impl Into<String>) -> Self {
        Self {
            store,
            policy,
            public_url: public_url.into(),
        }
    }

    fn owner_query(owner_email: &str) -> Query {
        Query::collection(Collection::Tasks)
            .where_eq("user", owner_email)
            .order_by("created", Direction::Descending)
    }

    /// Live listing of the owner's tasks, newest first
    pub async fn list_for_owner(&self, owner_email: &str) -> FlowResult<Live<Task>> {
        let subscription = self.store.subscribe(Self::owner_query(owner_email)).await?;
        Ok(Live::new(subscription))
    }

    /// Current listing of the owner's tasks, newest first
    pub async fn tasks_for_owner(&self, owner_email: &str) -> FlowResult<Vec<Task>> {
        let documents = self.store.query(&Self::owner_query(owner_email)).await?;
        Ok(decode_all(documents))
    }

    /// Stores a task from the draft
    ///
    /// Empty content or a missing session writes nothing. On success the
    /// draft is reset.
    pub async fn create(
        &self,
        draft: &mut TaskDraft,
        session: Option<&SessionUser>,
    ) -> FlowResult<Outcome<Task>> {
        if draft.content.is_empty() {
            return Ok(Outcome::Ignored(IgnoreReason::EmptyContent));
        }
        let Some(owner) = session else {
            return Ok(Outcome::Ignored(IgnoreReason::NotSignedIn));
        };

        let record = NewTask::new(draft.content.clone(), draft.is_public, owner)
            .into_record(StoreTimestamp::now());
        let document = self.store.insert(Collection::Tasks, to_fields(&record)?).await?;
        let task = Task::from_document(document)?;

        tracing::info!(
            task_id = %task.id,
            owner = %task.owner_email,
            public = task.is_public,
            "Task created"
        );

        draft.reset();
        Ok(Outcome::Applied(task))
    }

    /// Deletes a task by id
    ///
    /// Returns `false` when no task had that id.
    ///
    /// # Errors
    ///
    /// Under [`DeletePolicy::Owner`] a caller who does not own the task gets
    /// `FlowError::Authz`.
    ///
    /// [`FlowError::Authz`]: super::FlowError::Authz
    pub async fn delete(&self, id: &DocumentId, caller: Option<&SessionUser>) -> FlowResult<bool> {
        if self.policy.requires_owner_lookup() {
            let Some(document) = self.store.get(Collection::Tasks, id).await? else {
                return Ok(false);
            };
            let task = Task::from_document(document)?;
            self.policy
                .authorize_delete(caller.map(|u| u.email.as_str()), &task.owner_email)?;
        }

        let removed = self.store.delete(Collection::Tasks, id).await?;
        tracing::info!(task_id = %id, removed, "Task delete requested");

        Ok(removed)
    }

    /// Public link to a task: `<public-url>/task/<id>`
    pub fn share_url(&self, id: &DocumentId) -> String {
        format!("{}/task/{}", self.public_url.trim_end_matches('/'), id)
    }

    /// Share link plus the confirmation message for the client
    pub fn share(&self, id: &DocumentId) -> ShareLink {
        ShareLink {
            url: self.share_url(id),
            message: SHARE_CONFIRMATION.to_string(),
        }
    }
}
