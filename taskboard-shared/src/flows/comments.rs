//! Public task page flow
//!
//! Reads a single task by id and manages the comments attached to it.
//! Anyone may read a public task and its comments; adding a comment needs a
//! session and non-empty text.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::guard::{AccessGuard, PageDecision};
use super::live::{decode_all, Live};
use super::{FlowError, FlowResult, IgnoreReason, Outcome};
use crate::auth::authorization::DeletePolicy;
use crate::auth::session::SessionUser;
use crate::models::{Comment, NewComment, Task};
use crate::store::{
    to_fields, Collection, Direction, DocumentId, DocumentStore, FromDocument, Query,
    StoreTimestamp,
};

/// Comment form state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDraft {
    pub comment: String,
}

impl CommentDraft {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
        }
    }

    pub fn reset(&mut self) {
        self.comment.clear();
    }
}

/// Fetch a task; list, add and delete its comments
#[derive(Clone)]
pub struct PublicTaskFlow {
    store: Arc<dyn DocumentStore>,
    guard: AccessGuard,
    policy: DeletePolicy,
}

impl PublicTaskFlow {
    pub fn new(store: Arc<dyn DocumentStore>, policy: DeletePolicy) -> Self {
        Self {
            guard: AccessGuard::new(Arc::clone(&store)),
            store,
            policy,
        }
    }

    fn task_comments_query(task_id: &DocumentId) -> Query {
        Query::collection(Collection::Comments)
            .where_eq("taskId", task_id.as_str())
            .order_by("created", Direction::Descending)
    }

    /// One-shot read of a task, regardless of visibility
    pub async fn fetch_task(&self, id: &DocumentId) -> FlowResult<Option<Task>> {
        match self.store.get(Collection::Tasks, id).await? {
            Some(document) => Ok(Some(Task::from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Live listing of a task's comments, newest first
    pub async fn list_comments(&self, task_id: &DocumentId) -> FlowResult<Live<Comment>> {
        let subscription = self.store.subscribe(Self::task_comments_query(task_id)).await?;
        Ok(Live::new(subscription))
    }

    /// Current comments of a task, newest first
    pub async fn comments_for_task(&self, task_id: &DocumentId) -> FlowResult<Vec<Comment>> {
        let documents = self.store.query(&Self::task_comments_query(task_id)).await?;
        Ok(decode_all(documents))
    }

    /// Adds a comment from the draft
    ///
    /// Empty text or a missing session writes nothing. On success the draft
    /// is reset.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::TaskNotFound` when the task is missing or private.
    pub async fn add_comment(
        &self,
        task_id: &DocumentId,
        draft: &mut CommentDraft,
        session: Option<&SessionUser>,
    ) -> FlowResult<Outcome<Comment>> {
        if draft.comment.is_empty() {
            return Ok(Outcome::Ignored(IgnoreReason::EmptyComment));
        }
        let Some(author) = session else {
            return Ok(Outcome::Ignored(IgnoreReason::NotSignedIn));
        };

        if let PageDecision::Redirect(_) = self.guard.public_task(task_id).await? {
            return Err(FlowError::TaskNotFound(task_id.clone()));
        }

        let record = NewComment::new(draft.comment.clone(), task_id.clone(), author)
            .into_record(StoreTimestamp::now());
        let document = self.store.insert(Collection::Comments, to_fields(&record)?).await?;
        let comment = Comment::from_document(document)?;

        tracing::info!(
            comment_id = %comment.id,
            task_id = %task_id,
            author = %comment.author_email,
            "Comment added"
        );

        draft.reset();
        Ok(Outcome::Applied(comment))
    }

    /// Deletes a comment by id
    ///
    /// Returns `false` when no comment had that id.
    pub async fn delete_comment(
        &self,
        comment_id: &DocumentId,
        caller: Option<&SessionUser>,
    ) -> FlowResult<bool> {
        if self.policy.requires_owner_lookup() {
            let Some(document) = self.store.get(Collection::Comments, comment_id).await? else {
                return Ok(false);
            };
            let comment = Comment::from_document(document)?;
            self.policy
                .authorize_delete(caller.map(|u| u.email.as_str()), &comment.author_email)?;
        }

        let removed = self.store.delete(Collection::Comments, comment_id).await?;
        tracing::info!(comment_id = %comment_id, removed, "Comment delete requested");

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::tasks::{TaskDraft, TaskRepository};
    use crate::store::memory::MemoryStore;

    struct Fixture {
        tasks: TaskRepository,
        flow: PublicTaskFlow,
    }

    fn fixture(policy: DeletePolicy) -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        Fixture {
            tasks: TaskRepository::new(Arc::clone(&store), policy, "http://localhost:8080"),
            flow: PublicTaskFlow::new(store, policy),
        }
    }

    fn ana() -> SessionUser {
        SessionUser::new("ana@example.com", "Ana")
    }

    fn bob() -> SessionUser {
        SessionUser::new("bob@example.com", "Bob")
    }

    async fn task(fixture: &Fixture, public: bool) -> Task {
        fixture
            .tasks
            .create(&mut TaskDraft::new("Buy milk", public), Some(&ana()))
            .await
            .unwrap()
            .applied()
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_comment_and_list() {
        let fixture = fixture(DeletePolicy::Unchecked);
        let task = task(&fixture, true).await;
        let mut draft = CommentDraft::new("ok");

        let comment = fixture
            .flow
            .add_comment(&task.id, &mut draft, Some(&bob()))
            .await
            .unwrap()
            .applied()
            .unwrap();

        assert_eq!(comment.task_id, task.id);
        assert_eq!(comment.author_name, "Bob");
        assert!(draft.comment.is_empty());

        let listed = fixture.flow.comments_for_task(&task.id).await.unwrap();
        assert_eq!(listed, vec![comment]);
    }

    #[tokio::test]
    async fn test_add_comment_ignored_inputs() {
        let fixture = fixture(DeletePolicy::Unchecked);
        let task = task(&fixture, true).await;

        let empty = fixture
            .flow
            .add_comment(&task.id, &mut CommentDraft::new(""), Some(&bob()))
            .await
            .unwrap();
        assert_eq!(empty.ignored_reason(), Some(IgnoreReason::EmptyComment));

        let anonymous = fixture
            .flow
            .add_comment(&task.id, &mut CommentDraft::new("hi"), None)
            .await
            .unwrap();
        assert_eq!(anonymous.ignored_reason(), Some(IgnoreReason::NotSignedIn));

        assert!(fixture.flow.comments_for_task(&task.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_comment_on_private_or_missing_task() {
        let fixture = fixture(DeletePolicy::Unchecked);
        let private = task(&fixture, false).await;

        let err = fixture
            .flow
            .add_comment(&private.id, &mut CommentDraft::new("hi"), Some(&bob()))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::TaskNotFound(_)));

        let err = fixture
            .flow
            .add_comment(&DocumentId::new("missing"), &mut CommentDraft::new("hi"), Some(&bob()))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_comments_scoped_to_task() {
        let fixture = fixture(DeletePolicy::Unchecked);
        let first = task(&fixture, true).await;
        let second = task(&fixture, true).await;

        fixture
            .flow
            .add_comment(&first.id, &mut CommentDraft::new("on first"), Some(&bob()))
            .await
            .unwrap();

        assert_eq!(fixture.flow.comments_for_task(&first.id).await.unwrap().len(), 1);
        assert!(fixture.flow.comments_for_task(&second.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_comment_owner_policy() {
        let fixture = fixture(DeletePolicy::Owner);
        let task = task(&fixture, true).await;
        let comment = fixture
            .flow
            .add_comment(&task.id, &mut CommentDraft::new("ok"), Some(&bob()))
            .await
            .unwrap()
            .applied()
            .unwrap();

        assert!(fixture.flow.delete_comment(&comment.id, Some(&ana())).await.is_err());
        assert!(fixture.flow.delete_comment(&comment.id, Some(&bob())).await.unwrap());
        assert!(fixture.flow.comments_for_task(&task.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comments_survive_task_deletion() {
        let fixture = fixture(DeletePolicy::Unchecked);
        let task = task(&fixture, true).await;
        fixture
            .flow
            .add_comment(&task.id, &mut CommentDraft::new("ok"), Some(&bob()))
            .await
            .unwrap();

        fixture.tasks.delete(&task.id, Some(&ana())).await.unwrap();

        assert!(fixture.flow.fetch_task(&task.id).await.unwrap().is_none());
        assert_eq!(fixture.flow.comments_for_task(&task.id).await.unwrap().len(), 1);
    }
}
