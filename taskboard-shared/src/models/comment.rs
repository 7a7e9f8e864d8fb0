/// Comment model
///
/// Comments hang off public tasks through `taskId`. Deleting a task does not
/// delete its comments; they stay in the collection, unreachable.
///
/// # Document layout
///
/// ```json
/// {
///   "comment": "ok",
///   "created": { "seconds": 1680036254, "nanoseconds": 0 },
///   "user": "bob@example.com",
///   "name": "Bob",
///   "taskId": "3f1c..."
/// }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::session::SessionUser;
use crate::store::{Collection, Document, DocumentId, FromDocument, StoreError, StoreResult, StoreTimestamp};

/// Comment as stored in the `comments` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub comment: String,
    pub created: StoreTimestamp,

    /// Author email
    pub user: String,

    /// Author display name
    pub name: String,

    #[serde(rename = "taskId")]
    pub task_id: DocumentId,
}

/// A stored comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: DocumentId,
    pub comment: String,
    pub task_id: DocumentId,
    pub author_email: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_authored_by(&self, email: &str) -> bool {
        self.author_email == email
    }
}

impl FromDocument for Comment {
    const COLLECTION: Collection = Collection::Comments;

    fn from_document(document: Document) -> StoreResult<Self> {
        let record: CommentRecord = document.decode()?;
        let created_at = record.created.to_datetime().ok_or_else(|| StoreError::Malformed {
            collection: document.collection,
            id: document.id.clone(),
            reason: format!("timestamp out of range: {:?}", record.created),
        })?;

        Ok(Self {
            id: document.id,
            comment: record.comment,
            task_id: record.task_id,
            author_email: record.user,
            author_name: record.name,
            created_at,
        })
    }
}

/// Input for adding a comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub comment: String,
    pub task_id: DocumentId,
    pub author_email: String,
    pub author_name: String,
}

impl NewComment {
    pub fn new(comment: impl Into<String>, task_id: DocumentId, author: &SessionUser) -> Self {
        Self {
            comment: comment.into(),
            task_id,
            author_email: author.email.clone(),
            author_name: author.name.clone(),
        }
    }

    pub fn into_record(self, created: StoreTimestamp) -> CommentRecord {
        CommentRecord {
            comment: self.comment,
            created,
            user: self.author_email,
            name: self.author_name,
            task_id: self.task_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::to_fields;

    #[test]
    fn test_record_uses_task_id_field_name() {
        let author = SessionUser::new("bob@example.com", "Bob");
        let record = NewComment::new("ok", DocumentId::new("t1"), &author)
            .into_record(StoreTimestamp { seconds: 5, nanoseconds: 0 });
        let fields = to_fields(&record).unwrap();

        assert_eq!(fields["taskId"], "t1");
        assert_eq!(fields["comment"], "ok");
        assert_eq!(fields["user"], "bob@example.com");
        assert!(!fields.contains_key("task_id"));
    }

    #[test]
    fn test_from_document() {
        let author = SessionUser::new("bob@example.com", "Bob");
        let record = NewComment::new("ok", DocumentId::new("t1"), &author)
            .into_record(StoreTimestamp { seconds: 5, nanoseconds: 0 });
        let document = Document {
            collection: Collection::Comments,
            id: DocumentId::new("c1"),
            fields: to_fields(&record).unwrap(),
        };

        let comment = Comment::from_document(document).unwrap();
        assert_eq!(comment.id.as_str(), "c1");
        assert_eq!(comment.task_id.as_str(), "t1");
        assert_eq!(comment.author_name, "Bob");
        assert!(comment.is_authored_by("bob@example.com"));
    }
}
