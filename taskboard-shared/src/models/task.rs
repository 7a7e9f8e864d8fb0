/// Task model
///
/// A task is a short text owned by the user who created it. It is either
/// private (only listed on its owner's dashboard) or public (also reachable
/// as a standalone page at `/task/<id>` where anyone may read it and
/// signed-in visitors may comment). Tasks are never edited in place.
///
/// # Document layout
///
/// ```json
/// {
///   "task": "Buy milk",
///   "created": { "seconds": 1680036254, "nanoseconds": 202000000 },
///   "user": "ana@example.com",
///   "name": "Ana",
///   "public": true
/// }
/// ```
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::session::SessionUser;
/// use taskboard_shared::models::task::NewTask;
/// use taskboard_shared::store::StoreTimestamp;
///
/// let owner = SessionUser::new("ana@example.com", "Ana");
/// let record = NewTask::new("Buy milk", true, &owner).into_record(StoreTimestamp::now());
/// assert_eq!(record.user, "ana@example.com");
/// assert!(record.public);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::session::SessionUser;
use crate::store::timestamp::display_date;
use crate::store::{Collection, Document, DocumentId, FromDocument, StoreError, StoreResult, StoreTimestamp};

/// Task as stored in the `tasks` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Content
    pub task: String,

    /// Creation time
    pub created: StoreTimestamp,

    /// Owner email
    pub user: String,

    /// Owner display name
    pub name: String,

    /// Visibility flag
    #[serde(default)]
    pub public: bool,
}

/// A stored task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: DocumentId,
    pub content: String,
    pub owner_email: String,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
    pub is_public: bool,
}

impl Task {
    /// Checks if the task belongs to the given email
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.owner_email == email
    }

    /// Read-only projection for the public task page
    pub fn public_view(&self) -> PublicTaskView {
        PublicTaskView {
            task_id: self.id.clone(),
            content: self.content.clone(),
            author_name: self.owner_name.clone(),
            created_at: self.created_at,
            date: display_date(&self.created_at),
        }
    }
}

impl FromDocument for Task {
    const COLLECTION: Collection = Collection::Tasks;

    fn from_document(document: Document) -> StoreResult<Self> {
        let record: TaskRecord = document.decode()?;
        let created_at = record.created.to_datetime().ok_or_else(|| StoreError::Malformed {
            collection: document.collection,
            id: document.id.clone(),
            reason: format!("timestamp out of range: {:?}", record.created),
        })?;

        Ok(Self {
            id: document.id,
            content: record.task,
            owner_email: record.user,
            owner_name: record.name,
            created_at,
            is_public: record.public,
        })
    }
}

/// Input for creating a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub content: String,
    pub is_public: bool,
    pub owner_email: String,
    pub owner_name: String,
}

impl NewTask {
    /// Captures the owner from the session
    pub fn new(content: impl Into<String>, is_public: bool, owner: &SessionUser) -> Self {
        Self {
            content: content.into(),
            is_public,
            owner_email: owner.email.clone(),
            owner_name: owner.name.clone(),
        }
    }

    /// Builds the stored record
    pub fn into_record(self, created: StoreTimestamp) -> TaskRecord {
        TaskRecord {
            task: self.content,
            created,
            user: self.owner_email,
            name: self.owner_name,
            public: self.is_public,
        }
    }
}

/// Public task page payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicTaskView {
    pub task_id: DocumentId,
    pub content: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,

    /// Creation date as `dd/mm/yyyy`
    pub date: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::to_fields;
    use chrono::TimeZone;

    fn stored(record: &TaskRecord) -> Document {
        Document {
            collection: Collection::Tasks,
            id: DocumentId::new("t1"),
            fields: to_fields(record).unwrap(),
        }
    }

    #[test]
    fn test_record_uses_store_field_names() {
        let owner = SessionUser::new("ana@example.com", "Ana");
        let record = NewTask::new("Buy milk", false, &owner).into_record(StoreTimestamp {
            seconds: 1_680_036_254,
            nanoseconds: 202_000_000,
        });
        let fields = to_fields(&record).unwrap();

        assert_eq!(fields["task"], "Buy milk");
        assert_eq!(fields["user"], "ana@example.com");
        assert_eq!(fields["name"], "Ana");
        assert_eq!(fields["public"], false);
        assert_eq!(fields["created"]["seconds"], 1_680_036_254);
    }

    #[test]
    fn test_from_document() {
        let record = TaskRecord {
            task: "Buy milk".to_string(),
            created: StoreTimestamp { seconds: 1_680_036_254, nanoseconds: 0 },
            user: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            public: true,
        };

        let task = Task::from_document(stored(&record)).unwrap();

        assert_eq!(task.id.as_str(), "t1");
        assert_eq!(task.content, "Buy milk");
        assert_eq!(task.owner_name, "Ana");
        assert!(task.is_public);
        assert!(task.is_owned_by("ana@example.com"));
        assert!(!task.is_owned_by("bob@example.com"));
        assert_eq!(task.created_at, Utc.timestamp_opt(1_680_036_254, 0).unwrap());
    }

    #[test]
    fn test_missing_public_flag_means_private() {
        let mut document = stored(&TaskRecord {
            task: "x".to_string(),
            created: StoreTimestamp { seconds: 1, nanoseconds: 0 },
            user: "a@example.com".to_string(),
            name: "A".to_string(),
            public: true,
        });
        document.fields.remove("public");

        assert!(!Task::from_document(document).unwrap().is_public);
    }

    #[test]
    fn test_malformed_document() {
        let mut document = stored(&TaskRecord {
            task: "x".to_string(),
            created: StoreTimestamp { seconds: 1, nanoseconds: 0 },
            user: "a@example.com".to_string(),
            name: "A".to_string(),
            public: false,
        });
        document.fields.remove("task");

        assert!(matches!(
            Task::from_document(document),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_public_view_formats_date() {
        let task = Task {
            id: DocumentId::new("t1"),
            content: "Buy milk".to_string(),
            owner_email: "ana@example.com".to_string(),
            owner_name: "Ana".to_string(),
            // 2023-03-28T20:44:14Z
            created_at: Utc.timestamp_opt(1_680_036_254, 0).unwrap(),
            is_public: true,
        };

        let view = task.public_view();
        assert_eq!(view.task_id.as_str(), "t1");
        assert_eq!(view.author_name, "Ana");
        assert_eq!(view.date, "28/03/2023");
    }
}
