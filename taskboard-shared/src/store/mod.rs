//! Document store adapter
//!
//! Every read and write performed by the flows goes through the
//! [`DocumentStore`] trait. A store holds named collections of schemaless
//! documents and supports:
//!
//! - insert (the store assigns the id)
//! - point lookup and delete by id
//! - collection counts
//! - equality-filtered queries ordered by a timestamp field
//! - live subscriptions that re-deliver the full result set on every change
//!
//! # Backends
//!
//! - [`memory::MemoryStore`]: in-process, used for development and tests
//! - [`postgres::PgStore`]: PostgreSQL documents table + Redis change feed
//!
//! # Example
//!
//! ```no_run
//! use taskboard_shared::store::{memory::MemoryStore, Collection, Direction, DocumentStore, Query};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let fields = json!({"task": "Buy milk", "user": "a@example.com"});
//! store.insert(Collection::Tasks, fields.as_object().cloned().unwrap()).await?;
//!
//! let query = Query::collection(Collection::Tasks)
//!     .where_eq("user", "a@example.com")
//!     .order_by("created", Direction::Descending);
//! let documents = store.query(&query).await?;
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgres;
pub mod subscription;
pub mod timestamp;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

pub use subscription::{CancelHandle, Snapshot, Subscription};
pub use timestamp::StoreTimestamp;

/// Field map of a stored document
pub type Fields = Map<String, Value>;

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Collections known to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// User tasks
    Tasks,

    /// Comments on public tasks
    Comments,
}

impl Collection {
    /// Collection name as addressed in the store
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::Comments => "comments",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque document identifier assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wraps an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh identifier for an insert
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Collection the document lives in
    pub collection: Collection,

    /// Store-assigned identifier
    pub id: DocumentId,

    /// Document fields
    pub fields: Fields,
}

impl Document {
    /// Deserializes the document fields into a typed record
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Malformed` when the fields do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| {
            StoreError::Malformed {
                collection: self.collection,
                id: self.id.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Reads a timestamp field, if present and well-formed
    pub fn timestamp(&self, field: &str) -> Option<StoreTimestamp> {
        self.fields
            .get(field)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

/// Serializes a typed record into document fields
///
/// # Errors
///
/// Returns `StoreError::InvalidDocument` if the record does not serialize to
/// a JSON object.
pub fn to_fields<T: Serialize>(record: &T) -> StoreResult<Fields> {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(StoreError::InvalidDocument(e.to_string())),
    }
}

/// Types that can be read back from a document
pub trait FromDocument: Sized {
    /// Collection the type is stored in
    const COLLECTION: Collection;

    /// Builds the value from a stored document
    fn from_document(document: Document) -> StoreResult<Self>;
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// SQL keyword for the direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// Equality filter on a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

/// Ordering on a timestamp field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filtered, ordered query over one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub collection: Collection,
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// Query returning every document of a collection
    pub fn collection(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
        }
    }

    /// Adds an equality filter
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Orders results by a timestamp field
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Whether a document satisfies the collection and every filter
    pub fn matches(&self, document: &Document) -> bool {
        document.collection == self.collection
            && self
                .filters
                .iter()
                .all(|filter| document.fields.get(&filter.field) == Some(&filter.value))
    }

    /// Compares two matching documents by the query ordering
    ///
    /// Documents without a readable timestamp sort as the oldest. Returns
    /// `Ordering::Equal` when the query is unordered.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let Some(order) = &self.order_by else {
            return Ordering::Equal;
        };

        let ordering = a.timestamp(&order.field).cmp(&b.timestamp(&order.field));
        match order.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

/// Errors raised by store backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Change notification could not be read or written
    #[error("Change feed error: {0}")]
    ChangeFeed(String),

    /// Stored fields do not match the expected record
    #[error("Malformed {collection} document {id}: {reason}")]
    Malformed {
        collection: Collection,
        id: DocumentId,
        reason: String,
    },

    /// A record could not be turned into document fields
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Backend is not reachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<crate::redis::ChangeFeedError> for StoreError {
    fn from(err: crate::redis::ChangeFeedError) -> Self {
        StoreError::ChangeFeed(err.to_string())
    }
}

/// Collection-oriented document store
///
/// Implementations must be cheap to share (`Arc<dyn DocumentStore>`); one
/// handle is built at start-up and passed to every flow.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Inserts a document and returns it with its assigned id
    async fn insert(&self, collection: Collection, fields: Fields) -> StoreResult<Document>;

    /// Looks a document up by id
    async fn get(&self, collection: Collection, id: &DocumentId) -> StoreResult<Option<Document>>;

    /// Deletes a document by id
    ///
    /// Returns `false` when no document had that id. Deleting a missing id
    /// is not an error.
    async fn delete(&self, collection: Collection, id: &DocumentId) -> StoreResult<bool>;

    /// Counts all documents in a collection
    async fn count(&self, collection: Collection) -> StoreResult<u64>;

    /// One-shot query
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Live query
    ///
    /// The returned subscription first yields the current result set, then a
    /// full new result set after every change to the queried collection,
    /// until it is cancelled or dropped.
    async fn subscribe(&self, query: Query) -> StoreResult<Subscription>;

    /// Verifies the backend is reachable
    async fn health_check(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(id: &str, user: &str, seconds: i64) -> Document {
        let fields = json!({
            "user": user,
            "created": {"seconds": seconds, "nanoseconds": 0},
        });
        Document {
            collection: Collection::Tasks,
            id: DocumentId::new(id),
            fields: fields.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::Tasks.as_str(), "tasks");
        assert_eq!(Collection::Comments.as_str(), "comments");
        assert_eq!(Collection::Comments.to_string(), "comments");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = DocumentId::generate();
        let b = DocumentId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_query_matches_filters_and_collection() {
        let query = Query::collection(Collection::Tasks).where_eq("user", "a@example.com");

        assert!(query.matches(&document("1", "a@example.com", 1)));
        assert!(!query.matches(&document("2", "b@example.com", 1)));

        let mut comment = document("3", "a@example.com", 1);
        comment.collection = Collection::Comments;
        assert!(!query.matches(&comment));
    }

    #[test]
    fn test_query_compare_descending() {
        let query = Query::collection(Collection::Tasks).order_by("created", Direction::Descending);

        let mut docs = vec![
            document("old", "a", 10),
            document("new", "a", 30),
            document("mid", "a", 20),
        ];
        docs.sort_by(|a, b| query.compare(a, b));

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_missing_timestamp_sorts_oldest() {
        let query = Query::collection(Collection::Tasks).order_by("created", Direction::Descending);

        let mut undated = document("undated", "a", 0);
        undated.fields.remove("created");
        let dated = document("dated", "a", 1);

        assert_eq!(query.compare(&dated, &undated), Ordering::Less);
    }

    #[test]
    fn test_decode_reports_malformed_document() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            missing: String,
        }

        let doc = document("x", "a", 1);
        let err = doc.decode::<Strict>().unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
        assert!(err.to_string().contains("tasks document x"));
    }

    #[test]
    fn test_to_fields_rejects_non_objects() {
        assert!(to_fields(&json!({"a": 1})).is_ok());
        assert!(matches!(
            to_fields(&"plain string"),
            Err(StoreError::InvalidDocument(_))
        ));
    }
}
