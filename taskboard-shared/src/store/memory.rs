//! In-process document store
//!
//! Collections live in memory behind a `tokio::sync::RwLock`; every insert
//! and delete is announced on a broadcast channel that drives live
//! subscriptions. Cloning a `MemoryStore` yields another handle to the same
//! data.
//!
//! Used by the development server (`STORE_BACKEND=memory`) and by tests.

use crate::store::{
    Collection, Document, DocumentId, DocumentStore, Fields, Query, StoreResult, Subscription,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;

/// Capacity of the change broadcast; a lagging subscriber re-queries
const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Kind of change applied to a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Deleted,
}

/// Change notification broadcast to subscribers
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub id: DocumentId,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    /// Insertion order, breaks timestamp ties (newer wins)
    seq: u64,
    document: Document,
}

#[derive(Debug, Default)]
struct Collections {
    next_seq: u64,
    documents: HashMap<Collection, HashMap<DocumentId, StoredDocument>>,
}

impl Collections {
    fn run(&self, query: &Query) -> Vec<Document> {
        let Some(documents) = self.documents.get(&query.collection) else {
            return Vec::new();
        };

        let mut matching: Vec<&StoredDocument> = documents
            .values()
            .filter(|stored| query.matches(&stored.document))
            .collect();

        matching.sort_by(|a, b| {
            query
                .compare(&a.document, &b.document)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        matching
            .into_iter()
            .map(|stored| stored.document.clone())
            .collect()
    }
}

/// In-memory [`DocumentStore`]
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(RwLock::new(Collections::default())),
            changes,
        }
    }

    /// Subscribes to raw change notifications
    pub fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    fn announce(&self, collection: Collection, id: DocumentId, kind: ChangeKind) {
        // No receivers just means nobody is subscribed right now
        let _ = self.changes.send(ChangeEvent {
            collection,
            id,
            kind,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, collection: Collection, fields: Fields) -> StoreResult<Document> {
        let document = Document {
            collection,
            id: DocumentId::generate(),
            fields,
        };

        {
            let mut inner = self.inner.write().await;
            inner.next_seq += 1;
            let seq = inner.next_seq;
            inner.documents.entry(collection).or_default().insert(
                document.id.clone(),
                StoredDocument {
                    seq,
                    document: document.clone(),
                },
            );
        }

        tracing::debug!(collection = %collection, id = %document.id, "Inserted document");
        self.announce(collection, document.id.clone(), ChangeKind::Inserted);

        Ok(document)
    }

    async fn get(&self, collection: Collection, id: &DocumentId) -> StoreResult<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .documents
            .get(&collection)
            .and_then(|documents| documents.get(id))
            .map(|stored| stored.document.clone()))
    }

    async fn delete(&self, collection: Collection, id: &DocumentId) -> StoreResult<bool> {
        let removed = {
            let mut inner = self.inner.write().await;
            inner
                .documents
                .get_mut(&collection)
                .and_then(|documents| documents.remove(id))
                .is_some()
        };

        if removed {
            tracing::debug!(collection = %collection, id = %id, "Deleted document");
            self.announce(collection, id.clone(), ChangeKind::Deleted);
        }

        Ok(removed)
    }

    async fn count(&self, collection: Collection) -> StoreResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .documents
            .get(&collection)
            .map(|documents| documents.len() as u64)
            .unwrap_or(0))
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let inner = self.inner.read().await;
        Ok(inner.run(query))
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        let (mut sink, subscription) = Subscription::channel();

        // Listen before the first read so no change slips between the two
        let mut changes = self.changes.subscribe();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tracing::debug!(collection = %query.collection, "Live query started");

            'deliver: loop {
                let documents = inner.read().await.run(&query);
                if !sink.deliver(Ok(documents)) {
                    break;
                }

                loop {
                    tokio::select! {
                        _ = sink.cancelled() => break 'deliver,
                        event = changes.recv() => match event {
                            Ok(change) if change.collection == query.collection => continue 'deliver,
                            Ok(_) => continue,
                            // Missed some changes; the next snapshot covers them
                            Err(RecvError::Lagged(_)) => continue 'deliver,
                            Err(RecvError::Closed) => break 'deliver,
                        },
                    }
                }
            }

            tracing::debug!(collection = %query.collection, "Live query stopped");
        });

        Ok(subscription)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Direction, StoreTimestamp};
    use serde_json::json;
    use std::time::Duration;

    fn task_fields(user: &str, content: &str, seconds: i64) -> Fields {
        json!({
            "task": content,
            "user": user,
            "created": StoreTimestamp { seconds, nanoseconds: 0 },
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn owner_query(user: &str) -> Query {
        Query::collection(Collection::Tasks)
            .where_eq("user", user)
            .order_by("created", Direction::Descending)
    }

    async fn next(subscription: &mut Subscription) -> Vec<String> {
        let snapshot = tokio::time::timeout(Duration::from_secs(1), subscription.next_snapshot())
            .await
            .expect("snapshot should arrive")
            .expect("subscription should be open")
            .expect("query should succeed");
        snapshot
            .documents
            .into_iter()
            .map(|d| d.fields["task"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_insert_get_delete() {
        let store = MemoryStore::new();
        let doc = store
            .insert(Collection::Tasks, task_fields("a@example.com", "one", 1))
            .await
            .unwrap();

        let found = store.get(Collection::Tasks, &doc.id).await.unwrap();
        assert_eq!(found, Some(doc.clone()));

        // Same id in another collection is a different document
        assert!(store.get(Collection::Comments, &doc.id).await.unwrap().is_none());

        assert!(store.delete(Collection::Tasks, &doc.id).await.unwrap());
        assert!(!store.delete(Collection::Tasks, &doc.id).await.unwrap());
        assert!(store.get(Collection::Tasks, &doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_count() {
        let store = MemoryStore::new();
        assert_eq!(store.count(Collection::Tasks).await.unwrap(), 0);

        store.insert(Collection::Tasks, task_fields("a", "one", 1)).await.unwrap();
        store.insert(Collection::Tasks, task_fields("b", "two", 2)).await.unwrap();

        assert_eq!(store.count(Collection::Tasks).await.unwrap(), 2);
        assert_eq!(store.count(Collection::Comments).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_filters_and_orders_newest_first() {
        let store = MemoryStore::new();
        store.insert(Collection::Tasks, task_fields("a", "old", 10)).await.unwrap();
        store.insert(Collection::Tasks, task_fields("b", "other", 20)).await.unwrap();
        store.insert(Collection::Tasks, task_fields("a", "new", 30)).await.unwrap();

        let docs = store.query(&owner_query("a")).await.unwrap();
        let contents: Vec<&str> = docs.iter().map(|d| d.fields["task"].as_str().unwrap()).collect();

        assert_eq!(contents, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_equal_timestamps_prefer_latest_insert() {
        let store = MemoryStore::new();
        store.insert(Collection::Tasks, task_fields("a", "first", 10)).await.unwrap();
        store.insert(Collection::Tasks, task_fields("a", "second", 10)).await.unwrap();

        let docs = store.query(&owner_query("a")).await.unwrap();
        assert_eq!(docs[0].fields["task"], "second");
    }

    #[tokio::test]
    async fn test_subscription_redelivers_on_every_change() {
        let store = MemoryStore::new();
        store.insert(Collection::Tasks, task_fields("a", "one", 1)).await.unwrap();

        let mut subscription = store.subscribe(owner_query("a")).await.unwrap();
        assert_eq!(next(&mut subscription).await, vec!["one"]);

        let two = store.insert(Collection::Tasks, task_fields("a", "two", 2)).await.unwrap();
        assert_eq!(next(&mut subscription).await, vec!["two", "one"]);

        store.delete(Collection::Tasks, &two.id).await.unwrap();
        assert_eq!(next(&mut subscription).await, vec!["one"]);
    }

    #[tokio::test]
    async fn test_subscription_ignores_other_collections() {
        let store = MemoryStore::new();
        let mut subscription = store.subscribe(owner_query("a")).await.unwrap();
        assert!(next(&mut subscription).await.is_empty());

        store
            .insert(Collection::Comments, json!({"comment": "hi"}).as_object().cloned().unwrap())
            .await
            .unwrap();
        store.insert(Collection::Tasks, task_fields("a", "mine", 1)).await.unwrap();

        // The comment insert produced no snapshot; the next one is the task
        assert_eq!(next(&mut subscription).await, vec!["mine"]);
    }

    #[tokio::test]
    async fn test_cancelled_subscription_stops() {
        let store = MemoryStore::new();
        let mut subscription = store.subscribe(owner_query("a")).await.unwrap();
        next(&mut subscription).await;

        subscription.cancel_handle().cancel();
        store.insert(Collection::Tasks, task_fields("a", "late", 1)).await.unwrap();

        assert!(subscription.next_snapshot().await.is_none());
    }
}
