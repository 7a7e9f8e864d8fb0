//! Typed live listings
//!
//! [`Live<T>`] wraps a store [`Subscription`] and decodes every snapshot
//! into models. Documents that fail to decode are logged and left out of
//! the listing rather than failing the whole snapshot.

use futures::Stream;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::store::{CancelHandle, Document, FromDocument, Snapshot, StoreResult, Subscription};

/// One decoded snapshot of a live listing
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSnapshot<T> {
    pub version: u64,
    pub items: Vec<T>,
}

/// Decodes documents, skipping the malformed ones
pub fn decode_all<T: FromDocument>(documents: Vec<Document>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|document| match T::from_document(document) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed document");
                None
            }
        })
        .collect()
}

/// Live listing of `T`
///
/// Yields the current listing first, then a complete new listing after
/// every change. Dropping it stops the underlying subscription.
pub struct Live<T> {
    subscription: Subscription,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromDocument> Live<T> {
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            _marker: PhantomData,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.subscription.cancel_handle()
    }

    /// Waits for the next listing; `None` once cancelled or closed
    pub async fn next_listing(&mut self) -> Option<StoreResult<LiveSnapshot<T>>> {
        futures::StreamExt::next(self).await
    }
}

fn decode_snapshot<T: FromDocument>(snapshot: Snapshot) -> LiveSnapshot<T> {
    LiveSnapshot {
        version: snapshot.version,
        items: decode_all(snapshot.documents),
    }
}

impl<T: FromDocument> Stream for Live<T> {
    type Item = StoreResult<LiveSnapshot<T>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.subscription)
            .poll_next(cx)
            .map(|item| item.map(|result| result.map(decode_snapshot::<T>)))
    }
}

impl<T> std::fmt::Debug for Live<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Live").field("subscription", &self.subscription).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use crate::store::{Collection, DocumentId};
    use serde_json::json;

    fn task_document(id: &str, content: Option<&str>) -> Document {
        let mut fields = json!({
            "created": {"seconds": 1, "nanoseconds": 0},
            "user": "ana@example.com",
            "name": "Ana",
            "public": false,
        })
        .as_object()
        .cloned()
        .unwrap();
        if let Some(content) = content {
            fields.insert("task".to_string(), json!(content));
        }
        Document {
            collection: Collection::Tasks,
            id: DocumentId::new(id),
            fields,
        }
    }

    #[test]
    fn test_decode_all_skips_malformed() {
        let tasks: Vec<Task> = decode_all(vec![
            task_document("good", Some("Buy milk")),
            task_document("bad", None),
        ]);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id.as_str(), "good");
    }

    #[tokio::test]
    async fn test_live_decodes_snapshots() {
        let (mut sink, subscription) = Subscription::channel();
        let mut live: Live<Task> = Live::new(subscription);

        sink.deliver(Ok(vec![task_document("t1", Some("Buy milk"))]));

        let listing = live.next_listing().await.unwrap().unwrap();
        assert_eq!(listing.version, 1);
        assert_eq!(listing.items[0].content, "Buy milk");

        live.cancel_handle().cancel();
        assert!(live.next_listing().await.is_none());
    }
}
