//! Live query subscriptions
//!
//! A [`Subscription`] is the consumer side of a live query: a stream of full
//! [`Snapshot`]s plus a cancel handle. The producer side ([`SnapshotSink`]) is
//! owned by the backend's background task.
//!
//! ```text
//! backend task ──deliver()──> unbounded channel ──> Subscription (Stream)
//!      ▲                                                 │
//!      └──────────── CancellationToken ◄── cancel / drop ┘
//! ```
//!
//! Dropping the subscription cancels it, so a consumer that goes away (an SSE
//! client disconnecting, a test finishing) always releases the backend task.

use crate::store::{Document, StoreResult};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};

/// Full result set of a live query at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Delivery counter, starting at 1 for the initial result set
    pub version: u64,

    /// Matching documents in query order
    pub documents: Vec<Document>,
}

/// Handle that stops a subscription from elsewhere
#[derive(Debug, Clone)]
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    /// Stops delivery and releases the backend task
    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Consumer side of a live query
pub struct Subscription {
    snapshots: UnboundedReceiverStream<StoreResult<Snapshot>>,
    token: CancellationToken,
    _guard: DropGuard,
}

impl Subscription {
    /// Creates a connected sink/subscription pair
    pub fn channel() -> (SnapshotSink, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let sink = SnapshotSink {
            tx,
            token: token.clone(),
            version: 0,
        };
        let subscription = Subscription {
            snapshots: UnboundedReceiverStream::new(rx),
            _guard: token.clone().drop_guard(),
            token,
        };

        (sink, subscription)
    }

    /// Returns a handle that can cancel this subscription
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.token.clone())
    }

    /// Cancels the subscription
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the next snapshot
    ///
    /// Returns `None` once the subscription is cancelled or the backend task
    /// has stopped.
    pub async fn next_snapshot(&mut self) -> Option<StoreResult<Snapshot>> {
        futures::StreamExt::next(self).await
    }
}

impl Stream for Subscription {
    type Item = StoreResult<Snapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.token.is_cancelled() {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.snapshots).poll_next(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Producer side of a live query
pub struct SnapshotSink {
    tx: mpsc::UnboundedSender<StoreResult<Snapshot>>,
    token: CancellationToken,
    version: u64,
}

impl SnapshotSink {
    /// Sends the next result set (or a query failure) to the consumer
    ///
    /// Returns `false` when the subscription is gone and the producer should
    /// stop.
    pub fn deliver(&mut self, result: StoreResult<Vec<Document>>) -> bool {
        if !self.is_open() {
            return false;
        }

        let item = result.map(|documents| {
            self.version += 1;
            Snapshot {
                version: self.version,
                documents,
            }
        });

        self.tx.send(item).is_ok()
    }

    /// Whether the consumer still wants snapshots
    pub fn is_open(&self) -> bool {
        !self.token.is_cancelled() && !self.tx.is_closed()
    }

    /// Resolves once the subscription is cancelled or dropped
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Collection, DocumentId};

    fn doc(id: &str) -> Document {
        Document {
            collection: Collection::Tasks,
            id: DocumentId::new(id),
            fields: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_snapshots_are_versioned_in_order() {
        let (mut sink, mut subscription) = Subscription::channel();

        assert!(sink.deliver(Ok(vec![doc("a")])));
        assert!(sink.deliver(Ok(vec![doc("b"), doc("a")])));

        let first = subscription.next_snapshot().await.unwrap().unwrap();
        let second = subscription.next_snapshot().await.unwrap().unwrap();

        assert_eq!(first.version, 1);
        assert_eq!(first.documents.len(), 1);
        assert_eq!(second.version, 2);
        assert_eq!(second.documents.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_stops_delivery() {
        let (mut sink, mut subscription) = Subscription::channel();
        let handle = subscription.cancel_handle();

        assert!(sink.deliver(Ok(vec![])));
        handle.cancel();

        assert!(subscription.is_cancelled());
        assert!(!sink.deliver(Ok(vec![])));
        assert!(subscription.next_snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_cancels_producer() {
        let (sink, subscription) = Subscription::channel();
        assert!(sink.is_open());

        drop(subscription);

        assert!(!sink.is_open());
        // Resolves immediately because the drop guard fired
        sink.cancelled().await;
    }

    #[tokio::test]
    async fn test_stream_ends_when_producer_stops() {
        let (mut sink, mut subscription) = Subscription::channel();
        sink.deliver(Ok(vec![doc("a")]));
        drop(sink);

        assert!(subscription.next_snapshot().await.is_some());
        assert!(subscription.next_snapshot().await.is_none());
    }
}
