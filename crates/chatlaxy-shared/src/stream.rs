//! Push-style change feeds.
//!
//! Backends hand out a [`Subscription`] for every watched document or
//! query. The producing side holds the matching [`SubscriptionSender`]
//! and pushes fresh snapshots through it until the consumer cancels or
//! drops the subscription. Channels are unbounded so a producer can
//! always complete a fanout without waiting on consumers, which keeps
//! store writes from deadlocking against a consumer that is itself in
//! the middle of a write.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

/// Shared cancellation flag between a subscription and its sender.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the subscription as cancelled. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Consumer half of a change feed.
///
/// Dropping the subscription cancels it, so a consumer that simply goes
/// away stops its producer on the next push attempt.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    cancel: CancelToken,
}

impl<T> Subscription<T> {
    /// Waits for the next pushed value.
    ///
    /// Returns `None` once the feed is cancelled and drained, or when
    /// the producer side has gone away.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Detaches from the feed. Idempotent.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

/// Producer half of a change feed.
#[derive(Clone, Debug)]
pub struct SubscriptionSender<T> {
    tx: mpsc::UnboundedSender<T>,
    cancel: CancelToken,
}

impl<T> SubscriptionSender<T> {
    /// Pushes a value to the consumer.
    ///
    /// Returns `false` once the consumer has cancelled or dropped the
    /// subscription; producers use that as the signal to forget the
    /// sender.
    pub fn send(&self, value: T) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(value).is_ok()
    }

    /// Whether the consumer is still attached.
    pub fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.tx.is_closed()
    }
}

/// Creates a linked subscription pair.
pub fn channel<T>() -> (SubscriptionSender<T>, Subscription<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancelToken::new();
    let sender = SubscriptionSender {
        tx,
        cancel: cancel.clone(),
    };
    let subscription = Subscription { rx, cancel };
    (sender, subscription)
}
