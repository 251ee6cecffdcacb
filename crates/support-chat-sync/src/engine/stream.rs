//! Forwarding of subscription snapshots into the event loop.

use futures::StreamExt;
use support_chat_core::{StoreError, StreamPhase, Subscription, SubscriptionHandle, SubscriptionId};
use tokio::{sync::mpsc::WeakUnboundedSender, task::JoinHandle};

use super::Event;
use crate::intent::StreamKind;

/// A subscription whose snapshots are being forwarded to the engine.
///
/// Dropping it cancels the subscription and stops the forwarder.
pub(crate) struct ActiveStream {
    handle: SubscriptionHandle,
    task: JoinHandle<()>,
    phase: StreamPhase,
}

impl ActiveStream {
    /// Start forwarding, tagging each snapshot with the subscription id.
    ///
    /// If the store ends the stream on its own, a final
    /// [`Event::StreamEnded`] is sent.
    pub(crate) fn spawn<T, F>(
        kind: StreamKind,
        subscription: Subscription<T>,
        events: &WeakUnboundedSender<Event>,
        wrap: F,
    ) -> Self
    where
        T: Send + 'static,
        F: Fn(SubscriptionId, Result<T, StoreError>) -> Event + Send + 'static,
    {
        let (handle, mut stream) = subscription.into_parts();
        let id = handle.id();
        let events = events.clone();

        let task = tokio::spawn(async move {
            while let Some(next) = stream.next().await {
                let Some(events) = events.upgrade() else {
                    return;
                };
                if events.send(wrap(id, next)).is_err() {
                    return;
                }
            }
            if let Some(events) = events.upgrade() {
                let _ = events.send(Event::StreamEnded {
                    stream: kind,
                    subscription: id,
                });
            }
        });

        let mut stream = Self {
            handle,
            task,
            phase: StreamPhase::Idle,
        };
        stream.advance(StreamPhase::Subscribing);
        stream
    }

    pub(crate) fn id(&self) -> SubscriptionId {
        self.handle.id()
    }

    pub(crate) const fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Record that a snapshot from this stream was applied.
    pub(crate) fn mark_streaming(&mut self) {
        self.advance(StreamPhase::Streaming);
    }

    /// Cancel the subscription. The store side is released before this
    /// returns.
    pub(crate) fn cancel(self) {
        tracing::debug!(
            target: "support_chat::subscriptions",
            "Cancelling subscription {} ({:?})",
            self.handle.id(),
            self.phase,
        );
        drop(self);
    }

    fn advance(&mut self, next: StreamPhase) {
        if self.phase.can_advance_to(next) {
            self.phase = next;
        }
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.advance(StreamPhase::Cancelled);
        self.handle.cancel();
        self.task.abort();
    }
}
