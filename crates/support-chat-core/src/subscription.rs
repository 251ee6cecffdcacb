//! Cancelable subscriptions yielding full snapshots.

use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::{
    Stream, StreamExt, future,
    stream::BoxStream,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StoreError;

/// Subscription identifier.
pub type SubscriptionId = Uuid;

type CancelHook = Box<dyn FnOnce() + Send>;

/// Lifecycle of a single subscription instance.
///
/// `Idle -> Subscribing -> Streaming -> Cancelled`. Nothing leaves
/// `Cancelled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    /// No subscription requested.
    #[default]
    Idle,
    /// Registered with the store, no snapshot received yet.
    Subscribing,
    /// At least one snapshot applied.
    Streaming,
    /// Cancelled; further snapshots are dropped.
    Cancelled,
}

impl StreamPhase {
    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Subscribing)
                | (Self::Subscribing | Self::Streaming, Self::Streaming | Self::Cancelled)
        )
    }
}

struct Inner {
    id: SubscriptionId,
    cancelled: AtomicBool,
    on_cancel: Mutex<Option<CancelHook>>,
}

impl Inner {
    fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        let hook = self
            .on_cancel
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().take(), |mut hook| hook.take());
        if let Some(hook) = hook {
            hook();
        }
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.cancel() {
            tracing::trace!(subscription = %self.id, "subscription released on drop");
        }
    }
}

/// Cloneable cancellation handle for a [`Subscription`].
#[derive(Clone)]
pub struct SubscriptionHandle {
    inner: Arc<Inner>,
}

impl SubscriptionHandle {
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.inner.id
    }

    /// Cancel the subscription.
    ///
    /// Idempotent. The store's release hook runs synchronously on the
    /// first call only.
    pub fn cancel(&self) {
        if self.inner.cancel() {
            tracing::trace!(subscription = %self.inner.id, "subscription cancelled");
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.inner.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A live registration delivering full snapshots until cancelled.
///
/// Store implementations build one with [`Subscription::new`], passing
/// the hook that releases their side of the registration.
pub struct Subscription<T> {
    handle: SubscriptionHandle,
    stream: BoxStream<'static, Result<T, StoreError>>,
}

impl<T: Send + 'static> Subscription<T> {
    /// Wrap a snapshot stream.
    pub fn new<S, F>(stream: S, on_cancel: F) -> Self
    where
        S: Stream<Item = Result<T, StoreError>> + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let inner = Inner {
            id: Uuid::new_v4(),
            cancelled: AtomicBool::new(false),
            on_cancel: Mutex::new(Some(Box::new(on_cancel))),
        };
        Self {
            handle: SubscriptionHandle {
                inner: Arc::new(inner),
            },
            stream: stream.boxed(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.handle.id()
    }

    #[must_use]
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Cancel without consuming.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Split into the handle and the snapshot stream.
    ///
    /// The stream checks the cancellation flag before every item and ends
    /// once the handle has been cancelled, so nothing is observed after
    /// `cancel()` returns.
    #[must_use]
    pub fn into_parts(self) -> (SubscriptionHandle, BoxStream<'static, Result<T, StoreError>>) {
        let gate = self.handle.clone();
        let stream = self
            .stream
            .take_while(move |_| future::ready(!gate.is_cancelled()))
            .boxed();
        (self.handle, stream)
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use futures::{StreamExt, channel::mpsc};

    use super::*;

    fn counting_subscription(
        released: &Arc<AtomicUsize>,
    ) -> (mpsc::UnboundedSender<Result<u32, StoreError>>, Subscription<u32>) {
        let (tx, rx) = mpsc::unbounded();
        let released = Arc::clone(released);
        let sub = Subscription::new(rx, move || {
            released.fetch_add(1, Ordering::SeqCst);
        });
        (tx, sub)
    }

    #[test]
    fn cancel_is_idempotent() {
        let released = Arc::new(AtomicUsize::new(0));
        let (_tx, sub) = counting_subscription(&released);

        sub.cancel();
        sub.cancel();
        sub.handle().cancel();

        assert!(sub.handle().is_cancelled());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_uncancelled_subscription() {
        let released = Arc::new(AtomicUsize::new(0));
        let (_tx, sub) = counting_subscription(&released);
        let handle = sub.handle();

        drop(sub);
        assert_eq!(released.load(Ordering::SeqCst), 0, "handle still alive");

        drop(handle);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_after_cancel_does_not_release_twice() {
        let released = Arc::new(AtomicUsize::new(0));
        let (_tx, sub) = counting_subscription(&released);
        sub.cancel();
        drop(sub);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stream_yields_until_cancelled() {
        let released = Arc::new(AtomicUsize::new(0));
        let (tx, sub) = counting_subscription(&released);
        let (handle, mut stream) = sub.into_parts();

        tx.unbounded_send(Ok(1)).unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), 1);

        tx.unbounded_send(Ok(2)).unwrap();
        handle.cancel();
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn ids_are_unique() {
        let released = Arc::new(AtomicUsize::new(0));
        let (_a, first) = counting_subscription(&released);
        let (_b, second) = counting_subscription(&released);
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn phase_transitions() {
        use StreamPhase::{Cancelled, Idle, Streaming, Subscribing};

        assert!(Idle.can_advance_to(Subscribing));
        assert!(Subscribing.can_advance_to(Streaming));
        assert!(Subscribing.can_advance_to(Cancelled));
        assert!(Streaming.can_advance_to(Streaming));
        assert!(Streaming.can_advance_to(Cancelled));
        assert!(!Cancelled.can_advance_to(Streaming));
        assert!(!Cancelled.can_advance_to(Subscribing));
        assert!(!Idle.can_advance_to(Streaming));
    }
}
