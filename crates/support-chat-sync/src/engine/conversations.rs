//! Conversation list synchronizer.

use support_chat_core::{Conversation, RemoteStore, StoreError, SubscriptionId};
use tokio::sync::mpsc::WeakUnboundedSender;

use super::{Event, stream::ActiveStream};
use crate::{intent::StreamKind, state::StreamStatus};

/// Live conversation list, fully replaced by every snapshot.
#[derive(Default)]
pub(crate) struct ConversationListSync {
    list: Vec<Conversation>,
    stream: Option<ActiveStream>,
}

impl ConversationListSync {
    pub(crate) fn list(&self) -> &[Conversation] {
        &self.list
    }

    pub(crate) const fn is_armed(&self) -> bool {
        self.stream.is_some()
    }

    /// Replace any existing subscription with a fresh one.
    ///
    /// On failure the previous list is kept.
    pub(crate) fn arm<S>(
        &mut self,
        store: &S,
        events: &WeakUnboundedSender<Event>,
    ) -> Result<(), StoreError>
    where
        S: RemoteStore + ?Sized,
    {
        self.cancel();

        let subscription = store.subscribe_conversations()?;
        let stream = ActiveStream::spawn(
            StreamKind::Conversations,
            subscription,
            events,
            |subscription, snapshot| Event::Conversations {
                subscription,
                snapshot,
            },
        );
        tracing::debug!(
            target: "support_chat::conversations",
            "Subscribed to conversations ({})",
            stream.id(),
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Cancel the subscription and forget the list.
    pub(crate) fn disarm(&mut self) {
        self.cancel();
        self.list.clear();
    }

    /// Apply a snapshot if it belongs to the live subscription.
    ///
    /// Returns `Ok(false)` for a stale snapshot, `Err` when the live
    /// subscription reported a failure. Failures leave the list as is.
    pub(crate) fn apply(
        &mut self,
        subscription: SubscriptionId,
        snapshot: Result<Vec<Conversation>, StoreError>,
    ) -> Result<bool, StoreError> {
        let Some(stream) = self.stream.as_mut().filter(|s| s.id() == subscription) else {
            tracing::debug!(
                target: "support_chat::conversations",
                "Discarding snapshot from stale subscription {subscription}"
            );
            return Ok(false);
        };

        self.list = snapshot?;
        stream.mark_streaming();
        Ok(true)
    }

    /// Forget the live subscription if `subscription` is it, keeping the
    /// last list. Returns whether it was live.
    pub(crate) fn end(&mut self, subscription: SubscriptionId) -> bool {
        if self.stream.as_ref().is_some_and(|s| s.id() == subscription) {
            self.cancel();
            true
        } else {
            false
        }
    }

    pub(crate) fn status(&self) -> Option<StreamStatus> {
        self.stream.as_ref().map(|s| StreamStatus {
            id: s.id(),
            phase: s.phase(),
            conversation_id: None,
        })
    }

    fn cancel(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.cancel();
        }
    }
}
