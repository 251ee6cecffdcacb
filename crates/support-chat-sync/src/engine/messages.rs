//! Message stream synchronizer for the selected conversation.

use support_chat_core::{
    ConversationId, Message, RemoteStore, StoreError, SubscriptionId, sort_by_timestamp,
};
use tokio::sync::mpsc::WeakUnboundedSender;

use super::{Event, stream::ActiveStream};
use crate::{intent::StreamKind, state::StreamStatus};

struct Bound {
    conversation_id: ConversationId,
    stream: ActiveStream,
}

/// Messages of exactly one conversation, oldest first.
///
/// Only the most recent subscription may write the list; snapshots
/// tagged with any other subscription id are dropped.
#[derive(Default)]
pub(crate) struct MessageStreamSync {
    list: Vec<Message>,
    /// Conversation `list` belongs to. Survives a stream that ended.
    owner: Option<ConversationId>,
    bound: Option<Bound>,
}

impl MessageStreamSync {
    pub(crate) fn list(&self) -> &[Message] {
        &self.list
    }

    /// Whether the live subscription matches `target`.
    ///
    /// `None` matches when no subscription is live.
    pub(crate) fn is_bound_to(&self, target: Option<&ConversationId>) -> bool {
        self.bound.as_ref().map(|b| &b.conversation_id) == target
    }

    /// Tear down the current subscription, then subscribe to `target` if
    /// given. The list is cleared unless it already belongs to `target`.
    pub(crate) fn retarget<S>(
        &mut self,
        target: Option<&ConversationId>,
        store: &S,
        events: &WeakUnboundedSender<Event>,
    ) -> Result<(), StoreError>
    where
        S: RemoteStore + ?Sized,
    {
        self.cancel();
        if self.owner.as_ref() != target {
            self.list.clear();
            self.owner = target.cloned();
        }

        let Some(conversation_id) = target else {
            return Ok(());
        };

        let subscription = store.subscribe_messages(conversation_id)?;
        let stream = ActiveStream::spawn(
            StreamKind::Messages,
            subscription,
            events,
            |subscription, snapshot| Event::Messages {
                subscription,
                snapshot,
            },
        );
        tracing::debug!(
            target: "support_chat::messages",
            "Subscribed to messages of {conversation_id} ({})",
            stream.id(),
        );
        self.bound = Some(Bound {
            conversation_id: conversation_id.clone(),
            stream,
        });
        Ok(())
    }

    /// Cancel unconditionally and clear the list.
    pub(crate) fn disarm(&mut self) {
        self.cancel();
        self.list.clear();
        self.owner = None;
    }

    /// Forget the live subscription if `subscription` is it, keeping the
    /// last list. Returns whether it was live.
    pub(crate) fn end(&mut self, subscription: SubscriptionId) -> bool {
        if self
            .bound
            .as_ref()
            .is_some_and(|b| b.stream.id() == subscription)
        {
            self.cancel();
            true
        } else {
            false
        }
    }

    /// Apply a snapshot if it belongs to the live subscription.
    ///
    /// Returns `Ok(false)` for a stale snapshot, `Err` when the live
    /// subscription reported a failure. Failures leave the list as is.
    pub(crate) fn apply(
        &mut self,
        subscription: SubscriptionId,
        snapshot: Result<Vec<Message>, StoreError>,
    ) -> Result<bool, StoreError> {
        let Some(bound) = self
            .bound
            .as_mut()
            .filter(|b| b.stream.id() == subscription)
        else {
            tracing::debug!(
                target: "support_chat::messages",
                "Discarding snapshot from stale subscription {subscription}"
            );
            return Ok(false);
        };

        let mut messages = snapshot?;
        sort_by_timestamp(&mut messages);
        self.list = messages;
        bound.stream.mark_streaming();
        Ok(true)
    }

    pub(crate) fn status(&self) -> Option<StreamStatus> {
        self.bound.as_ref().map(|b| StreamStatus {
            id: b.stream.id(),
            phase: b.stream.phase(),
            conversation_id: Some(b.conversation_id.clone()),
        })
    }

    fn cancel(&mut self) {
        if let Some(bound) = self.bound.take() {
            bound.stream.cancel();
        }
    }
}
