//! In-memory remote store.

use std::{
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use support_chat_core::{
    Conversation, ConversationId, Message, MessageId, OutgoingMessage, RemoteStore, StoreError,
    Subscription, sort_by_timestamp,
};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;

/// In-memory store implementation.
///
/// Every subscription receives the current snapshot immediately, then a
/// fresh full snapshot after each change. Useful for development and
/// tests. Data is lost on restart.
pub struct MemoryStore {
    conversations: watch::Sender<Vec<Conversation>>,
    messages: RwLock<HashMap<ConversationId, watch::Sender<Vec<Message>>>>,
    active: Arc<AtomicUsize>,
    opened: AtomicUsize,
    available: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conversations: watch::channel(Vec::new()).0,
            messages: RwLock::new(HashMap::new()),
            active: Arc::new(AtomicUsize::new(0)),
            opened: AtomicUsize::new(0),
            available: AtomicBool::new(true),
        }
    }

    /// Add a conversation, replacing any with the same id in place.
    pub fn add_conversation(&self, conversation: Conversation) {
        self.conversations.send_modify(|list| {
            if let Some(existing) = list.iter_mut().find(|c| c.id == conversation.id) {
                *existing = conversation;
            } else {
                list.push(conversation);
            }
        });
    }

    /// Current conversation list.
    #[must_use]
    pub fn conversations(&self) -> Vec<Conversation> {
        self.conversations.borrow().clone()
    }

    /// Write a message as any participant, returning its id.
    ///
    /// # Errors
    /// Returns error if the store is unavailable.
    pub fn post_message(
        &self,
        conversation_id: &ConversationId,
        sender_id: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<MessageId, StoreError> {
        self.insert(
            conversation_id,
            OutgoingMessage {
                sender_id: sender_id.into(),
                text: text.into(),
                timestamp,
            },
        )
    }

    /// Current messages of a conversation, oldest first.
    #[must_use]
    pub fn messages(&self, conversation_id: &ConversationId) -> Vec<Message> {
        self.messages
            .read()
            .ok()
            .and_then(|streams| streams.get(conversation_id).map(|s| s.borrow().clone()))
            .unwrap_or_default()
    }

    /// Number of subscriptions not yet cancelled.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of subscriptions ever opened.
    #[must_use]
    pub fn subscriptions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Simulate an outage: while unavailable, subscribe and append fail.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }

    fn insert(
        &self,
        conversation_id: &ConversationId,
        message: OutgoingMessage,
    ) -> Result<MessageId, StoreError> {
        self.ensure_available()?;

        let id = MessageId::new(Uuid::new_v4().to_string());
        let message = message.into_message(id.clone());

        let mut streams = self
            .messages
            .write()
            .map_err(|e| StoreError::AppendFailed(e.to_string()))?;
        streams
            .entry(conversation_id.clone())
            .or_insert_with(|| watch::channel(Vec::new()).0)
            .send_modify(|list| {
                list.push(message);
                sort_by_timestamp(list);
            });

        Ok(id)
    }

    fn register<T>(&self, rx: watch::Receiver<T>) -> Subscription<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);

        let active = Arc::clone(&self.active);
        Subscription::new(WatchStream::new(rx).map(Ok), move || {
            active.fetch_sub(1, Ordering::SeqCst);
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn subscribe_conversations(&self) -> Result<Subscription<Vec<Conversation>>, StoreError> {
        self.ensure_available()?;
        Ok(self.register(self.conversations.subscribe()))
    }

    fn subscribe_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Subscription<Vec<Message>>, StoreError> {
        self.ensure_available()?;

        let mut streams = self
            .messages
            .write()
            .map_err(|e| StoreError::SubscriptionFailed(e.to_string()))?;
        // Drop entries that hold no messages and have no watchers left.
        streams.retain(|_, tx| tx.receiver_count() > 0 || !tx.borrow().is_empty());
        let rx = streams
            .entry(conversation_id.clone())
            .or_insert_with(|| watch::channel(Vec::new()).0)
            .subscribe();
        drop(streams);

        Ok(self.register(rx))
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        message: OutgoingMessage,
    ) -> Result<(), StoreError> {
        let id = self.insert(conversation_id, message)?;
        tracing::debug!(
            target: "support_chat::store",
            "Appended message {id} to conversation {conversation_id}"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn outgoing(text: &str, secs: i64) -> OutgoingMessage {
        OutgoingMessage {
            sender_id: "support".to_string(),
            text: text.to_string(),
            timestamp: at(secs),
        }
    }

    #[tokio::test]
    async fn conversation_subscription_starts_with_current_snapshot() {
        let store = MemoryStore::new();
        store.add_conversation(Conversation::new("c1"));

        let (_handle, mut stream) = store.subscribe_conversations().unwrap().into_parts();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, vec![Conversation::new("c1")]);

        store.add_conversation(Conversation::new("c2"));
        let second = stream.next().await.unwrap().unwrap();
        let ids: Vec<_> = second.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2"]);
    }

    #[tokio::test]
    async fn add_conversation_replaces_in_place() {
        let store = MemoryStore::new();
        store.add_conversation(Conversation::new("c1"));
        store.add_conversation(Conversation::new("c2"));

        let mut updated = Conversation::new("c1");
        updated.set_metadata("status", serde_json::json!("closed"));
        store.add_conversation(updated.clone());

        let list = store.conversations();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], updated);
    }

    #[tokio::test]
    async fn messages_are_kept_in_timestamp_order() {
        let store = MemoryStore::new();
        let c1 = ConversationId::from("c1");

        assert_ok!(store.append_message(&c1, outgoing("three", 3)).await);
        assert_ok!(store.append_message(&c1, outgoing("one", 1)).await);
        assert_ok!(store.post_message(&c1, "customer", "two", at(2)));

        let texts: Vec<_> = store.messages(&c1).into_iter().map(|m| m.text).collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn unknown_conversation_yields_empty_snapshot() {
        let store = MemoryStore::new();
        let (_handle, mut stream) = store
            .subscribe_messages(&ConversationId::from("nope"))
            .unwrap()
            .into_parts();
        assert!(stream.next().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn message_subscription_sees_appends() {
        let store = MemoryStore::new();
        let c1 = ConversationId::from("c1");
        let (_handle, mut stream) = store.subscribe_messages(&c1).unwrap().into_parts();
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        assert_ok!(store.append_message(&c1, outgoing("hi", 1)).await);
        let snapshot = stream.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].text, "hi");
        assert_eq!(snapshot[0].sender_id, "support");
    }

    #[tokio::test]
    async fn unwatched_empty_conversations_are_forgotten() {
        let store = MemoryStore::new();
        let c1 = ConversationId::from("c1");
        assert_ok!(store.post_message(&c1, "customer", "kept", at(1)));

        for round in 0..5 {
            drop(assert_ok!(store.subscribe_messages(&format!("ghost-{round}").into())));
        }
        let live = assert_ok!(store.subscribe_messages(&"c2".into()));

        let ids: Vec<_> = {
            let streams = store.messages.read().unwrap();
            let mut ids: Vec<_> = streams.keys().map(|id| id.as_str().to_string()).collect();
            ids.sort();
            ids
        };
        assert_eq!(ids, ["c1", "c2"]);
        assert_eq!(store.messages(&c1).len(), 1);
        drop(live);
    }

    #[test]
    fn cancel_releases_registration() {
        let store = MemoryStore::new();
        let conversations = store.subscribe_conversations().unwrap();
        let messages = store.subscribe_messages(&ConversationId::from("c1")).unwrap();
        assert_eq!(store.active_subscriptions(), 2);

        conversations.cancel();
        conversations.cancel();
        assert_eq!(store.active_subscriptions(), 1);

        drop(messages);
        assert_eq!(store.active_subscriptions(), 0);
        assert_eq!(store.subscriptions_opened(), 2);
    }

    #[tokio::test]
    async fn unavailable_store_rejects_everything() {
        let store = MemoryStore::new();
        store.set_available(false);

        assert!(matches!(
            store.subscribe_conversations(),
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.subscribe_messages(&ConversationId::from("c1")).is_err());
        assert_err!(
            store
                .append_message(&ConversationId::from("c1"), outgoing("hi", 1))
                .await
        );
        assert_eq!(store.active_subscriptions(), 0);

        store.set_available(true);
        assert!(store.subscribe_conversations().is_ok());
    }
}
