//! Conversations, messages and the authenticated session.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Store-assigned conversation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Store-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A conversation as cached from the remote store.
///
/// Only `id` is interpreted by the client. Everything else the store
/// keeps on the document is carried along as opaque metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,

    #[serde(default, flatten)]
    pub metadata: HashMap<String, Value>,
}

impl Conversation {
    /// Create a conversation with no metadata.
    #[must_use]
    pub fn new(id: impl Into<ConversationId>) -> Self {
        Self {
            id: id.into(),
            metadata: HashMap::new(),
        }
    }

    /// Create a conversation with metadata.
    #[must_use]
    pub fn with_metadata(id: impl Into<ConversationId>, metadata: HashMap<String, Value>) -> Self {
        Self {
            id: id.into(),
            metadata,
        }
    }

    /// Get a metadata value by key.
    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Set a metadata value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }
}

/// An immutable chat message within one conversation's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Payload appended to a conversation's message stream.
///
/// The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl OutgoingMessage {
    /// Attach a store-assigned id.
    #[must_use]
    pub fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            sender_id: self.sender_id,
            text: self.text,
            timestamp: self.timestamp,
        }
    }
}

/// Identity handed out by the authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The single client session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: Option<Identity>,
}

impl Session {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// Order messages ascending by timestamp.
///
/// The sort is stable, so messages sharing a timestamp keep the order the
/// store delivered them in.
pub fn sort_by_timestamp(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.timestamp);
}
