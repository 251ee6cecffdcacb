//! Collaborator traits for the remote store and authentication provider.

use async_trait::async_trait;
use thiserror::Error;

use crate::{Conversation, ConversationId, Identity, Message, OutgoingMessage, Subscription};

/// Authentication error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Login superseded by a later login or logout")]
    Superseded,
}

/// Remote store error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),
    #[error("Append failed: {0}")]
    AppendFailed(String),
    #[error("Store closed")]
    Closed,
}

/// Push-based, append-only remote data source.
///
/// Subscriptions deliver full snapshots: every item replaces the
/// previous one entirely.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Subscribe to every conversation visible to the session.
    ///
    /// # Errors
    /// Returns error if the subscription cannot be established.
    fn subscribe_conversations(&self) -> Result<Subscription<Vec<Conversation>>, StoreError>;

    /// Subscribe to one conversation's messages, ordered ascending by
    /// timestamp.
    ///
    /// # Errors
    /// Returns error if the subscription cannot be established.
    fn subscribe_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Subscription<Vec<Message>>, StoreError>;

    /// Append a message to a conversation's stream.
    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        message: OutgoingMessage,
    ) -> Result<(), StoreError>;
}

/// Credential exchange with the authentication provider.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange credentials for an identity.
    async fn authenticate(&self, email: &str, secret: &str) -> Result<Identity, AuthError>;

    /// Sign out with the provider.
    async fn deauthenticate(&self);
}
