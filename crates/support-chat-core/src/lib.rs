//! Core abstractions for realtime support chat synchronization.
//!
//! This crate provides the fundamental building blocks:
//! - `Conversation`, `Message`, `Session` - The synchronized data model
//! - `Subscription` - Cancelable stream of full snapshots
//! - `RemoteStore` and `Authenticator` - Collaborator traits
//! - `ClientConfig` - Client-side settings

pub mod config;
pub mod model;
pub mod subscription;
pub mod traits;

pub use config::{ClientConfig, DEFAULT_SENDER_ID};
pub use model::{
    Conversation, ConversationId, Identity, Message, MessageId, OutgoingMessage, Session,
    sort_by_timestamp,
};
pub use subscription::{StreamPhase, Subscription, SubscriptionHandle, SubscriptionId};
pub use traits::{AuthError, Authenticator, RemoteStore, StoreError};
