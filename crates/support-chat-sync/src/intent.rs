//! User intents, notices and send outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};
use support_chat_core::{AuthError, ConversationId, StoreError};

/// An action raised by the display layer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Sign in.
    Login { email: String, password: String },
    /// Sign out.
    Logout,
    /// Select a conversation, or clear the selection with `None`.
    SelectConversation {
        #[serde(default)]
        conversation_id: Option<ConversationId>,
    },
    /// Send the given text to the selected conversation.
    Send { text: String },
    /// Send the compose buffer.
    SendCompose,
    /// Replace the compose buffer.
    EditCompose { text: String },
    /// Re-establish subscriptions that failed.
    Refresh,
}

impl fmt::Debug for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login { email, .. } => f
                .debug_struct("Login")
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
            Self::Logout => f.write_str("Logout"),
            Self::SelectConversation { conversation_id } => f
                .debug_struct("SelectConversation")
                .field("conversation_id", conversation_id)
                .finish(),
            Self::Send { text } => f.debug_struct("Send").field("text", text).finish(),
            Self::SendCompose => f.write_str("SendCompose"),
            Self::EditCompose { text } => {
                f.debug_struct("EditCompose").field("text", text).finish()
            }
            Self::Refresh => f.write_str("Refresh"),
        }
    }
}

/// Which subscription a notice concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Conversations,
    Messages,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conversations => f.write_str("conversations"),
            Self::Messages => f.write_str("messages"),
        }
    }
}

/// Non-fatal failure surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LoginFailed(AuthError),
    SubscriptionFailed {
        stream: StreamKind,
        error: StoreError,
    },
    SendFailed {
        conversation_id: ConversationId,
        error: StoreError,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginFailed(e) => write!(f, "Login failed: {e}"),
            Self::SubscriptionFailed { stream, error } => {
                write!(f, "Could not load {stream}: {error}")
            }
            Self::SendFailed {
                conversation_id,
                error,
            } => write!(f, "Message to {conversation_id} not sent: {error}"),
        }
    }
}

/// Why a send was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyText,
    NoSelection,
    NotAuthenticated,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyText => f.write_str("message is empty"),
            Self::NoSelection => f.write_str("no conversation selected"),
            Self::NotAuthenticated => f.write_str("not logged in"),
        }
    }
}

/// Result of a send that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Appended to the conversation captured at dispatch time.
    Sent { conversation_id: ConversationId },
    /// Preconditions not met; nothing was written.
    Skipped(SkipReason),
}
