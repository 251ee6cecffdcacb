//! Published client state.

use serde::Serialize;
use support_chat_core::{
    Conversation, ConversationId, Message, Session, StreamPhase, SubscriptionId,
};

/// Full client state, republished after every change.
///
/// This is everything a display layer needs; rendering is a pure
/// function of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatSnapshot {
    pub session: Session,
    pub conversations: Vec<Conversation>,
    pub selected_conversation: Option<ConversationId>,
    pub messages: Vec<Message>,
    pub compose: String,
    /// Sender role stamped on outbound messages.
    pub sender_id: String,
    pub sync: SyncStatus,
}

impl ChatSnapshot {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// The selected conversation, if it is in the current list.
    #[must_use]
    pub fn selected(&self) -> Option<&Conversation> {
        let id = self.selected_conversation.as_ref()?;
        self.conversations.iter().find(|c| &c.id == id)
    }

    /// Whether a send of the compose buffer would be dispatched.
    #[must_use]
    pub fn can_send(&self) -> bool {
        self.is_authenticated()
            && self.selected_conversation.is_some()
            && !self.compose.trim().is_empty()
    }

    /// Whether `message` was written by the operator role.
    #[must_use]
    pub fn is_operator_message(&self, message: &Message) -> bool {
        message.sender_id == self.sender_id
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        usize::from(self.sync.conversation_stream.is_some())
            + usize::from(self.sync.message_stream.is_some())
    }
}

/// Subscription bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub conversation_stream: Option<StreamStatus>,
    pub message_stream: Option<StreamStatus>,
    pub sends_in_flight: usize,
}

/// One live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub id: SubscriptionId,
    pub phase: StreamPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use support_chat_core::{Identity, MessageId};

    use super::*;

    fn logged_in() -> ChatSnapshot {
        ChatSnapshot {
            session: Session {
                identity: Some(Identity {
                    uid: "u1".to_string(),
                    email: None,
                }),
            },
            conversations: vec![Conversation::new("c1"), Conversation::new("c2")],
            sender_id: "support".to_string(),
            ..ChatSnapshot::default()
        }
    }

    #[test]
    fn selected_resolves_against_list() {
        let mut snapshot = logged_in();
        assert!(snapshot.selected().is_none());

        snapshot.selected_conversation = Some("c2".into());
        assert_eq!(snapshot.selected().unwrap().id.as_str(), "c2");

        snapshot.selected_conversation = Some("gone".into());
        assert!(snapshot.selected().is_none());
    }

    #[test]
    fn can_send_requires_text_and_selection() {
        let mut snapshot = logged_in();
        snapshot.compose = "hello".to_string();
        assert!(!snapshot.can_send());

        snapshot.selected_conversation = Some("c1".into());
        assert!(snapshot.can_send());

        snapshot.compose = "   ".to_string();
        assert!(!snapshot.can_send());
    }

    #[test]
    fn operator_messages_are_recognised() {
        let snapshot = logged_in();
        let mut message = Message {
            id: MessageId::from("m1"),
            sender_id: "support".to_string(),
            text: "hi".to_string(),
            timestamp: Utc::now(),
        };
        assert!(snapshot.is_operator_message(&message));

        message.sender_id = "customer-42".to_string();
        assert!(!snapshot.is_operator_message(&message));
    }
}
