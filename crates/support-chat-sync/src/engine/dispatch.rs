//! Outbound message dispatcher and compose buffer.

use chrono::Utc;
use support_chat_core::{ConversationId, OutgoingMessage, StoreError};

use crate::intent::SkipReason;

/// Owns the compose buffer and builds outbound messages.
#[derive(Debug)]
pub(crate) struct OutboundDispatcher {
    sender_id: String,
    compose: String,
    in_flight: usize,
}

impl OutboundDispatcher {
    pub(crate) const fn new(sender_id: String) -> Self {
        Self {
            sender_id,
            compose: String::new(),
            in_flight: 0,
        }
    }

    pub(crate) fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub(crate) fn compose(&self) -> &str {
        &self.compose
    }

    pub(crate) fn edit(&mut self, text: String) {
        self.compose = text;
    }

    pub(crate) const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Check preconditions and build the message.
    ///
    /// The target conversation is captured here, so a later selection
    /// change cannot retarget an append already in flight.
    pub(crate) fn prepare(
        &self,
        text: &str,
        selection: Option<&ConversationId>,
        authenticated: bool,
    ) -> Result<(ConversationId, OutgoingMessage), SkipReason> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SkipReason::EmptyText);
        }
        let Some(conversation_id) = selection else {
            return Err(SkipReason::NoSelection);
        };
        if !authenticated {
            return Err(SkipReason::NotAuthenticated);
        }

        let message = OutgoingMessage {
            sender_id: self.sender_id.clone(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        Ok((conversation_id.clone(), message))
    }

    pub(crate) const fn begin(&mut self) {
        self.in_flight += 1;
    }

    /// Record an append result. Only success clears the compose buffer.
    pub(crate) fn finish(&mut self, result: &Result<(), StoreError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if result.is_ok() {
            self.compose.clear();
        }
    }
}
