//! Client configuration.

use serde::{Deserialize, Serialize};

/// Sender role stamped on every outbound message.
pub const DEFAULT_SENDER_ID: &str = "support";

/// Default buffer for the notice channel.
const DEFAULT_NOTICE_CAPACITY: usize = 64;

const SENDER_ID_VAR: &str = "SUPPORT_CHAT_SENDER_ID";
const NOTICE_CAPACITY_VAR: &str = "SUPPORT_CHAT_NOTICE_CAPACITY";

/// Settings for a chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Operator role used as `senderId` on outbound messages.
    pub sender_id: String,

    /// Buffered notices per receiver before lagging ones are dropped.
    pub notice_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sender_id: DEFAULT_SENDER_ID.to_string(),
            notice_capacity: DEFAULT_NOTICE_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Load from `SUPPORT_CHAT_*` environment variables.
    ///
    /// Missing or unparsable values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(sender_id) = lookup(SENDER_ID_VAR) {
            let sender_id = sender_id.trim();
            if sender_id.is_empty() {
                tracing::warn!("{SENDER_ID_VAR} is empty, keeping {DEFAULT_SENDER_ID:?}");
            } else {
                config.sender_id = sender_id.to_string();
            }
        }

        if let Some(raw) = lookup(NOTICE_CAPACITY_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => config.notice_capacity = capacity,
                _ => tracing::warn!("Ignoring invalid {NOTICE_CAPACITY_VAR}: {raw:?}"),
            }
        }

        config
    }

    /// Override the sender role.
    #[must_use]
    pub fn with_sender_id(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = sender_id.into();
        self
    }
}
