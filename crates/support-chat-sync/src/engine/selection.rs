//! Selected conversation tracker.

use support_chat_core::ConversationId;

/// At most one selected conversation, held by identity.
///
/// The id need not exist in the current conversation list.
#[derive(Debug, Default)]
pub(crate) struct SelectionTracker {
    current: Option<ConversationId>,
}

impl SelectionTracker {
    pub(crate) const fn current(&self) -> Option<&ConversationId> {
        self.current.as_ref()
    }

    /// Replace the selection. Returns whether it changed.
    pub(crate) fn select(&mut self, target: Option<ConversationId>) -> bool {
        if self.current == target {
            return false;
        }
        self.current = target;
        true
    }

    pub(crate) fn clear(&mut self) -> bool {
        self.select(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reselecting_same_id_is_unchanged() {
        let mut tracker = SelectionTracker::default();
        assert!(tracker.select(Some("c1".into())));
        assert!(!tracker.select(Some("c1".into())));
        assert_eq!(tracker.current(), Some(&ConversationId::from("c1")));
    }

    #[test]
    fn switching_and_clearing() {
        let mut tracker = SelectionTracker::default();
        assert!(!tracker.clear());

        tracker.select(Some("c1".into()));
        assert!(tracker.select(Some("c2".into())));
        assert!(tracker.clear());
        assert_eq!(tracker.current(), None);
    }
}
