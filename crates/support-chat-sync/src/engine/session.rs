//! Session controller: authentication state and login generations.

use support_chat_core::{Identity, Session};

/// Holds the session and tags every login attempt.
///
/// A login completion only counts if no later login or logout was issued
/// after it started.
#[derive(Debug, Default)]
pub(crate) struct SessionController {
    session: Session,
    attempt: u64,
}

impl SessionController {
    pub(crate) const fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) const fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Start a login attempt and return its generation.
    pub(crate) fn begin_login(&mut self) -> u64 {
        self.attempt += 1;
        self.attempt
    }

    pub(crate) const fn is_current(&self, attempt: u64) -> bool {
        self.attempt == attempt
    }

    pub(crate) fn establish(&mut self, identity: Identity) {
        self.session.identity = Some(identity);
    }

    /// Drop the identity and invalidate any pending login.
    pub(crate) fn logout(&mut self) -> Option<Identity> {
        self.attempt += 1;
        self.session.identity.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            uid: "agent-1".to_string(),
            email: Some("agent@example.com".to_string()),
        }
    }

    #[test]
    fn later_attempt_supersedes_earlier() {
        let mut controller = SessionController::default();
        let first = controller.begin_login();
        let second = controller.begin_login();

        assert!(!controller.is_current(first));
        assert!(controller.is_current(second));
    }

    #[test]
    fn logout_invalidates_pending_login() {
        let mut controller = SessionController::default();
        let attempt = controller.begin_login();
        assert_eq!(controller.logout(), None);
        assert!(!controller.is_current(attempt));
    }

    #[test]
    fn establish_and_logout() {
        let mut controller = SessionController::default();
        controller.establish(identity());
        assert!(controller.is_authenticated());

        assert_eq!(controller.logout(), Some(identity()));
        assert!(!controller.is_authenticated());
        assert_eq!(controller.session(), &Session::default());
    }
}
