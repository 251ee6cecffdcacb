//! Authenticators.

use std::{
    collections::HashMap,
    sync::{
        RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use support_chat_core::{AuthError, Authenticator, Identity};
use uuid::Uuid;

struct Account {
    secret: String,
    identity: Identity,
}

/// Authenticator backed by a table of registered accounts.
pub struct MemoryAuthenticator {
    accounts: RwLock<HashMap<String, Account>>,
    online: AtomicBool,
}

impl MemoryAuthenticator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }

    /// Register an account and return its identity.
    pub fn register(&self, email: impl Into<String>, secret: impl Into<String>) -> Identity {
        let email = email.into();
        let identity = Identity {
            uid: Uuid::new_v4().to_string(),
            email: Some(email.clone()),
        };
        let account = Account {
            secret: secret.into(),
            identity: identity.clone(),
        };
        match self.accounts.write() {
            Ok(mut accounts) => {
                accounts.insert(email, account);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(email, account);
            }
        }
        identity
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with_account(self, email: impl Into<String>, secret: impl Into<String>) -> Self {
        self.register(email, secret);
        self
    }

    /// Simulate loss of connectivity to the provider.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for MemoryAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authenticator for MemoryAuthenticator {
    async fn authenticate(&self, email: &str, secret: &str) -> Result<Identity, AuthError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(AuthError::Network("authentication provider unreachable".to_string()));
        }

        let accounts = self
            .accounts
            .read()
            .map_err(|e| AuthError::Network(e.to_string()))?;

        match accounts.get(email) {
            Some(account) if account.secret == secret => Ok(account.identity.clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn deauthenticate(&self) {
        tracing::debug!(target: "support_chat::auth", "Signed out");
    }
}

/// Authenticator that accepts any credentials.
///
/// For deployments without sign-in: the session is always authenticated
/// as the same identity.
#[derive(Debug, Clone)]
pub struct OpenAuthenticator {
    identity: Identity,
}

impl OpenAuthenticator {
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            identity: Identity {
                uid: uid.into(),
                email: None,
            },
        }
    }
}

impl Default for OpenAuthenticator {
    fn default() -> Self {
        Self::new("anonymous")
    }
}

#[async_trait]
impl Authenticator for OpenAuthenticator {
    async fn authenticate(&self, _email: &str, _secret: &str) -> Result<Identity, AuthError> {
        Ok(self.identity.clone())
    }

    async fn deauthenticate(&self) {}
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[tokio::test]
    async fn registered_account_authenticates() {
        let auth = MemoryAuthenticator::new();
        let identity = auth.register("agent@example.com", "hunter2");

        let result = assert_ok!(auth.authenticate("agent@example.com", "hunter2").await);
        assert_eq!(result, identity);
        assert_eq!(result.email.as_deref(), Some("agent@example.com"));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let auth = MemoryAuthenticator::new().with_account("agent@example.com", "hunter2");

        let err = assert_err!(auth.authenticate("agent@example.com", "nope").await);
        assert_eq!(err, AuthError::InvalidCredentials);

        let err = assert_err!(auth.authenticate("someone@example.com", "hunter2").await);
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn offline_provider_reports_network_error() {
        let auth = MemoryAuthenticator::new().with_account("agent@example.com", "hunter2");
        auth.set_online(false);

        let err = assert_err!(auth.authenticate("agent@example.com", "hunter2").await);
        assert!(matches!(err, AuthError::Network(_)));
    }

    #[tokio::test]
    async fn open_authenticator_accepts_anything() {
        let auth = OpenAuthenticator::default();
        let identity = assert_ok!(auth.authenticate("", "").await);
        assert_eq!(identity.uid, "anonymous");
    }
}
