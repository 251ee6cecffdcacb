//! Handle for driving a running chat client.

use std::sync::Arc;

use support_chat_core::{
    AuthError, Authenticator, ClientConfig, ConversationId, Identity, RemoteStore, StoreError,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::{
    engine::{Command, Event, SyncEngine},
    intent::{Intent, Notice, SendOutcome},
    state::ChatSnapshot,
};

/// Client error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Client has shut down")]
    Closed,
}

/// Cloneable handle to a running chat client.
///
/// Intents are queued to a single event loop task and applied in the
/// order they were issued. State is observed through [`snapshot`],
/// [`watch`] and [`notices`].
///
/// [`snapshot`]: Self::snapshot
/// [`watch`]: Self::watch
/// [`notices`]: Self::notices
#[derive(Clone)]
pub struct ChatClient {
    events: mpsc::UnboundedSender<Event>,
    state: watch::Receiver<ChatSnapshot>,
    notices: broadcast::Sender<Notice>,
}

impl ChatClient {
    /// Start the event loop on the current tokio runtime.
    ///
    /// The loop stops on [`shutdown`](Self::shutdown) or when the last
    /// handle is dropped; either way all subscriptions are cancelled.
    #[must_use]
    pub fn spawn<S, A>(store: Arc<S>, auth: Arc<A>, config: ClientConfig) -> Self
    where
        S: RemoteStore + 'static,
        A: Authenticator + 'static,
    {
        let (events, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ChatSnapshot::default());
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));

        let engine = SyncEngine::new(
            store,
            auth,
            &config,
            events.downgrade(),
            state_tx,
            notices.clone(),
        );
        tokio::spawn(engine.run(rx));

        Self {
            events,
            state,
            notices,
        }
    }

    /// Log in. Subscriptions are armed before this returns `Ok`.
    ///
    /// # Errors
    /// Returns the authentication error, or `Superseded` if a later login
    /// or a logout was issued first.
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Identity, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Login {
            email: email.into(),
            password: password.into(),
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| ClientError::Closed)?
    }

    /// Log out. Local state is torn down before the provider is told.
    ///
    /// # Errors
    /// Returns error if the client has shut down.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Logout { reply: Some(reply) })?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    /// Select a conversation by id.
    ///
    /// # Errors
    /// Returns error if the client has shut down.
    pub fn select_conversation(&self, id: impl Into<ConversationId>) -> Result<(), ClientError> {
        self.command(Command::Select {
            conversation_id: Some(id.into()),
        })
    }

    /// Clear the selection.
    ///
    /// # Errors
    /// Returns error if the client has shut down.
    pub fn clear_selection(&self) -> Result<(), ClientError> {
        self.command(Command::Select {
            conversation_id: None,
        })
    }

    /// Replace the compose buffer.
    ///
    /// # Errors
    /// Returns error if the client has shut down.
    pub fn edit_compose(&self, text: impl Into<String>) -> Result<(), ClientError> {
        self.command(Command::EditCompose { text: text.into() })
    }

    /// Send `text` to the selected conversation.
    ///
    /// Blank text or a missing selection is not an error: the outcome is
    /// `Skipped`. The compose buffer is cleared only once the store
    /// accepted the message.
    ///
    /// # Errors
    /// Returns the store error if the append failed.
    pub async fn send(&self, text: impl Into<String>) -> Result<SendOutcome, ClientError> {
        self.send_inner(Some(text.into())).await
    }

    /// Send the current compose buffer.
    ///
    /// # Errors
    /// Returns the store error if the append failed.
    pub async fn send_compose(&self) -> Result<SendOutcome, ClientError> {
        self.send_inner(None).await
    }

    async fn send_inner(&self, text: Option<String>) -> Result<SendOutcome, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Send {
            text,
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| ClientError::Closed)?
    }

    /// Re-establish subscriptions that failed to open.
    ///
    /// # Errors
    /// Returns error if the client has shut down.
    pub fn refresh(&self) -> Result<(), ClientError> {
        self.command(Command::Refresh)
    }

    /// Queue a UI intent without waiting for its result.
    ///
    /// Failures still surface on [`notices`](Self::notices).
    ///
    /// # Errors
    /// Returns error if the client has shut down.
    pub fn dispatch(&self, intent: Intent) -> Result<(), ClientError> {
        self.command(intent.into())
    }

    /// Wait until every previously issued intent has been applied.
    ///
    /// # Errors
    /// Returns error if the client has shut down.
    pub async fn flush(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Flush { reply })?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    /// Stop the event loop, cancelling all subscriptions.
    ///
    /// # Errors
    /// Returns error if the client has already shut down.
    pub fn shutdown(&self) -> Result<(), ClientError> {
        self.command(Command::Shutdown)
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ChatSnapshot> {
        self.state.clone()
    }

    /// Wait for a state matching `predicate`.
    ///
    /// # Errors
    /// Returns error if the client shuts down first.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ChatSnapshot) -> bool,
    ) -> Result<ChatSnapshot, ClientError> {
        let mut state = self.state.clone();
        let snapshot = state
            .wait_for(predicate)
            .await
            .map_err(|_| ClientError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Subscribe to user-facing failure notices.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    fn command(&self, command: Command) -> Result<(), ClientError> {
        self.events
            .send(Event::Command(command))
            .map_err(|_| ClientError::Closed)
    }
}
