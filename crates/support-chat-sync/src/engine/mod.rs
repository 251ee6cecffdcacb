//! The event loop that owns all synchronized state.
//!
//! Every mutation arrives as an [`Event`] on one channel and is applied
//! in order by a single task, so the components below need no locking.
//! The only suspension points, authentication and append, run in
//! spawned tasks that report back through the same channel.

mod conversations;
mod dispatch;
mod messages;
mod selection;
mod session;
mod stream;

use std::sync::Arc;

use support_chat_core::{
    AuthError, Authenticator, ClientConfig, Conversation, ConversationId, Identity, Message,
    RemoteStore, StoreError, SubscriptionId,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use self::{
    conversations::ConversationListSync, dispatch::OutboundDispatcher,
    messages::MessageStreamSync, selection::SelectionTracker, session::SessionController,
};
use crate::{
    ClientError,
    intent::{Intent, Notice, SendOutcome, StreamKind},
    state::{ChatSnapshot, SyncStatus},
};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, ClientError>>;

/// Requests from client handles.
pub(crate) enum Command {
    Login {
        email: String,
        password: String,
        reply: Option<Reply<Identity>>,
    },
    Logout {
        reply: Option<oneshot::Sender<()>>,
    },
    Select {
        conversation_id: Option<ConversationId>,
    },
    EditCompose {
        text: String,
    },
    /// `text: None` sends the compose buffer.
    Send {
        text: Option<String>,
        reply: Option<Reply<SendOutcome>>,
    },
    Refresh,
    Flush {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

impl From<Intent> for Command {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Login { email, password } => Self::Login {
                email,
                password,
                reply: None,
            },
            Intent::Logout => Self::Logout { reply: None },
            Intent::SelectConversation { conversation_id } => Self::Select { conversation_id },
            Intent::Send { text } => Self::Send {
                text: Some(text),
                reply: None,
            },
            Intent::SendCompose => Self::Send {
                text: None,
                reply: None,
            },
            Intent::EditCompose { text } => Self::EditCompose { text },
            Intent::Refresh => Self::Refresh,
        }
    }
}

/// Everything the event loop reacts to.
pub(crate) enum Event {
    Command(Command),
    LoginFinished {
        attempt: u64,
        result: Result<Identity, AuthError>,
        reply: Option<Reply<Identity>>,
    },
    Conversations {
        subscription: SubscriptionId,
        snapshot: Result<Vec<Conversation>, StoreError>,
    },
    Messages {
        subscription: SubscriptionId,
        snapshot: Result<Vec<Message>, StoreError>,
    },
    /// The store closed a subscription without being asked to.
    StreamEnded {
        stream: StreamKind,
        subscription: SubscriptionId,
    },
    SendFinished {
        conversation_id: ConversationId,
        result: Result<(), StoreError>,
        reply: Option<Reply<SendOutcome>>,
    },
}

/// Owner of the session, lists, selection and compose buffer.
pub(crate) struct SyncEngine<S, A> {
    store: Arc<S>,
    auth: Arc<A>,
    events: mpsc::WeakUnboundedSender<Event>,
    session: SessionController,
    conversations: ConversationListSync,
    selection: SelectionTracker,
    messages: MessageStreamSync,
    dispatcher: OutboundDispatcher,
    state: watch::Sender<ChatSnapshot>,
    notices: broadcast::Sender<Notice>,
}

impl<S, A> SyncEngine<S, A>
where
    S: RemoteStore + 'static,
    A: Authenticator + 'static,
{
    pub(crate) fn new(
        store: Arc<S>,
        auth: Arc<A>,
        config: &ClientConfig,
        events: mpsc::WeakUnboundedSender<Event>,
        state: watch::Sender<ChatSnapshot>,
        notices: broadcast::Sender<Notice>,
    ) -> Self {
        let engine = Self {
            store,
            auth,
            events,
            session: SessionController::default(),
            conversations: ConversationListSync::default(),
            selection: SelectionTracker::default(),
            messages: MessageStreamSync::default(),
            dispatcher: OutboundDispatcher::new(config.sender_id.clone()),
            state,
            notices,
        };
        engine.publish();
        engine
    }

    /// Process events until shutdown or until every client handle is gone.
    pub(crate) async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = events.recv().await {
            if !self.handle(event) {
                break;
            }
        }
        self.teardown();
        tracing::debug!(target: "support_chat::engine", "Event loop stopped");
    }

    /// Apply one event. Returns `false` when the loop should stop.
    pub(crate) fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Command(Command::Shutdown) => return false,
            Event::Command(command) => self.on_command(command),
            Event::LoginFinished {
                attempt,
                result,
                reply,
            } => self.on_login_finished(attempt, result, reply),
            Event::Conversations {
                subscription,
                snapshot,
            } => {
                if let Err(error) = self.conversations.apply(subscription, snapshot) {
                    self.report_stream_failure(StreamKind::Conversations, error);
                }
            }
            Event::Messages {
                subscription,
                snapshot,
            } => {
                if let Err(error) = self.messages.apply(subscription, snapshot) {
                    self.report_stream_failure(StreamKind::Messages, error);
                }
            }
            Event::StreamEnded {
                stream,
                subscription,
            } => self.on_stream_ended(stream, subscription),
            Event::SendFinished {
                conversation_id,
                result,
                reply,
            } => self.on_send_finished(conversation_id, result, reply),
        }
        self.publish();
        true
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Login {
                email,
                password,
                reply,
            } => self.login(email, password, reply),
            Command::Logout { reply } => self.logout(reply),
            Command::Select { conversation_id } => self.select(conversation_id),
            Command::EditCompose { text } => self.dispatcher.edit(text),
            Command::Send { text, reply } => self.send(text, reply),
            Command::Refresh => self.refresh(),
            Command::Flush { reply } => {
                let _ = reply.send(());
            }
            Command::Shutdown => {}
        }
    }

    fn login(&mut self, email: String, password: String, reply: Option<Reply<Identity>>) {
        let attempt = self.session.begin_login();
        tracing::debug!(target: "support_chat::session", "Login attempt {attempt} for {email}");

        let auth = Arc::clone(&self.auth);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = auth.authenticate(&email, &password).await;
            if let Some(events) = events.upgrade() {
                let _ = events.send(Event::LoginFinished {
                    attempt,
                    result,
                    reply,
                });
            }
        });
    }

    fn on_login_finished(
        &mut self,
        attempt: u64,
        result: Result<Identity, AuthError>,
        reply: Option<Reply<Identity>>,
    ) {
        let outcome = match result {
            Ok(identity) if self.session.is_current(attempt) => {
                tracing::info!(
                    target: "support_chat::session",
                    uid = %identity.uid,
                    "Logged in"
                );
                self.session.establish(identity.clone());
                self.arm();
                Ok(identity)
            }
            Ok(_) => {
                tracing::debug!(
                    target: "support_chat::session",
                    "Discarding superseded login attempt {attempt}"
                );
                Err(AuthError::Superseded)
            }
            Err(error) => {
                if self.session.is_current(attempt) {
                    tracing::warn!(target: "support_chat::session", "Login failed: {error}");
                    self.notify(Notice::LoginFailed(error.clone()));
                }
                Err(error)
            }
        };

        if let Some(reply) = reply {
            self.publish();
            let _ = reply.send(outcome.map_err(ClientError::from));
        }
    }

    fn logout(&mut self, reply: Option<oneshot::Sender<()>>) {
        if let Some(identity) = self.session.logout() {
            tracing::info!(target: "support_chat::session", uid = %identity.uid, "Logged out");
        }
        self.conversations.disarm();
        self.selection.clear();
        self.messages.disarm();

        let auth = Arc::clone(&self.auth);
        tokio::spawn(async move {
            auth.deauthenticate().await;
            if let Some(reply) = reply {
                let _ = reply.send(());
            }
        });
    }

    /// Subscribe to conversations and, if something is selected, its
    /// messages.
    fn arm(&mut self) {
        if let Err(error) = self.conversations.arm(&*self.store, &self.events) {
            self.report_stream_failure(StreamKind::Conversations, error);
        }
        self.retarget_messages();
    }

    fn select(&mut self, target: Option<ConversationId>) {
        let changed = self.selection.select(target);
        if !changed && self.messages.is_bound_to(self.bound_target().as_ref()) {
            return;
        }
        self.retarget_messages();
    }

    /// Re-establish any subscription that should be live but is not.
    fn refresh(&mut self) {
        if !self.session.is_authenticated() {
            return;
        }
        if !self.conversations.is_armed() {
            if let Err(error) = self.conversations.arm(&*self.store, &self.events) {
                self.report_stream_failure(StreamKind::Conversations, error);
            }
        }
        if !self.messages.is_bound_to(self.bound_target().as_ref()) {
            self.retarget_messages();
        }
    }

    /// Drop a live subscription the store has closed. The last list stays
    /// visible until [`Self::refresh`] or a new selection resubscribes.
    fn on_stream_ended(&mut self, stream: StreamKind, subscription: SubscriptionId) {
        let was_live = match stream {
            StreamKind::Conversations => self.conversations.end(subscription),
            StreamKind::Messages => self.messages.end(subscription),
        };
        if was_live {
            self.report_stream_failure(stream, StoreError::Closed);
        }
    }

    /// The conversation the message stream should follow right now.
    fn bound_target(&self) -> Option<ConversationId> {
        if self.session.is_authenticated() {
            self.selection.current().cloned()
        } else {
            None
        }
    }

    fn retarget_messages(&mut self) {
        let target = self.bound_target();
        if let Err(error) = self
            .messages
            .retarget(target.as_ref(), &*self.store, &self.events)
        {
            self.report_stream_failure(StreamKind::Messages, error);
        }
    }

    fn send(&mut self, text: Option<String>, reply: Option<Reply<SendOutcome>>) {
        let text = text.unwrap_or_else(|| self.dispatcher.compose().to_string());
        let prepared = self.dispatcher.prepare(
            &text,
            self.selection.current(),
            self.session.is_authenticated(),
        );

        let (conversation_id, message) = match prepared {
            Ok(prepared) => prepared,
            Err(reason) => {
                tracing::debug!(target: "support_chat::dispatch", "Send skipped: {reason}");
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(SendOutcome::Skipped(reason)));
                }
                return;
            }
        };

        self.dispatcher.begin();
        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = store.append_message(&conversation_id, message).await;
            if let Some(events) = events.upgrade() {
                let _ = events.send(Event::SendFinished {
                    conversation_id,
                    result,
                    reply,
                });
            }
        });
    }

    fn on_send_finished(
        &mut self,
        conversation_id: ConversationId,
        result: Result<(), StoreError>,
        reply: Option<Reply<SendOutcome>>,
    ) {
        self.dispatcher.finish(&result);

        let outcome = match result {
            Ok(()) => Ok(SendOutcome::Sent { conversation_id }),
            Err(error) => {
                tracing::warn!(
                    target: "support_chat::dispatch",
                    "Append to {conversation_id} failed: {error}"
                );
                self.notify(Notice::SendFailed {
                    conversation_id,
                    error: error.clone(),
                });
                Err(ClientError::Store(error))
            }
        };

        // Reply only once the new state is visible.
        if let Some(reply) = reply {
            self.publish();
            let _ = reply.send(outcome);
        }
    }

    fn report_stream_failure(&self, stream: StreamKind, error: StoreError) {
        tracing::warn!(target: "support_chat::engine", "Subscription to {stream} failed: {error}");
        self.notify(Notice::SubscriptionFailed { stream, error });
    }

    fn notify(&self, notice: Notice) {
        // No receivers is fine.
        let _ = self.notices.send(notice);
    }

    fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            session: self.session.session().clone(),
            conversations: self.conversations.list().to_vec(),
            selected_conversation: self.selection.current().cloned(),
            messages: self.messages.list().to_vec(),
            compose: self.dispatcher.compose().to_string(),
            sender_id: self.dispatcher.sender_id().to_string(),
            sync: SyncStatus {
                conversation_stream: self.conversations.status(),
                message_stream: self.messages.status(),
                sends_in_flight: self.dispatcher.in_flight(),
            },
        }
    }

    fn publish(&self) {
        let next = self.snapshot();
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn teardown(&mut self) {
        self.conversations.disarm();
        self.messages.disarm();
        self.publish();
    }
}
