use log::{debug, error};

use crate::error::ChatError;
use crate::message::{first_choice_content, history_payload, CompletionMessage, Message, NewMessage, StoredMessage};
use crate::session::Session;
use crate::store::{CompletionRelay, MessageStore};

/// Session-scoped conversation state: the visible thread plus the
/// has-session / is-loading flags.
///
/// Sending is split into phases so a UI can keep this value in a reactive
/// cell and run the awaits outside of it:
/// [`begin_send`](Self::begin_send) → [`PendingSend::request_reply`] →
/// [`accept_reply`](Self::accept_reply) → [`PendingSend::persist_reply`] →
/// [`finish_send`](Self::finish_send).
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    session: Option<Session>,
    messages: Vec<Message>,
    in_flight: Option<u64>,
    next_token: u64,
    last_error: Option<ChatError>,
}

/// A send accepted by [`Conversation::begin_send`].
#[derive(Debug, Clone)]
pub struct PendingSend {
    token: u64,
    session: Session,
    text: String,
    payload: Vec<CompletionMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_error(&self) -> Option<&ChatError> {
        self.last_error.as_ref()
    }

    /// Installs a new session. Returns `true` when the signed-in identity
    /// changed to a user whose history must be loaded. A token refresh for
    /// the same user keeps the thread as is.
    pub fn set_session(&mut self, session: Option<Session>) -> bool {
        let previous = self.session.as_ref().map(|s| s.user.id.clone());
        let next = session.as_ref().map(|s| s.user.id.clone());
        self.session = session;

        if previous == next {
            return false;
        }
        self.messages.clear();
        self.in_flight = None;
        self.last_error = None;
        next.is_some()
    }

    /// Replaces the thread with persisted rows, already in creation order.
    /// Ignored when `user_id` is no longer the signed-in user.
    pub fn apply_history(&mut self, user_id: &str, rows: Vec<StoredMessage>) -> bool {
        if self.session.as_ref().map(Session::user_id) != Some(user_id) {
            debug!("Discarding history loaded for {user_id}: session changed");
            return false;
        }
        self.messages = rows.into_iter().map(Message::from).collect();
        true
    }

    /// Validates and optimistically appends the user message.
    pub fn begin_send(&mut self, text: &str) -> Result<PendingSend, ChatError> {
        let session = self.session.clone().ok_or(ChatError::NotSignedIn)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.in_flight.is_some() {
            return Err(ChatError::SendInFlight);
        }

        let payload = history_payload(&self.messages, text);
        let token = self.next_token;
        self.next_token += 1;
        self.in_flight = Some(token);
        self.last_error = None;
        self.messages.push(Message::user(text));

        Ok(PendingSend {
            token,
            session,
            text: text.to_string(),
            payload,
        })
    }

    /// Appends the assistant reply if `pending` is still the current send.
    pub fn accept_reply(&mut self, pending: &PendingSend, text: &str) -> bool {
        if self.in_flight != Some(pending.token) {
            return false;
        }
        self.messages.push(Message::assistant(text));
        true
    }

    /// Clears the loading flag for `pending` whatever the outcome, keeping
    /// any failure for display.
    pub fn finish_send(&mut self, pending: &PendingSend, outcome: &Result<(), ChatError>) -> bool {
        if self.in_flight != Some(pending.token) {
            return false;
        }
        self.in_flight = None;
        if let Err(e) = outcome {
            self.last_error = Some(e.clone());
        }
        true
    }

    pub fn record_error(&mut self, error: ChatError) {
        self.last_error = Some(error);
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }
}

impl PendingSend {
    /// Persists the user message, then asks the relay for a reply.
    pub async fn request_reply<S, R>(&self, store: &S, relay: &R) -> Result<String, ChatError>
    where
        S: MessageStore + ?Sized,
        R: CompletionRelay + ?Sized,
    {
        store
            .insert(&self.session, NewMessage::new(&Message::user(&self.text), self.session.user_id()))
            .await?;
        let response = relay.complete(&self.session, &self.payload).await?;
        first_choice_content(&response)
    }

    pub async fn persist_reply<S>(&self, store: &S, reply: &str) -> Result<(), ChatError>
    where
        S: MessageStore + ?Sized,
    {
        store
            .insert(&self.session, NewMessage::new(&Message::assistant(reply), self.session.user_id()))
            .await
    }
}

/// Runs the whole send sequence against concrete collaborators.
pub struct ChatController<S, R> {
    conversation: Conversation,
    store: S,
    relay: R,
}

impl<S: MessageStore, R: CompletionRelay> ChatController<S, R> {
    pub fn new(store: S, relay: R) -> Self {
        Self {
            conversation: Conversation::new(),
            store,
            relay,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Installs a session, loading its history when the identity changed.
    pub async fn set_session(&mut self, session: Option<Session>) -> Result<(), ChatError> {
        if self.conversation.set_session(session) {
            self.reload().await
        } else {
            Ok(())
        }
    }

    pub async fn reload(&mut self) -> Result<(), ChatError> {
        let Some(session) = self.conversation.session().cloned() else {
            return Ok(());
        };
        match self.store.load(&session).await {
            Ok(rows) => {
                self.conversation.apply_history(session.user_id(), rows);
                Ok(())
            }
            Err(e) => {
                error!("Error loading messages: {e}");
                self.conversation.record_error(e.clone());
                Err(e)
            }
        }
    }

    pub async fn submit(&mut self, text: &str) -> Result<(), ChatError> {
        let pending = self.conversation.begin_send(text).inspect_err(|e| {
            debug!("Send rejected: {e}");
        })?;

        let outcome = self.exchange(&pending).await;
        if let Err(e) = &outcome {
            error!("Error in chat: {e}");
        }
        self.conversation.finish_send(&pending, &outcome);
        outcome
    }

    async fn exchange(&mut self, pending: &PendingSend) -> Result<(), ChatError> {
        let reply = pending.request_reply(&self.store, &self.relay).await?;
        self.conversation.accept_reply(pending, &reply);
        pending.persist_reply(&self.store, &reply).await
    }
}
