use chat_core::{ChatError, Conversation, MessageStore, PendingSend, Session, SessionHub};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api::{RelayClient, RestStore};

const SESSION_KEY: &str = "chat-widget.session";

/// Shared application state, provided via Leptos context.
#[derive(Clone)]
pub struct AppState {
    pub conversation: RwSignal<Conversation>,
    pub hub: SessionHub,
    store: RestStore,
    relay: RelayClient,
}

impl AppState {
    /// Create a new `AppState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let state = Self {
            conversation: RwSignal::new(Conversation::new()),
            hub: SessionHub::new(),
            store: RestStore::new(),
            relay: RelayClient::new(),
        };
        provide_context(state.clone());
        state
    }

    /// Picks up a session from the OAuth redirect, falling back to the one
    /// remembered from an earlier visit.
    pub fn restore_session(&self) {
        let session = session_from_redirect().or_else(stored_session);
        remember(session.as_ref());
        self.hub.set_session(session);
    }

    pub fn sign_out(&self) {
        remember(None);
        self.hub.set_session(None);
    }

    /// Identity-change listener: installs the session and reloads history
    /// when the user changed.
    pub fn on_session(&self, session: Option<Session>) {
        let needs_reload = self
            .conversation
            .try_update(|c| c.set_session(session))
            .unwrap_or(false);
        if needs_reload {
            self.load_history();
        }
    }

    fn load_history(&self) {
        let Some(session) = self.conversation.with_untracked(|c| c.session().cloned()) else {
            return;
        };
        let state = self.clone();
        spawn_local(async move {
            match state.store.load(&session).await {
                Ok(rows) => state.conversation.update(|c| {
                    c.apply_history(session.user_id(), rows);
                }),
                Err(e) => {
                    log::error!("Error loading messages: {e}");
                    state.conversation.update(|c| c.record_error(e));
                }
            }
        });
    }

    pub fn send_message(&self, text: String) {
        let pending = match self.conversation.try_update(|c| c.begin_send(&text)) {
            Some(Ok(pending)) => pending,
            Some(Err(e)) => {
                log::warn!("Send rejected: {e}");
                return;
            }
            None => return,
        };

        let state = self.clone();
        spawn_local(async move {
            let outcome = state.exchange(&pending).await;
            if let Err(e) = &outcome {
                log::error!("Error in chat: {e}");
            }
            state.conversation.update(|c| {
                c.finish_send(&pending, &outcome);
            });
        });
    }

    async fn exchange(&self, pending: &PendingSend) -> Result<(), ChatError> {
        let reply = pending.request_reply(&self.store, &self.relay).await?;
        self.conversation.update(|c| {
            c.accept_reply(pending, &reply);
        });
        pending.persist_reply(&self.store, &reply).await
    }
}

fn session_from_redirect() -> Option<Session> {
    let location = window().location();
    let hash = location.hash().ok().filter(|h| h.len() > 1)?;
    match Session::from_redirect_fragment(&hash) {
        Ok(session) => {
            // Keep the token out of the address bar.
            if let Err(e) = location.set_hash("") {
                log::warn!("Failed to clear redirect fragment: {e:?}");
            }
            Some(session)
        }
        Err(e) => {
            log::warn!("Ignoring redirect fragment: {e}");
            None
        }
    }
}

fn stored_session() -> Option<Session> {
    let storage = window().local_storage().ok().flatten()?;
    let raw = storage.get_item(SESSION_KEY).ok().flatten()?;
    serde_json::from_str(&raw).ok()
}

fn remember(session: Option<&Session>) {
    let Some(storage) = window().local_storage().ok().flatten() else {
        return;
    };
    let result = match session.map(serde_json::to_string) {
        Some(Ok(json)) => storage.set_item(SESSION_KEY, &json),
        Some(Err(e)) => {
            log::error!("Failed to serialize session: {e}");
            return;
        }
        None => storage.remove_item(SESSION_KEY),
    };
    if let Err(e) = result {
        log::warn!("Failed to update stored session: {e:?}");
    }
}
