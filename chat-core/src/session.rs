use std::sync::{Arc, Mutex, PoisonError, Weak};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
}

/// Credential bundle issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub access_token: String,
}

#[derive(Deserialize)]
struct Claims {
    sub: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user: User { id: user_id.into() },
            access_token: access_token.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Builds a session from the `access_token=...&...` fragment appended to
    /// the redirect URL after an OAuth sign-in. A leading `#` is accepted.
    pub fn from_redirect_fragment(fragment: &str) -> Result<Self, ChatError> {
        let access_token = fragment
            .trim_start_matches('#')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "access_token")
            .map(|(_, value)| value.to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ChatError::invalid_session("no access_token in redirect"))?;

        let user_id = user_id_from_token(&access_token)?;
        Ok(Self::new(user_id, access_token))
    }
}

/// Reads the `sub` claim from a JWT payload. The signature is not checked
/// here; tokens are verified by the identity provider's gateway.
pub fn user_id_from_token(token: &str) -> Result<String, ChatError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ChatError::invalid_session("access token is not a JWT"))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ChatError::invalid_session(format!("token payload is not base64url: {e}")))?;

    let claims: Claims = serde_json::from_slice(&bytes)
        .map_err(|e| ChatError::invalid_session(format!("token payload is not JSON: {e}")))?;

    claims
        .sub
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| ChatError::invalid_session("token has no subject"))
}

type Listener = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct HubInner {
    session: Option<Session>,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

/// Holds the current session and pushes every change to its subscribers.
#[derive(Clone, Default)]
pub struct SessionHub {
    inner: Arc<Mutex<HubInner>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// Replaces the session and notifies every listener with the new value.
    pub fn set_session(&self, session: Option<Session>) {
        let listeners: Vec<Listener> = {
            let mut inner = self.lock();
            inner.session = session.clone();
            inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        // Called outside the lock so listeners may read the hub.
        for listener in listeners {
            listener(session.as_ref());
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&Session>) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by [`SessionHub::subscribe`]. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    hub: Weak<Mutex<HubInner>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            let mut inner = hub.lock().unwrap_or_else(PoisonError::into_inner);
            inner.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
