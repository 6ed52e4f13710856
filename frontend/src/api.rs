use async_trait::async_trait;
use chat_core::message::RelayRequest;
use chat_core::{ChatError, CompletionMessage, CompletionRelay, MessageStore, NewMessage, Session, StoredMessage};
use gloo_net::http::Request;
use leptos::prelude::window;
use serde_json::Value;

/// Backend origin, fixed at build time or taken from the page.
fn api_base() -> String {
    option_env!("CHAT_API_BASE")
        .map(str::to_string)
        .unwrap_or_else(page_origin)
}

/// Identity provider origin.
fn auth_base() -> String {
    option_env!("CHAT_AUTH_BASE")
        .map(str::to_string)
        .unwrap_or_else(page_origin)
}

fn page_origin() -> String {
    window().location().origin().unwrap_or_default()
}

fn bearer(session: &Session) -> String {
    format!("Bearer {}", session.access_token)
}

/// OAuth authorize URL that redirects back to the current page.
pub fn sign_in_url(provider: &str) -> String {
    let here = window().location().href().unwrap_or_default();
    let redirect_to: String = js_sys::encode_uri_component(&here).into();
    format!(
        "{}/auth/v1/authorize?provider={provider}&redirect_to={redirect_to}",
        auth_base()
    )
}

/// The `messages` table behind the REST endpoints.
#[derive(Clone)]
pub struct RestStore {
    base: String,
}

impl RestStore {
    pub fn new() -> Self {
        Self { base: api_base() }
    }
}

#[async_trait(?Send)]
impl MessageStore for RestStore {
    async fn load(&self, session: &Session) -> Result<Vec<StoredMessage>, ChatError> {
        let resp = Request::get(&format!(
            "{}/rest/v1/messages?select=*&order=created_at.asc",
            self.base
        ))
        .header("Authorization", &bearer(session))
        .send()
        .await
        .map_err(|e| ChatError::store(format!("Network error: {e}")))?;

        if !resp.ok() {
            return Err(ChatError::store(format!("Server error: {}", resp.status())));
        }

        resp.json::<Vec<StoredMessage>>()
            .await
            .map_err(|e| ChatError::store(format!("Parse error: {e}")))
    }

    async fn insert(&self, session: &Session, message: NewMessage) -> Result<(), ChatError> {
        let resp = Request::post(&format!("{}/rest/v1/messages", self.base))
            .header("Authorization", &bearer(session))
            .json(&message)
            .map_err(|e| ChatError::store(format!("Serialize error: {e}")))?
            .send()
            .await
            .map_err(|e| ChatError::store(format!("Network error: {e}")))?;

        if !resp.ok() {
            return Err(ChatError::store(format!("Server error: {}", resp.status())));
        }
        Ok(())
    }
}

/// Client for `POST /functions/v1/chat`.
#[derive(Clone)]
pub struct RelayClient {
    base: String,
}

impl RelayClient {
    pub fn new() -> Self {
        Self { base: api_base() }
    }
}

#[async_trait(?Send)]
impl CompletionRelay for RelayClient {
    async fn complete(
        &self,
        session: &Session,
        messages: &[CompletionMessage],
    ) -> Result<Value, ChatError> {
        let body = RelayRequest { messages: messages.to_vec() };

        let resp = Request::post(&format!("{}/functions/v1/chat", self.base))
            .header("Authorization", &bearer(session))
            .json(&body)
            .map_err(|e| ChatError::relay(format!("Serialize error: {e}")))?
            .send()
            .await
            .map_err(|e| ChatError::relay(format!("Network error: {e}")))?;

        if !resp.ok() {
            return Err(ChatError::relay(format!("Server error: {}", resp.status())));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| ChatError::relay(format!("Parse error: {e}")))
    }
}
