use std::cell::RefCell;

use async_trait::async_trait;
use chat_core::{
    ChatController, ChatError, CompletionMessage, CompletionRelay, Message, MessageStore,
    NewMessage, Session, StoredMessage,
};
use chat_relay::relay::{GroqClient, DEFAULT_MODEL, SYSTEM_PROMPT};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

/// Serves the relay on an ephemeral port, pointed at `upstream`.
async fn spawn_relay(upstream: &MockServer) -> String {
    let provider = GroqClient::new(
        format!("{}/v1/chat/completions", upstream.uri()),
        "test-key",
        DEFAULT_MODEL,
    );
    let app = chat_relay::app(provider, None);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/functions/v1/chat")
}

async fn mount_reply(upstream: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": DEFAULT_MODEL,
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })))
        .mount(upstream)
        .await;
}

// ============================================================================
// Relay HTTP contract
// ============================================================================

#[tokio::test]
async fn test_relay_returns_provider_response_verbatim() {
    let upstream = MockServer::start().await;
    let provider_body = r#"{"zeta":1,"choices":[{"message":{"content":"hello"}}],"alpha":2}"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(provider_body, "application/json"))
        .mount(&upstream)
        .await;
    let url = spawn_relay(&upstream).await;

    let response = reqwest::Client::new()
        .post(&url)
        .bearer_auth("session-token")
        .json(&json!({"messages": [{"role": "user", "content": "hi"}]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()["content-type"], "application/json");
    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..], provider_body.as_bytes());
}

#[tokio::test]
async fn test_relay_forwards_entries_without_reshaping() {
    let upstream = MockServer::start().await;
    mount_reply(&upstream, "ok").await;
    let url = spawn_relay(&upstream).await;
    let entries = json!([
        {"role": "user", "name": "ada", "content": "What is 6 * 7?"},
        {"role": "assistant", "content": null, "tool_calls": [{"id": "call_1", "type": "function"}]},
        {"role": "tool", "tool_call_id": "call_1", "content": [{"type": "text", "text": "42"}]}
    ]);

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({ "messages": entries }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let requests = upstream.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let forwarded = sent["messages"].as_array().unwrap();
    assert_eq!(forwarded[0]["role"], "system");
    assert_eq!(Value::Array(forwarded[1..].to_vec()), entries);
}

#[tokio::test]
async fn test_relay_non_json_provider_body_is_generic_500() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&upstream)
        .await;
    let url = spawn_relay(&upstream).await;

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({"messages": []}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to get response from GROQ API");
}

#[tokio::test]
async fn test_relay_prepends_system_prompt_and_fixed_parameters() {
    let upstream = MockServer::start().await;
    mount_reply(&upstream, "ok").await;
    let url = spawn_relay(&upstream).await;

    reqwest::Client::new()
        .post(&url)
        .json(&json!({"messages": [
            {"role": "user", "content": "A"},
            {"role": "assistant", "content": "B"}
        ]}))
        .send()
        .await
        .unwrap();

    let requests = upstream.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["model"], "llama-3.3-70b-versatile");
    assert_eq!(sent["temperature"], 0.7);
    assert_eq!(sent["max_tokens"], 1024);
    assert_eq!(sent["top_p"], 1.0);
    assert_eq!(
        sent["messages"],
        json!([
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": "A"},
            {"role": "assistant", "content": "B"}
        ])
    );
}

#[tokio::test]
async fn test_relay_rejects_non_array_messages() {
    let upstream = MockServer::start().await;
    let url = spawn_relay(&upstream).await;

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({"messages": "not-an-array"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid messages format");
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_relay_rejects_missing_messages() {
    let upstream = MockServer::start().await;
    let url = spawn_relay(&upstream).await;

    let response = reqwest::Client::new().post(&url).send().await.unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn test_relay_options_is_empty_success() {
    let upstream = MockServer::start().await;
    let url = spawn_relay(&upstream).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, &url)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().is_empty());
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_relay_handler_answers_options_without_cors_layer() {
    let upstream = MockServer::start().await;
    let provider = GroqClient::new(upstream.uri(), "test-key", DEFAULT_MODEL);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, chat_relay::relay_router(provider)).await.unwrap();
    });

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/functions/v1/chat"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().is_empty());
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_relay_answers_browser_preflight() {
    let upstream = MockServer::start().await;
    let url = spawn_relay(&upstream).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, &url)
        .header("origin", "http://localhost:8081")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization, content-type")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let allowed = response.headers()["access-control-allow-headers"]
        .to_str()
        .unwrap()
        .to_lowercase();
    for name in ["authorization", "x-client-info", "apikey", "content-type"] {
        assert!(allowed.contains(name), "missing {name} in {allowed}");
    }
}

#[tokio::test]
async fn test_relay_upstream_error_is_generic_500() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
        .mount(&upstream)
        .await;
    let url = spawn_relay(&upstream).await;

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({"messages": [{"role": "user", "content": "hi"}]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "Failed to get response from GROQ API"}));
}

#[tokio::test]
async fn test_relay_unreachable_upstream_is_generic_500() {
    // Nothing listens on the discard port.
    let provider = GroqClient::new("http://127.0.0.1:9/v1/chat/completions", "k", DEFAULT_MODEL);
    let app = chat_relay::app(provider, None);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let response = reqwest::Client::new()
        .put(format!("http://{addr}/functions/v1/chat"))
        .json(&json!({"messages": []}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to get response from GROQ API");
}

// ============================================================================
// Controller against the live relay
// ============================================================================

struct HttpRelay {
    url: String,
    http: reqwest::Client,
}

#[async_trait(?Send)]
impl CompletionRelay for HttpRelay {
    async fn complete(
        &self,
        session: &Session,
        messages: &[CompletionMessage],
    ) -> Result<Value, ChatError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&session.access_token)
            .json(&json!({ "messages": messages }))
            .send()
            .await
            .map_err(|e| ChatError::relay(e.to_string()))?;
        response.json().await.map_err(|e| ChatError::relay(e.to_string()))
    }
}

#[derive(Default)]
struct MemoryStore {
    rows: RefCell<Vec<StoredMessage>>,
}

#[async_trait(?Send)]
impl MessageStore for MemoryStore {
    async fn load(&self, _session: &Session) -> Result<Vec<StoredMessage>, ChatError> {
        Ok(self.rows.borrow().clone())
    }

    async fn insert(&self, _session: &Session, message: NewMessage) -> Result<(), ChatError> {
        self.rows.borrow_mut().push(StoredMessage {
            content: message.content,
            is_ai: Some(message.is_ai),
            user_id: message.user_id,
            created_at: None,
        });
        Ok(())
    }
}

#[tokio::test]
async fn test_controller_round_trip_through_relay() {
    let upstream = MockServer::start().await;
    mount_reply(&upstream, "hello").await;
    let url = spawn_relay(&upstream).await;

    let relay = HttpRelay { url, http: reqwest::Client::new() };
    let mut controller = ChatController::new(MemoryStore::default(), relay);
    controller
        .set_session(Some(Session::new("u1", "session-token")))
        .await
        .unwrap();

    controller.submit("hi").await.unwrap();

    assert_eq!(
        controller.conversation().messages(),
        &[Message::user("hi"), Message::assistant("hello")]
    );
    assert_eq!(controller.store().rows.borrow().len(), 2);
}

#[tokio::test]
async fn test_controller_keeps_user_message_when_relay_fails() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstream)
        .await;
    let url = spawn_relay(&upstream).await;

    let relay = HttpRelay { url, http: reqwest::Client::new() };
    let mut controller = ChatController::new(MemoryStore::default(), relay);
    controller
        .set_session(Some(Session::new("u1", "session-token")))
        .await
        .unwrap();

    let err = controller.submit("hi").await.unwrap_err();

    // The relay's error envelope has no choices.
    assert!(matches!(err, ChatError::MalformedResponse { .. }));
    assert_eq!(controller.conversation().messages(), &[Message::user("hi")]);
    assert!(!controller.conversation().is_loading());
}
