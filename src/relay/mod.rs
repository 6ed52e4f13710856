use axum::body::Bytes;
use chat_core::Role;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::AppConfig;
use crate::errors::AppError;

pub const DEFAULT_API_URL: &str = "https://api.groq.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const SYSTEM_PROMPT: &str = "You are a helpful and knowledgeable AI assistant. \
                                 Provide clear, accurate, and engaging responses while \
                                 maintaining a friendly and professional tone.";

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 1024;
const TOP_P: f64 = 1.0;

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<Value>,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
}

/// Prepends the fixed system prompt to the client's entries, which are
/// forwarded as received.
pub fn with_system_prompt(messages: &[Value]) -> Vec<Value> {
    std::iter::once(json!({ "role": Role::System, "content": SYSTEM_PROMPT }))
        .chain(messages.iter().cloned())
        .collect()
}

/// Client for the Groq chat-completions endpoint. Holds no per-request
/// state, so one instance is shared by every relay request.
#[derive(Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl GroqClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.groq_api_url, &config.groq_api_key, &config.groq_model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one completion request and returns the provider's body bytes
    /// untouched, once they are known to be JSON.
    pub async fn complete(&self, messages: &[Value]) -> Result<Bytes, AppError> {
        let body = CompletionBody {
            model: &self.model,
            messages: with_system_prompt(messages),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
        };

        debug!(model = %self.model, messages = messages.len(), "Calling GROQ API");

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("GROQ API request failed: {e}");
                AppError::UpstreamUnavailable(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("GROQ API error ({status}): {body}");
            return Err(AppError::UpstreamStatus { status: status.as_u16(), body });
        }

        let data = response.bytes().await.map_err(|e| {
            error!("Failed to read GROQ API response: {e}");
            AppError::UpstreamUnavailable(e)
        })?;
        serde_json::from_slice::<serde::de::IgnoredAny>(&data).map_err(|e| {
            error!("GROQ API returned a non-JSON body: {e}");
            AppError::UpstreamDecode(e)
        })?;
        debug!("GROQ API response: {}", String::from_utf8_lossy(&data));
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_comes_first() {
        let messages = with_system_prompt(&[json!({"role": "user", "content": "hi"})]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], SYSTEM_PROMPT);
        assert_eq!(messages[1], json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn client_entries_are_not_reshaped() {
        let entry = json!({"role": "tool", "tool_call_id": "call_1", "content": [{"type": "text", "text": "42"}]});
        let messages = with_system_prompt(std::slice::from_ref(&entry));
        assert_eq!(messages[1], entry);
    }

    #[test]
    fn body_carries_fixed_sampling_parameters() {
        let body = CompletionBody {
            model: DEFAULT_MODEL,
            messages: with_system_prompt(&[]),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["temperature"], 0.7);
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["top_p"], 1.0);
    }
}
