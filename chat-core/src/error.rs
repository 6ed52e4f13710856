use thiserror::Error;

/// Errors surfaced by the conversation controller and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    // ── Send gating ──────────────────────────────────────────────────────────
    #[error("User must be logged in to send messages")]
    NotSignedIn,

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("A message is already being sent")]
    SendInFlight,

    // ── Session errors ───────────────────────────────────────────────────────
    #[error("Invalid session: {message}")]
    InvalidSession { message: String },

    // ── Collaborator errors ──────────────────────────────────────────────────
    #[error("Message store error: {message}")]
    Store { message: String },

    #[error("Completion relay error: {message}")]
    Relay { message: String },

    #[error("Malformed completion response: {message}")]
    MalformedResponse { message: String },
}

impl ChatError {
    pub fn store(message: impl Into<String>) -> Self {
        ChatError::Store { message: message.into() }
    }

    pub fn relay(message: impl Into<String>) -> Self {
        ChatError::Relay { message: message.into() }
    }

    pub fn invalid_session(message: impl Into<String>) -> Self {
        ChatError::InvalidSession { message: message.into() }
    }
}
