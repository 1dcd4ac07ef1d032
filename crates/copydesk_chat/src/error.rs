//! Error types for the chat system.

use thiserror::Error;

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Why a generation request did not produce a reply.
///
/// Every failure of the webhook call lands in exactly one of these kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Generation request timed out after {0}s")]
    Timeout(u64),

    #[error("Generation endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed generation response: {0}")]
    MalformedResponse(String),

    #[error("Generation endpoint rejected the request ({0})")]
    Unauthorized(u16),
}

impl DispatchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::MalformedResponse(_) | Self::Unauthorized(_) => false,
        }
    }
}

/// Chat system errors
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChatError {
    /// The dispatch failure kind, if this error came from the webhook.
    pub fn dispatch_kind(&self) -> Option<&DispatchError> {
        match self {
            Self::Dispatch(e) => Some(e),
            _ => None,
        }
    }
}
