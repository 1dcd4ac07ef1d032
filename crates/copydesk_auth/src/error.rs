//! Error types for the auth module.

use thiserror::Error;

/// Result type alias for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur talking to the auth/profile service.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The service refused the sign-in; carries its own wording
    #[error("{0}")]
    InvalidCredentials(String),

    /// The service refused the request; `message` is its own wording
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed auth response: {0}")]
    MalformedResponse(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Admin role required")]
    Forbidden,

    #[error("Unknown role '{0}'; expected user or admin")]
    InvalidRole(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Service key not configured; set COPYDESK_AUTH_SERVICE_KEY for account management")]
    ServiceKeyMissing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuthError {
    /// Create a rejection error.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Whether this is a permission problem rather than a transport failure.
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials(_) | Self::NotSignedIn | Self::Forbidden
        ) || matches!(self, Self::Rejected { status, .. } if *status == 401 || *status == 403)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
