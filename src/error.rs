use thiserror::Error;

/// Errors raised while configuring, authenticating or executing the node
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Malformed JSON bodies or parameter values
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // Transport failures (connection, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Non-2xx responses from the Story Memory API
    #[error("Story Memory API error: {code} - {message}")]
    Api { code: u16, message: String },

    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Credential test failed: {0}")]
    CredentialTest(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Node-level failure that aborts a strict execution
    #[error("{0}")]
    NodeOperation(String),
}

impl Error {
    /// Shorthand for an `InvalidInput` error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure was caused by the request rather than the remote service
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::InvalidInput { .. }
            | Self::AuthenticationFailed(_)
            | Self::UnknownOperation(_) => true,
            Self::Api { code, .. } => (400..500).contains(code),
            Self::Http(e) => e.status().is_some_and(|s| s.is_client_error()),
            Self::Io(_)
            | Self::Serde(_)
            | Self::CredentialTest(_)
            | Self::NodeOperation(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
