use thiserror::Error;

/// Errors returned by [`NetworkManager`](crate::NetworkManager).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response (connect, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error envelope.
    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The response body was not the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Not logged in")]
    NotAuthenticated,
}

impl ClientError {
    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::Decode(_) | ClientError::NotAuthenticated => None,
        }
    }

    /// Whether the server could not be reached or failed internally.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Api { status, .. } => *status >= 500,
            ClientError::Decode(_) | ClientError::NotAuthenticated => false,
        }
    }
}
