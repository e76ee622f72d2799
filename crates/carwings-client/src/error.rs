//! Error types for Carwings client operations

use thiserror::Error;

/// Result type alias for Carwings client operations
pub type Result<T> = std::result::Result<T, CarwingsError>;

/// Errors that can occur while talking to the Carwings gateway
#[derive(Error, Debug)]
pub enum CarwingsError {
    /// Credentials were rejected or the region is not supported
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Transport-level failure (connect, TLS, timeout, broken body)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The gateway answered with an error flag or a reply we cannot read
    #[error("Remote service error{}: {message}", status_suffix(.status))]
    RemoteService {
        status: Option<u16>,
        message: String,
    },

    /// The account has no vehicle attached
    #[error("No vehicle associated with this account")]
    NoVehicle,

    /// A structurally required key is missing from a payload
    #[error("Schema error: {0}")]
    Schema(String),

    /// The configured base URL cannot be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A refresh token was presented to a vehicle it was not issued for
    #[error("Update token was issued for vehicle {expected}, not {actual}")]
    TokenMismatch { expected: String, actual: String },

    /// The refresh cycle already reached a terminal state
    #[error("Refresh cycle already finished")]
    RefreshFinished,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {}", s)).unwrap_or_default()
}

impl CarwingsError {
    /// Create a remote service error from an optional status and message
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RemoteService {
            status,
            message: message.into(),
        }
    }

    /// Create a schema error naming the missing key
    pub fn missing_key(key: &str) -> Self {
        Self::Schema(format!("required key `{}` is missing", key))
    }

    /// True for errors raised by the gateway itself rather than the transport
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteService { .. })
    }
}
