//! Error type shared by login, session and remote-call operations.

use cockpit_http::{HttpError, UrlError};

use crate::session::SessionState;
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid URL: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Login rejected, or accepted without a usable session cookie.
    #[error("authentication failed: {}", format_auth(.status, .reason))]
    Auth { status: Option<u16>, reason: String },

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("session is {actual}, expected {expected}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("OS random source unavailable: {0}")]
    Entropy(String),
}

fn format_auth(status: &Option<u16>, reason: &str) -> String {
    match status {
        Some(status) => format!("HTTP {status} {reason}"),
        None => reason.to_string(),
    }
}

impl ClientError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        ClientError::Protocol(msg.into())
    }

    pub(crate) fn missing_cookie() -> Self {
        ClientError::Auth {
            status: None,
            reason: "no cockpit session cookie in login response".to_string(),
        }
    }
}
