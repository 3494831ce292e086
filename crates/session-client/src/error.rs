//! Error types for client operations

use std::time::Duration;

/// Why a refresh produced no new access token.
///
/// Cloneable so one outcome can be handed to every waiting caller. Every
/// denial except `Abandoned` purges the stored credentials.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshDenied {
    #[error("no refresh token stored")]
    NoRefreshCredential,

    #[error("refresh token rejected: {0}")]
    Rejected(String),

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("refresh abandoned before completion")]
    Abandoned,
}

impl From<session_auth::Error> for RefreshDenied {
    fn from(err: session_auth::Error) -> Self {
        match err {
            session_auth::Error::Http(msg) => RefreshDenied::Transport(msg),
            session_auth::Error::InvalidResponse(msg) => RefreshDenied::InvalidResponse(msg),
            other => RefreshDenied::Rejected(other.to_string()),
        }
    }
}

/// Errors surfaced by the client facade and request pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("refresh denied: {0}")]
    RefreshDenied(#[from] RefreshDenied),

    #[error("timed out after {0:?} waiting for credential refresh")]
    Timeout(Duration),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
