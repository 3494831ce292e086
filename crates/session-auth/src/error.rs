//! Error types for credential and authorization endpoint operations

/// Errors from credential storage and authorization endpoint calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("credentials rejected: {0}")]
    Rejected(String),

    #[error("authorization endpoint error: {0}")]
    Endpoint(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for credential operations.
pub type Result<T> = std::result::Result<T, Error>;
