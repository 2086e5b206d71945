//! Auth layer error types.

use thiserror::Error;

/// Auth layer error type.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token storage error: {0}")]
    Storage(String),

    #[error("csrf token fetch failed: {0}")]
    CsrfFetch(String),

    #[error("session probe failed: {0}")]
    SessionProbe(String),
}

/// Auth layer result type.
pub type Result<T> = std::result::Result<T, AuthError>;
