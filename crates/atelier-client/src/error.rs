//! Client error types.

use atelier_auth::AuthError;
use reqwest::StatusCode;
use thiserror::Error;

/// Authenticated-request client error type.
#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("api_base_url_missing")]
    BaseUrlMissing,

    #[error("api_base_url_invalid")]
    InvalidBaseUrl,

    #[error("api_invalid_path")]
    InvalidPath,

    #[error("api_request_failed:{message}")]
    Transport { message: String },

    #[error("api_read_failed:{message}")]
    Read { message: String },

    #[error("api_http_{status}:{body}")]
    Http { status: StatusCode, body: String },

    #[error("api_json_decode_failed:{message}")]
    Decode { message: String },

    #[error("api_csrf_failed:{message}")]
    Csrf { message: String },
}

impl From<AuthError> for ApiClientError {
    fn from(error: AuthError) -> Self {
        Self::Csrf {
            message: error.to_string(),
        }
    }
}

/// Map a non-success response to an [`ApiClientError::Http`].
pub fn format_http_error(status: StatusCode, body: &[u8]) -> ApiClientError {
    let body = non_empty_string(String::from_utf8_lossy(body).to_string())
        .unwrap_or_else(|| "<empty>".to_string());
    ApiClientError::Http { status, body }
}

fn non_empty_string(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
