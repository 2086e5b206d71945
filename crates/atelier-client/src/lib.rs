//! Authenticated-request protocol layer for the atelier admin console.
//!
//! Every admin API call goes through [`ApiClient`], which decorates the
//! outbound request with the bearer credential and anti-forgery token and
//! self-heals when either is rejected:
//! - 401 invokes the unauthorized handler (typically clearing the stored
//!   credential) and propagates the error
//! - 403 on a mutating call refreshes the anti-forgery token and retries
//!   the identical request exactly once

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod transport;

pub use client::{
    ApiClient, BearerTokenProvider, CSRF_TOKEN_HEADER, ClearTokenOnUnauthorized,
    PROGRAMMATIC_REQUEST_HEADER, PROGRAMMATIC_REQUEST_VALUE, UnauthorizedHandler,
};
pub use config::{
    ApiClientConfig, DEFAULT_CSRF_TOKEN_PATH, DEFAULT_SESSION_PATH, DEFAULT_TIMEOUT_MS,
    normalize_base_url,
};
pub use endpoints::{HttpCsrfFetcher, HttpSessionProbe};
pub use error::{ApiClientError, format_http_error};
pub use transport::{HttpTransport, ReqwestTransport, TransportRequest, TransportResponse};
