//! The authenticated-request client.

use std::sync::Arc;

use atelier_auth::{AuthTokenStore, CsrfTokenCache};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{ApiClientConfig, normalize_base_url};
use crate::error::{ApiClientError, format_http_error};
use crate::transport::{HttpTransport, TransportRequest, TransportResponse};

/// Marker header distinguishing API calls from page navigations; the
/// server uses it for anti-forgery checks.
pub const PROGRAMMATIC_REQUEST_HEADER: &str = "x-requested-with";
pub const PROGRAMMATIC_REQUEST_VALUE: &str = "XMLHttpRequest";

/// Header carrying the anti-forgery token on mutating calls.
pub const CSRF_TOKEN_HEADER: &str = "x-csrf-token";

/// Supplies the current bearer credential, if any.
pub trait BearerTokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

impl BearerTokenProvider for AuthTokenStore {
    fn bearer_token(&self) -> Option<String> {
        self.token()
    }
}

/// Invoked when the server rejects the bearer credential (401).
pub trait UnauthorizedHandler: Send + Sync {
    fn on_unauthorized(&self);
}

/// Standard unauthorized reaction: drop the stored credential so the UI
/// falls back to an unauthenticated view on its next render.
pub struct ClearTokenOnUnauthorized {
    store: AuthTokenStore,
}

impl ClearTokenOnUnauthorized {
    #[must_use]
    pub fn new(store: AuthTokenStore) -> Self {
        Self { store }
    }
}

impl UnauthorizedHandler for ClearTokenOnUnauthorized {
    fn on_unauthorized(&self) {
        warn!("bearer token rejected by server, clearing stored credential");
        self.store.clear_token();
    }
}

/// Decorates every outbound call with credentials and anti-forgery
/// protection and reacts to authentication failures.
///
/// Decoration per dispatch: bearer header when a token is set, the
/// programmatic-request marker always, an anti-forgery header on mutating
/// methods. A 403 on a mutating call triggers one token refresh and one
/// retry of the identical request; a second rejection propagates.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    csrf: Arc<CsrfTokenCache>,
    bearer: Option<Arc<dyn BearerTokenProvider>>,
    unauthorized: Option<Arc<dyn UnauthorizedHandler>>,
}

impl ApiClient {
    pub fn new(
        config: &ApiClientConfig,
        transport: Arc<dyn HttpTransport>,
        csrf: Arc<CsrfTokenCache>,
    ) -> Result<Self, ApiClientError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            transport,
            csrf,
            bearer: None,
            unauthorized: None,
        })
    }

    #[must_use]
    pub fn with_bearer_provider(mut self, provider: Arc<dyn BearerTokenProvider>) -> Self {
        self.bearer = Some(provider);
        self
    }

    #[must_use]
    pub fn with_unauthorized_handler(mut self, handler: Arc<dyn UnauthorizedHandler>) -> Self {
        self.unauthorized = Some(handler);
        self
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    /// Dispatch one decorated request and run the response protocol.
    ///
    /// Transport failures and non-success statuses other than the
    /// 403-retry case propagate unchanged; there is no automatic retry
    /// beyond the single anti-forgery refresh.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<TransportResponse, ApiClientError> {
        let url = self.endpoint(path).ok_or(ApiClientError::InvalidPath)?;
        let mutating = is_mutating(&method);
        let mut csrf_retried = false;

        loop {
            let mut headers: Vec<(String, String)> = vec![
                (
                    PROGRAMMATIC_REQUEST_HEADER.to_string(),
                    PROGRAMMATIC_REQUEST_VALUE.to_string(),
                ),
                (
                    "x-request-id".to_string(),
                    format!("req_{}", Uuid::new_v4().simple()),
                ),
            ];
            if let Some(provider) = &self.bearer {
                if let Some(token) = provider.bearer_token() {
                    headers.push(("authorization".to_string(), format!("Bearer {token}")));
                }
            }
            if mutating {
                let token = self.csrf.token().await?;
                headers.push((CSRF_TOKEN_HEADER.to_string(), token));
            }

            let response = self
                .transport
                .execute(TransportRequest {
                    method: method.clone(),
                    url: url.clone(),
                    headers,
                    body: body.cloned(),
                })
                .await?;

            let status = response.status;
            if status == StatusCode::UNAUTHORIZED {
                if let Some(handler) = &self.unauthorized {
                    handler.on_unauthorized();
                }
                return Err(format_http_error(status, &response.body));
            }
            if status == StatusCode::FORBIDDEN && mutating && !csrf_retried {
                csrf_retried = true;
                debug!("anti-forgery token rejected for {path}, retrying once with a fresh one");
                self.csrf.invalidate().await;
                continue;
            }
            if !status.is_success() {
                return Err(format_http_error(status, &response.body));
            }
            return Ok(response);
        }
    }

    pub async fn get_json<T>(&self, path: &str) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(Method::GET, path, None).await?;
        decode_json_body(&response.body)
    }

    /// Like [`get_json`](Self::get_json), with 404 mapped to `None`.
    pub async fn get_optional_json<T>(&self, path: &str) -> Result<Option<T>, ApiClientError>
    where
        T: DeserializeOwned,
    {
        match self.send(Method::GET, path, None).await {
            Ok(response) => decode_json_body(&response.body).map(Some),
            Err(ApiClientError::Http { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub async fn post_json<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res, ApiClientError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let body = encode_json_payload(payload)?;
        let response = self.send(Method::POST, path, Some(&body)).await?;
        decode_json_body(&response.body)
    }

    pub async fn put_json<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res, ApiClientError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let body = encode_json_payload(payload)?;
        let response = self.send(Method::PUT, path, Some(&body)).await?;
        decode_json_body(&response.body)
    }

    /// Issue a DELETE; the response body, if any, is discarded.
    pub async fn delete(&self, path: &str) -> Result<(), ApiClientError> {
        self.send(Method::DELETE, path, None).await.map(|_| ())
    }
}

fn is_mutating(method: &Method) -> bool {
    !matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn encode_json_payload<Req>(payload: &Req) -> Result<serde_json::Value, ApiClientError>
where
    Req: Serialize + ?Sized,
{
    serde_json::to_value(payload).map_err(|error| ApiClientError::Decode {
        message: error.to_string(),
    })
}

fn decode_json_body<T>(body: &[u8]) -> Result<T, ApiClientError>
where
    T: DeserializeOwned,
{
    serde_json::from_slice::<T>(body).map_err(|error| ApiClientError::Decode {
        message: error.to_string(),
    })
}
