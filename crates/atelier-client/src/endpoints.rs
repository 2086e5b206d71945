//! HTTP-backed implementations of the auth-layer ports.

use std::sync::Arc;

use async_trait::async_trait;
use atelier_auth::{AuthError, CsrfToken, CsrfTokenFetcher, Session, SessionProbe};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;

use crate::client::{
    ApiClient, BearerTokenProvider, PROGRAMMATIC_REQUEST_HEADER, PROGRAMMATIC_REQUEST_VALUE,
};
use crate::transport::{HttpTransport, TransportRequest};

#[derive(Debug, Deserialize)]
struct CsrfTokenEnvelope {
    data: CsrfTokenPayload,
}

#[derive(Debug, Deserialize)]
struct CsrfTokenPayload {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Fetches anti-forgery tokens from the fixed token endpoint.
///
/// Goes straight through the transport rather than [`ApiClient`]: the
/// token cache this feeds sits inside the client, and the fetch itself is
/// a safe GET that needs no anti-forgery header. The server sets its
/// same-site cookie on this response; the transport's cookie store
/// carries it on later calls.
pub struct HttpCsrfFetcher {
    transport: Arc<dyn HttpTransport>,
    url: String,
    bearer: Option<Arc<dyn BearerTokenProvider>>,
}

impl HttpCsrfFetcher {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            bearer: None,
        }
    }

    #[must_use]
    pub fn with_bearer_provider(mut self, provider: Arc<dyn BearerTokenProvider>) -> Self {
        self.bearer = Some(provider);
        self
    }
}

#[async_trait]
impl CsrfTokenFetcher for HttpCsrfFetcher {
    async fn fetch_token(&self) -> atelier_auth::Result<CsrfToken> {
        let mut headers = vec![(
            PROGRAMMATIC_REQUEST_HEADER.to_string(),
            PROGRAMMATIC_REQUEST_VALUE.to_string(),
        )];
        if let Some(provider) = &self.bearer {
            if let Some(token) = provider.bearer_token() {
                headers.push(("authorization".to_string(), format!("Bearer {token}")));
            }
        }

        let response = self
            .transport
            .execute(TransportRequest {
                method: Method::GET,
                url: self.url.clone(),
                headers,
                body: None,
            })
            .await
            .map_err(|error| AuthError::CsrfFetch(error.to_string()))?;

        if !response.status.is_success() {
            return Err(AuthError::CsrfFetch(format!(
                "token endpoint returned {}",
                response.status
            )));
        }

        let envelope: CsrfTokenEnvelope = serde_json::from_slice(&response.body)
            .map_err(|error| AuthError::CsrfFetch(error.to_string()))?;
        Ok(CsrfToken {
            token: envelope.data.token,
            expires_at: envelope.data.expires_at,
        })
    }
}

/// Asks the server whether a privileged session is active.
///
/// Issues a safe GET through [`ApiClient`], so the probe carries the
/// bearer and marker headers like every other admin call.
pub struct HttpSessionProbe {
    client: ApiClient,
    path: String,
}

impl HttpSessionProbe {
    #[must_use]
    pub fn new(client: ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }
}

#[async_trait]
impl SessionProbe for HttpSessionProbe {
    async fn probe(&self) -> atelier_auth::Result<Session> {
        self.client
            .get_json::<Session>(&self.path)
            .await
            .map_err(|error| AuthError::SessionProbe(error.to_string()))
    }
}
