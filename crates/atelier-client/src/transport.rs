//! Transport port and the reqwest-backed production implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};

use crate::error::ApiClientError;

/// Fully-decorated outbound request handed to the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

/// Raw response observed by the protocol layer.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Dispatches one prepared request.
///
/// The protocol layer above decides decoration and retries; a transport
/// performs exactly one exchange per call.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, ApiClientError>;
}

/// Production transport over reqwest.
///
/// Carries a cookie store: the anti-forgery endpoint sets a same-site
/// cookie that must accompany later mutating calls.
pub struct ReqwestTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout_ms: u64) -> Result<Self, ApiClientError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|error| ApiClientError::Transport {
                message: error.to_string(),
            })?;
        Ok(Self {
            http,
            timeout: Duration::from_millis(timeout_ms.max(250)),
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, ApiClientError> {
        let mut builder = self
            .http
            .request(request.method, request.url.as_str())
            .timeout(self.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| ApiClientError::Transport {
                message: error.to_string(),
            })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| ApiClientError::Read {
                message: error.to_string(),
            })?
            .to_vec();

        Ok(TransportResponse { status, body })
    }
}
