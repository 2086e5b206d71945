//! Anti-forgery token cache shared by all mutating calls.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

/// Safety margin subtracted from the server-declared expiry so a token
/// cannot expire mid-flight.
pub const CSRF_EXPIRY_SAFETY_MARGIN_SECS: i64 = 10;

/// Anti-forgery token with its declared expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CsrfToken {
    /// `true` while the token is still usable at `now`, margin applied.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(CSRF_EXPIRY_SAFETY_MARGIN_SECS)
    }
}

/// Source of fresh anti-forgery tokens.
#[async_trait]
pub trait CsrfTokenFetcher: Send + Sync {
    async fn fetch_token(&self) -> Result<CsrfToken>;
}

/// One shared anti-forgery token with expiry, fetched on demand.
///
/// The slot mutex is held across the fetch: concurrent cold callers
/// queue on the lock and all but the first find the fresh token cached,
/// so a cold cache issues exactly one underlying request.
pub struct CsrfTokenCache {
    fetcher: Arc<dyn CsrfTokenFetcher>,
    slot: Mutex<Option<CsrfToken>>,
}

impl CsrfTokenCache {
    #[must_use]
    pub fn new(fetcher: Arc<dyn CsrfTokenFetcher>) -> Self {
        Self {
            fetcher,
            slot: Mutex::new(None),
        }
    }

    /// Current anti-forgery token value.
    ///
    /// Serves the cached token while it is fresh; otherwise fetches a new
    /// one, caches it, and returns it.
    pub async fn token(&self) -> Result<String> {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.fetcher.fetch_token().await?;
        debug!(expires_at = %fresh.expires_at, "refreshed csrf token");
        let token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(token)
    }

    /// Drop the cached token and expiry; the next call re-fetches.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            debug!("invalidated cached csrf token");
        }
    }
}
