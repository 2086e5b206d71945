//! Session model and the probe port consumed by the mode controller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Server-verified session summary.
///
/// Ephemeral: fetched per probe, never persisted client-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl Session {
    /// Session value used when the server denies or the probe fails.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }
}

/// Asks the server whether a privileged session is active.
#[async_trait]
pub trait SessionProbe: Send + Sync {
    async fn probe(&self) -> Result<Session>;
}
