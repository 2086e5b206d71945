//! Bearer credential store with persistence and change broadcast.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use tracing::{debug, warn};
use url::form_urlencoded;

use crate::error::{AuthError, Result};

/// Fragment key consumed from a post-login redirect URL.
const LOGIN_FRAGMENT_TOKEN_KEY: &str = "token";

/// Pluggable tab-scoped persistence for the bearer credential.
///
/// Hosts back this with whatever per-tab storage they have; tests use
/// [`InMemoryTokenStorage`]. All writes to the underlying storage go
/// through the store, never around it.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn persist(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// In-memory storage for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct InMemoryTokenStorage {
    slot: RwLock<Option<String>>,
}

impl InMemoryTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for InMemoryTokenStorage {
    fn load(&self) -> Result<Option<String>> {
        self.slot
            .read()
            .map(|slot| slot.clone())
            .map_err(|_| AuthError::Storage("storage lock poisoned".to_string()))
    }

    fn persist(&self, token: &str) -> Result<()> {
        let mut slot = self
            .slot
            .write()
            .map_err(|_| AuthError::Storage("storage lock poisoned".to_string()))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .slot
            .write()
            .map_err(|_| AuthError::Storage("storage lock poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}

type TokenListener = Arc<dyn Fn(Option<&str>) + Send + Sync>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    listeners: HashMap<u64, TokenListener>,
}

/// Holds, persists, and broadcasts the tab's bearer credential.
///
/// Cheap to clone; clones share the same token and subscriber set.
#[derive(Clone)]
pub struct AuthTokenStore {
    storage: Arc<dyn TokenStorage>,
    token: Arc<RwLock<Option<String>>>,
    listeners: Arc<RwLock<ListenerRegistry>>,
}

impl AuthTokenStore {
    /// Create a store, adopting any token already persisted for the tab.
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        let initial = match storage.load() {
            Ok(token) => token.and_then(normalize_token),
            Err(error) => {
                warn!("failed to load persisted bearer token: {error}");
                None
            }
        };

        Self {
            storage,
            token: Arc::new(RwLock::new(initial)),
            listeners: Arc::new(RwLock::new(ListenerRegistry::default())),
        }
    }

    /// Current bearer credential, if one is set.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().map_or(None, |slot| slot.clone())
    }

    /// Set the bearer credential and notify subscribers.
    ///
    /// A blank or whitespace-only value behaves exactly like
    /// [`clear_token`](Self::clear_token).
    pub fn set_token(&self, value: &str) {
        let Some(token) = normalize_token(value.to_string()) else {
            self.clear_token();
            return;
        };

        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.clone());
        }
        if let Err(error) = self.storage.persist(&token) {
            warn!("failed to persist bearer token: {error}");
        }
        self.notify(Some(&token));
    }

    /// Drop the bearer credential and notify subscribers.
    pub fn clear_token(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
        if let Err(error) = self.storage.clear() {
            warn!("failed to clear persisted bearer token: {error}");
        }
        self.notify(None);
    }

    /// Explicit sign-out: drops the credential and notifies subscribers.
    pub fn logout(&self) {
        debug!("clearing bearer token on logout");
        self.clear_token();
    }

    /// Register a listener invoked with the new value on every set/clear.
    ///
    /// Multiple independent subscribers may coexist; the returned handle
    /// removes this one.
    pub fn subscribe(
        &self,
        listener: impl Fn(Option<&str>) + Send + Sync + 'static,
    ) -> TokenSubscription {
        let id = {
            let mut registry = match self.listeners.write() {
                Ok(registry) => registry,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry.next_id += 1;
            let id = registry.next_id;
            registry.listeners.insert(id, Arc::new(listener));
            id
        };

        TokenSubscription {
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    /// Parse a bearer credential out of a post-login redirect fragment.
    ///
    /// Accepts the raw `location.hash` shape (`"#token=abc&state=xyz"`),
    /// strips any number of leading `#`, and returns the trimmed `token`
    /// value. Returns `None` when the key is missing, the value is blank
    /// after trimming, or the input is empty.
    #[must_use]
    pub fn extract_token_from_hash(hash: &str) -> Option<String> {
        let stripped = hash.trim_start_matches('#');
        if stripped.is_empty() {
            return None;
        }

        for (key, value) in form_urlencoded::parse(stripped.as_bytes()) {
            if key == LOGIN_FRAGMENT_TOKEN_KEY {
                return normalize_token(value.into_owned());
            }
        }
        None
    }

    /// Adopt a credential from a post-login redirect fragment.
    ///
    /// Returns `true` when a token was present and stored.
    pub fn complete_login(&self, hash: &str) -> bool {
        match Self::extract_token_from_hash(hash) {
            Some(token) => {
                debug!("adopting bearer token from login redirect");
                self.set_token(&token);
                true
            }
            None => false,
        }
    }

    fn notify(&self, token: Option<&str>) {
        // Snapshot outside the lock so a listener may re-enter the store.
        let listeners: Vec<TokenListener> = match self.listeners.read() {
            Ok(registry) => registry.listeners.values().cloned().collect(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(token);
        }
    }
}

/// Unsubscribe handle returned by [`AuthTokenStore::subscribe`].
pub struct TokenSubscription {
    id: u64,
    registry: Weak<RwLock<ListenerRegistry>>,
}

impl TokenSubscription {
    /// Remove the listener; later token changes are not delivered to it.
    pub fn unsubscribe(self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = match registry.write() {
            Ok(registry) => registry,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry.listeners.remove(&self.id);
    }
}

fn normalize_token(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
