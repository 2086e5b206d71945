//! Credential primitives for the atelier admin console.
//!
//! This crate intentionally exposes a small surface:
//! - bearer token store with tab-scoped persistence and change broadcast
//! - anti-forgery token cache with single-flight refresh
//! - session model and the probe port consumed by the mode controller

pub mod csrf;
pub mod error;
pub mod session;
pub mod token_store;

pub use csrf::{CSRF_EXPIRY_SAFETY_MARGIN_SECS, CsrfToken, CsrfTokenCache, CsrfTokenFetcher};
pub use error::{AuthError, Result};
pub use session::{Session, SessionProbe};
pub use token_store::{AuthTokenStore, InMemoryTokenStorage, TokenStorage, TokenSubscription};
