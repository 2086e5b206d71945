//! Privileged-mode controller for the atelier admin console.
//!
//! The controller is the single source of truth for whether the UI is in
//! admin or view mode: it derives the mode from the URL, gates admin
//! entry on a live server session, keeps the URL in sync through a
//! replace-style navigation port, and arbitrates every mode change and
//! mode-aware navigation against the unsaved-change registry.

pub mod bootstrap;
pub mod controller;
pub mod mode;
pub mod ports;
pub mod unsaved;

pub use bootstrap::{AdminRuntime, AdminRuntimeOptions, bootstrap, bootstrap_with_transport};
pub use controller::{ModeChangeOptions, ModeController, UNSAVED_CHANGES_PROMPT};
pub use mode::{ADMIN_MODE_VALUE, MODE_QUERY_PARAM, Mode, append_mode_to, mode_from_target};
pub use ports::{ConfirmationPort, NavigationPort};
pub use unsaved::UnsavedChangeSet;
