//! The privileged-mode state machine.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use atelier_auth::{Session, SessionProbe};
use tracing::{debug, info, warn};

use crate::mode::{Mode, append_mode_to, mode_from_target};
use crate::ports::{ConfirmationPort, NavigationPort};
use crate::unsaved::UnsavedChangeSet;

/// Prompt shown before a transition would discard unsaved edits.
pub const UNSAVED_CHANGES_PROMPT: &str =
    "You have unsaved changes. Leave this page and discard them?";

/// Options for mode transitions and mode-aware navigation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeChangeOptions {
    /// Skip the unsaved-change confirmation gate.
    pub suppress_prompt: bool,
}

struct ControllerState {
    mode: Mode,
    current_url: String,
    // None = never probed (counts as inactive for gating).
    session: Option<Session>,
    unsaved: UnsavedChangeSet,
}

/// Single source of truth for privileged-mode.
///
/// Derives the mode from the URL, gates admin entry on the last-known
/// session, keeps the URL synchronized through replace-style updates
/// (never a new history entry for a pure mode flip), and runs the
/// unsaved-change gate before every transition and mode-aware navigation.
///
/// Cheap to clone; clones share state, so a token-change listener can
/// hold one while the UI holds another.
#[derive(Clone)]
pub struct ModeController {
    state: Arc<RwLock<ControllerState>>,
    probe: Arc<dyn SessionProbe>,
    confirmation: Arc<dyn ConfirmationPort>,
    navigation: Arc<dyn NavigationPort>,
}

impl ModeController {
    /// Build a controller whose initial mode is parsed from `initial_url`.
    ///
    /// Session gating applies from the first refresh, invalidation, or
    /// navigation onward; callers are expected to refresh promptly after
    /// construction.
    pub fn new(
        initial_url: &str,
        probe: Arc<dyn SessionProbe>,
        confirmation: Arc<dyn ConfirmationPort>,
        navigation: Arc<dyn NavigationPort>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(ControllerState {
                mode: mode_from_target(initial_url),
                current_url: initial_url.to_string(),
                session: None,
                unsaved: UnsavedChangeSet::new(),
            })),
            probe,
            confirmation,
            navigation,
        }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.read_state().mode
    }

    #[must_use]
    pub fn current_url(&self) -> String {
        self.read_state().current_url.clone()
    }

    /// Email of the active session, for the admin chrome.
    #[must_use]
    pub fn session_email(&self) -> Option<String> {
        self.read_state()
            .session
            .as_ref()
            .filter(|session| session.active)
            .and_then(|session| session.email.clone())
    }

    /// Roles of the active session, for the admin chrome.
    #[must_use]
    pub fn session_roles(&self) -> Vec<String> {
        self.read_state()
            .session
            .as_ref()
            .filter(|session| session.active)
            .map(|session| session.roles.clone())
            .unwrap_or_default()
    }

    /// Ask the probe for the current session and re-enforce the gate.
    ///
    /// A probe error is treated identically to "no active session": admin
    /// access is never granted on a network failure.
    pub async fn refresh_session(&self) -> Session {
        let session = match self.probe.probe().await {
            Ok(session) => session,
            Err(error) => {
                warn!("session probe failed, treating session as inactive: {error}");
                Session::inactive()
            }
        };
        {
            let mut state = self.write_state();
            state.session = Some(session.clone());
        }
        self.enforce_session_gate();
        session
    }

    /// Forget the last probe result (e.g. after a credential change) and
    /// fall back to view mode until the next refresh proves otherwise.
    pub fn invalidate_session(&self) {
        {
            let mut state = self.write_state();
            state.session = None;
        }
        self.enforce_session_gate();
    }

    /// React to the URL changing underneath the controller.
    ///
    /// A URL requesting admin mode without an active session is silently
    /// corrected: the parameter is stripped with a replace-style update
    /// and the mode stays view. No confirmation runs; this is a
    /// consistency repair, not a user-initiated leave.
    pub fn handle_location_change(&self, url: &str) {
        let desired = mode_from_target(url);
        let correction = {
            let mut state = self.write_state();
            state.current_url = url.to_string();
            if desired.is_admin() && !session_is_active(&state) {
                let corrected = append_mode_to(url, Mode::View);
                state.mode = Mode::View;
                state.current_url = corrected.clone();
                Some(corrected)
            } else {
                state.mode = desired;
                None
            }
        };
        if let Some(corrected) = correction {
            debug!("stripping admin mode from navigation without an active session");
            self.navigation.replace_url(&corrected);
        }
    }

    /// Switch modes.
    ///
    /// Returns `false` with no state change when admin is requested
    /// without an active session, or when the confirmation gate declines.
    /// Switching to the current mode is a successful no-op.
    pub fn set_mode(&self, next: Mode, options: ModeChangeOptions) -> bool {
        if next.is_admin() && !session_is_active(&self.read_state()) {
            debug!("rejecting admin mode without an active session");
            return false;
        }
        if next == self.mode() {
            return true;
        }
        if !options.suppress_prompt && !self.confirm_if_unsaved() {
            return false;
        }

        let url = {
            let mut state = self.write_state();
            let url = append_mode_to(&state.current_url, next);
            state.mode = next;
            state.current_url = url.clone();
            url
        };
        info!(mode = next.as_str(), "switched ui mode");
        self.navigation.replace_url(&url);
        true
    }

    pub fn toggle_mode(&self, options: ModeChangeOptions) -> bool {
        self.set_mode(self.mode().toggled(), options)
    }

    /// Rewrite a navigation target so its query carries `target_mode`,
    /// defaulting to the current mode. This default is what makes mode
    /// stick across ordinary link clicks.
    #[must_use]
    pub fn append_mode_to(&self, target: &str, target_mode: Option<Mode>) -> String {
        append_mode_to(target, target_mode.unwrap_or_else(|| self.mode()))
    }

    /// Navigate to `target` carrying a mode, gated on the unsaved-change
    /// confirmation. Returns `false` when the gate declines; no
    /// navigation happens in that case.
    pub fn navigate_with_mode(
        &self,
        target: &str,
        target_mode: Option<Mode>,
        options: ModeChangeOptions,
    ) -> bool {
        if !options.suppress_prompt && !self.confirm_if_unsaved() {
            return false;
        }
        let url = self.append_mode_to(target, target_mode);
        self.navigation.navigate(&url);
        true
    }

    /// Register a dirty editing surface. Blank ids are ignored;
    /// registration is idempotent.
    pub fn register_unsaved_change(&self, id: &str) {
        self.write_state().unsaved.register(id);
    }

    /// Clear a dirty editing surface; unknown ids are a no-op.
    pub fn clear_unsaved_change(&self, id: &str) {
        self.write_state().unsaved.clear(id);
    }

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        !self.read_state().unsaved.is_empty()
    }

    /// The unsaved-change gate: `true` immediately, without prompting,
    /// when nothing is dirty; otherwise the host's yes/no answer.
    pub fn confirm_if_unsaved(&self) -> bool {
        if !self.has_unsaved_changes() {
            return true;
        }
        self.confirmation.confirm(UNSAVED_CHANGES_PROMPT)
    }

    /// One-way signal for the host's native tab-close/reload prompt:
    /// `true` whenever unsaved changes exist. The native prompt cannot be
    /// answered programmatically, so this never consults the
    /// confirmation port.
    #[must_use]
    pub fn should_block_unload(&self) -> bool {
        self.has_unsaved_changes()
    }

    fn enforce_session_gate(&self) {
        let correction = {
            let mut state = self.write_state();
            if state.mode.is_admin() && !session_is_active(&state) {
                let corrected = append_mode_to(&state.current_url, Mode::View);
                state.mode = Mode::View;
                state.current_url = corrected.clone();
                Some(corrected)
            } else {
                None
            }
        };
        if let Some(corrected) = correction {
            info!("no active session, falling back to view mode");
            self.navigation.replace_url(&corrected);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ControllerState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ControllerState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn session_is_active(state: &ControllerState) -> bool {
    state
        .session
        .as_ref()
        .is_some_and(|session| session.active)
}
