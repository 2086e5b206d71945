//! Injectable host ports for the mode controller.

/// Yes/no confirmation shown before a transition would discard unsaved
/// edits. Tests supply deterministic fakes; browser hosts show a native
/// dialog, other hosts whatever fits their platform.
pub trait ConfirmationPort: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Host navigation surface.
///
/// `replace_url` must not append a history entry; the controller uses it
/// for mode flips and consistency corrections. `navigate` performs a real
/// route transition.
pub trait NavigationPort: Send + Sync {
    fn replace_url(&self, url: &str);
    fn navigate(&self, url: &str);
}
