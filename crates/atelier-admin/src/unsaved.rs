//! Registry of editing surfaces holding unsaved local edits.

use std::collections::BTreeSet;

/// Set of opaque ids, one per independent editing surface.
#[derive(Debug, Default)]
pub struct UnsavedChangeSet {
    ids: BTreeSet<String>,
}

impl UnsavedChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dirty surface. Blank ids are ignored; re-registering an
    /// already-tracked id is a no-op. Returns `true` when the id is
    /// tracked afterwards.
    pub fn register(&mut self, id: &str) -> bool {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.ids.insert(trimmed.to_string());
        true
    }

    /// Clear a previously-registered id; unknown ids are a no-op.
    pub fn clear(&mut self, id: &str) {
        self.ids.remove(id.trim());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}
