#![forbid(unsafe_code)]

//! Overlay identity and per-overlay scroll storage.
//!
//! A sheet hosts one overlay at a time (search results, a detail page, a
//! profile). Overlays nest under a root overlay; position memory and scroll
//! persistence are keyed by these identities.

use std::sync::Arc;

use ahash::AHashMap;

/// Cheaply clonable overlay identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(Arc<str>);

impl OverlayId {
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OverlayId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for OverlayId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl std::fmt::Display for OverlayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Active and previously active overlay of one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayStack {
    root: OverlayId,
    active: OverlayId,
    previous: Option<OverlayId>,
}

impl OverlayStack {
    /// A stack whose active overlay is the root itself.
    #[must_use]
    pub fn new(root: OverlayId) -> Self {
        Self {
            active: root.clone(),
            root,
            previous: None,
        }
    }

    #[must_use]
    pub fn root(&self) -> &OverlayId {
        &self.root
    }

    #[must_use]
    pub fn active(&self) -> &OverlayId {
        &self.active
    }

    #[must_use]
    pub fn previous(&self) -> Option<&OverlayId> {
        self.previous.as_ref()
    }

    /// Make `next` active. Returns the outgoing overlay, or `None` if
    /// `next` was already active.
    pub fn switch_to(&mut self, next: OverlayId) -> Option<OverlayId> {
        if next == self.active {
            return None;
        }
        let outgoing = std::mem::replace(&mut self.active, next);
        self.previous = Some(outgoing.clone());
        Some(outgoing)
    }
}

/// Where per-overlay list offsets live between visits.
pub trait OverlayScrollStore {
    fn get_scroll_offset(&self, overlay: &OverlayId) -> Option<f64>;
    fn set_scroll_offset(&mut self, overlay: &OverlayId, offset: f64);
}

/// Process-local [`OverlayScrollStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryScrollStore {
    offsets: AHashMap<OverlayId, f64>,
}

impl InMemoryScrollStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

impl OverlayScrollStore for InMemoryScrollStore {
    fn get_scroll_offset(&self, overlay: &OverlayId) -> Option<f64> {
        self.offsets.get(overlay).copied()
    }

    fn set_scroll_offset(&mut self, overlay: &OverlayId, offset: f64) {
        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        self.offsets.insert(overlay.clone(), offset);
    }
}
