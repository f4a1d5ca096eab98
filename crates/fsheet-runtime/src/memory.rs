#![forbid(unsafe_code)]

//! Per-overlay recall of the last user-chosen snap key.
//!
//! Only gesture-sourced snaps are recorded. Programmatic snaps (visibility
//! changes, imperative requests, overlay switches) are ignored so external
//! navigation never overwrites what the user picked by hand.

use ahash::AHashMap;
use fsheet_core::geometry::{SnapKey, SnapSource};

use crate::overlay::OverlayId;

/// `(root overlay, overlay)` → last gesture-sourced key.
#[derive(Debug, Clone, Default)]
pub struct PositionMemory {
    entries: AHashMap<(OverlayId, OverlayId), SnapKey>,
}

impl PositionMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` if `source` is a gesture. Returns whether it was stored.
    ///
    /// `Hidden` is never remembered: re-entering an overlay must show it.
    pub fn record_user_snap(
        &mut self,
        root: &OverlayId,
        overlay: &OverlayId,
        key: SnapKey,
        source: SnapSource,
    ) -> bool {
        if source != SnapSource::Gesture || key == SnapKey::Hidden {
            return false;
        }
        tracing::debug!(%root, %overlay, key = key.as_str(), "remember user snap");
        self.entries.insert((root.clone(), overlay.clone()), key);
        true
    }

    /// Last recorded key for the pair, or `default`.
    #[must_use]
    pub fn resolve_remembered(
        &self,
        root: &OverlayId,
        overlay: &OverlayId,
        default: SnapKey,
    ) -> SnapKey {
        self.entries
            .get(&(root.clone(), overlay.clone()))
            .copied()
            .unwrap_or(default)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (OverlayId, OverlayId, OverlayId) {
        ("home".into(), "search".into(), "detail".into())
    }

    #[test]
    fn gesture_snaps_are_recorded() {
        let (root, search, _) = ids();
        let mut mem = PositionMemory::new();
        assert!(mem.record_user_snap(&root, &search, SnapKey::Expanded, SnapSource::Gesture));
        assert_eq!(
            mem.resolve_remembered(&root, &search, SnapKey::Middle),
            SnapKey::Expanded
        );
    }

    #[test]
    fn programmatic_snaps_are_ignored() {
        let (root, search, _) = ids();
        let mut mem = PositionMemory::new();
        mem.record_user_snap(&root, &search, SnapKey::Collapsed, SnapSource::Gesture);
        assert!(!mem.record_user_snap(&root, &search, SnapKey::Expanded, SnapSource::Programmatic));
        assert_eq!(
            mem.resolve_remembered(&root, &search, SnapKey::Middle),
            SnapKey::Collapsed
        );
    }

    #[test]
    fn hidden_is_not_remembered() {
        let (root, search, _) = ids();
        let mut mem = PositionMemory::new();
        assert!(!mem.record_user_snap(&root, &search, SnapKey::Hidden, SnapSource::Gesture));
        assert!(mem.is_empty());
    }

    #[test]
    fn keys_are_scoped_per_overlay_and_root() {
        let (root, search, detail) = ids();
        let other_root = OverlayId::from("profile");
        let mut mem = PositionMemory::new();
        mem.record_user_snap(&root, &search, SnapKey::Expanded, SnapSource::Gesture);
        assert_eq!(mem.resolve_remembered(&root, &detail, SnapKey::Middle), SnapKey::Middle);
        assert_eq!(
            mem.resolve_remembered(&other_root, &search, SnapKey::Collapsed),
            SnapKey::Collapsed
        );
        assert_eq!(mem.len(), 1);
    }
}
