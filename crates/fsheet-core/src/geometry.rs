#![forbid(unsafe_code)]

//! Snap geometry: logical positions and their pixel offsets.
//!
//! All offsets are in screen space: origin at the top of the screen,
//! increasing downward. A smaller offset means the sheet is more open.
//!
//! # Invariants
//!
//! 1. For every [`SnapProfile`]:
//!    `expanded <= middle <= collapsed <= hidden.unwrap_or(collapsed)`.
//! 2. Out-of-order or non-finite inputs are repaired at construction time,
//!    never stored as-is.
//! 3. A profile without a `hidden` offset is non-dismissible; resolving
//!    [`SnapKey::Hidden`] yields the collapsed offset.

/// One of the discrete resting positions of the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum SnapKey {
    /// Fully open.
    Expanded,
    /// Half open.
    Middle,
    /// Only the header is visible above the host navigation bar.
    Collapsed,
    /// Off screen.
    Hidden,
}

impl SnapKey {
    /// All keys ordered from most open to least open.
    pub const ALL: [SnapKey; 4] = [
        SnapKey::Expanded,
        SnapKey::Middle,
        SnapKey::Collapsed,
        SnapKey::Hidden,
    ];

    /// Stable lowercase name, used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expanded => "expanded",
            Self::Middle => "middle",
            Self::Collapsed => "collapsed",
            Self::Hidden => "hidden",
        }
    }
}

impl std::fmt::Display for SnapKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who initiated a snap.
///
/// Position memory only records [`SnapSource::Gesture`] snaps, so external
/// navigation never overwrites what the user chose by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapSource {
    /// A touch release resolved the destination.
    Gesture,
    /// Visibility changes, imperative `snap_to`, or overlay switches.
    Programmatic,
}

/// Pixel offsets for each [`SnapKey`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapProfile {
    expanded: f64,
    middle: f64,
    collapsed: f64,
    hidden: Option<f64>,
}

impl Default for SnapProfile {
    /// A plausible phone-sized profile, used before the first measurement.
    fn default() -> Self {
        Self::new(56.0, 380.0, 700.0, Some(868.0))
    }
}

impl SnapProfile {
    /// Build a profile, repairing ordering violations by clamping each
    /// derived value against its predecessor.
    ///
    /// Non-finite values are replaced with the predecessor (or `0.0` for
    /// `expanded`). A non-finite `hidden` is treated as absent.
    #[must_use]
    pub fn new(expanded: f64, middle: f64, collapsed: f64, hidden: Option<f64>) -> Self {
        let expanded = finite_or(expanded, 0.0);
        let middle = finite_or(middle, expanded).max(expanded);
        let collapsed = finite_or(collapsed, middle).max(middle);
        let hidden = hidden
            .filter(|h| h.is_finite())
            .map(|h| h.max(collapsed));
        Self {
            expanded,
            middle,
            collapsed,
            hidden,
        }
    }

    /// Offset of the fully open position.
    #[inline]
    #[must_use]
    pub fn expanded(&self) -> f64 {
        self.expanded
    }

    /// Offset of the half open position.
    #[inline]
    #[must_use]
    pub fn middle(&self) -> f64 {
        self.middle
    }

    /// Offset of the collapsed position.
    #[inline]
    #[must_use]
    pub fn collapsed(&self) -> f64 {
        self.collapsed
    }

    /// Offset of the hidden position, if the profile has one.
    #[inline]
    #[must_use]
    pub fn hidden(&self) -> Option<f64> {
        self.hidden
    }

    /// Whether the sheet can be dragged off screen.
    #[inline]
    #[must_use]
    pub fn is_dismissible(&self) -> bool {
        self.hidden.is_some()
    }

    /// Lowest reachable offset: `hidden` if present, else `collapsed`.
    #[inline]
    #[must_use]
    pub fn dismiss_or_collapsed(&self) -> f64 {
        self.hidden.unwrap_or(self.collapsed)
    }

    /// Pixel offset for `key`. `Hidden` on a non-dismissible profile maps to
    /// the collapsed offset.
    #[must_use]
    pub fn offset(&self, key: SnapKey) -> f64 {
        match key {
            SnapKey::Expanded => self.expanded,
            SnapKey::Middle => self.middle,
            SnapKey::Collapsed => self.collapsed,
            SnapKey::Hidden => self.dismiss_or_collapsed(),
        }
    }

    /// Clamp an arbitrary offset into `[expanded, dismiss_or_collapsed]`.
    #[must_use]
    pub fn clamp(&self, offset: f64) -> f64 {
        if !offset.is_finite() {
            return self.collapsed;
        }
        offset.clamp(self.expanded, self.dismiss_or_collapsed())
    }

    /// Candidate resting positions, most open first.
    ///
    /// Four entries when `dismissible` and the profile has a hidden offset,
    /// otherwise three.
    #[must_use]
    pub fn candidates(&self, dismissible: bool) -> Vec<(SnapKey, f64)> {
        let mut out = vec![
            (SnapKey::Expanded, self.expanded),
            (SnapKey::Middle, self.middle),
            (SnapKey::Collapsed, self.collapsed),
        ];
        if dismissible && let Some(hidden) = self.hidden {
            out.push((SnapKey::Hidden, hidden));
        }
        out
    }

    /// Key whose offset is closest to `offset`. Ties go to the more open key.
    #[must_use]
    pub fn nearest_key(&self, offset: f64, dismissible: bool) -> SnapKey {
        nearest(&self.candidates(dismissible), offset)
    }

    /// Key whose offset lies within `epsilon` of `offset`, if any.
    #[must_use]
    pub fn key_at(&self, offset: f64, epsilon: f64) -> Option<SnapKey> {
        self.candidates(true)
            .into_iter()
            .find(|(_, o)| (o - offset).abs() <= epsilon)
            .map(|(k, _)| k)
    }
}

/// Nearest candidate to `target`; earlier candidates win ties.
pub(crate) fn nearest(candidates: &[(SnapKey, f64)], target: f64) -> SnapKey {
    let mut best = SnapKey::Collapsed;
    let mut best_dist = f64::INFINITY;
    for &(key, offset) in candidates {
        let dist = (offset - target).abs();
        if dist < best_dist {
            best = key;
            best_dist = dist;
        }
    }
    best
}

#[inline]
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> SnapProfile {
        SnapProfile::new(0.0, 300.0, 600.0, Some(700.0))
    }

    #[test]
    fn ordered_input_is_kept() {
        let p = reference();
        assert_eq!(p.expanded(), 0.0);
        assert_eq!(p.middle(), 300.0);
        assert_eq!(p.collapsed(), 600.0);
        assert_eq!(p.hidden(), Some(700.0));
    }

    #[test]
    fn inverted_input_is_clamped() {
        let p = SnapProfile::new(400.0, 100.0, 50.0, Some(10.0));
        assert_eq!(p.middle(), 400.0);
        assert_eq!(p.collapsed(), 400.0);
        assert_eq!(p.hidden(), Some(400.0));
    }

    #[test]
    fn nan_inputs_are_repaired() {
        let p = SnapProfile::new(f64::NAN, 200.0, f64::INFINITY, Some(f64::NAN));
        assert_eq!(p.expanded(), 0.0);
        assert_eq!(p.collapsed(), 200.0);
        assert!(!p.is_dismissible());
    }

    #[test]
    fn hidden_falls_back_to_collapsed() {
        let p = SnapProfile::new(0.0, 300.0, 600.0, None);
        assert_eq!(p.offset(SnapKey::Hidden), 600.0);
        assert_eq!(p.dismiss_or_collapsed(), 600.0);
        assert_eq!(p.candidates(true).len(), 3);
    }

    #[test]
    fn candidates_respect_dismissible_flag() {
        let p = reference();
        assert_eq!(p.candidates(true).len(), 4);
        assert_eq!(p.candidates(false).len(), 3);
    }

    #[test]
    fn clamp_bounds() {
        let p = reference();
        assert_eq!(p.clamp(-50.0), 0.0);
        assert_eq!(p.clamp(900.0), 700.0);
        assert_eq!(p.clamp(f64::NAN), 600.0);
    }

    #[test]
    fn nearest_key_prefers_more_open_on_tie() {
        let p = reference();
        assert_eq!(p.nearest_key(450.0, true), SnapKey::Middle);
        assert_eq!(p.nearest_key(680.0, true), SnapKey::Hidden);
        assert_eq!(p.nearest_key(680.0, false), SnapKey::Collapsed);
    }

    #[test]
    fn key_at_within_epsilon() {
        let p = reference();
        assert_eq!(p.key_at(300.2, 0.5), Some(SnapKey::Middle));
        assert_eq!(p.key_at(310.0, 0.5), None);
    }

    #[test]
    fn snap_key_display() {
        assert_eq!(SnapKey::Collapsed.to_string(), "collapsed");
    }
}
