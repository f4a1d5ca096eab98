#![forbid(unsafe_code)]

//! Snap point derivation from layout measurements.
//!
//! [`SnapPointModel`] maps screen size, safe-area insets, the host navigation
//! bar, and the measured sheet header into a validated [`SnapProfile`].
//!
//! # Derivation
//!
//! ```text
//! expanded  = safe_top + top_inset_padding
//! middle    = max(expanded + min_gap, screen_height * middle_fraction)
//! collapsed = max(nav_aligned,         middle + min_gap)
//! hidden    = screen_height + hidden_overshoot
//! ```
//!
//! `nav_aligned` places the header directly above the navigation bar. When
//! no navigation bar is reported it sits above the bottom safe-area inset.
//!
//! # Failure Modes
//!
//! - Zero, negative, or NaN measurements are "not yet known" and replaced by
//!   the configured fallbacks. The model never fails; a slightly mis-sized
//!   sheet is preferable to no sheet.

use crate::config::SnapModelConfig;
use crate::geometry::SnapProfile;
use crate::logging::{debug, warn};

/// Raw layout measurements, all in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutInputs {
    pub screen_height: f64,
    pub safe_area_top: f64,
    pub safe_area_bottom: f64,
    /// Top edge of the host navigation bar (screen space), `0.0` if none.
    pub nav_bar_top: f64,
    pub nav_bar_height: f64,
    /// Measured sheet header height, `0.0` before first layout.
    pub header_height: f64,
}

impl LayoutInputs {
    /// Whether every required measurement is usable.
    #[must_use]
    pub fn is_measured(&self) -> bool {
        is_positive(self.screen_height) && is_positive(self.header_height)
    }
}

/// Memoized resolver from [`LayoutInputs`] to [`SnapProfile`].
#[derive(Debug, Clone)]
pub struct SnapPointModel {
    config: SnapModelConfig,
    inputs: Option<LayoutInputs>,
    profile: SnapProfile,
    dismissible: bool,
}

impl SnapPointModel {
    /// Create a model. Until [`update`](Self::update) is called the profile is
    /// derived from fallback measurements only.
    #[must_use]
    pub fn new(config: SnapModelConfig, dismissible: bool) -> Self {
        let profile = derive(&config, &LayoutInputs::default(), dismissible);
        Self {
            config,
            inputs: None,
            profile,
            dismissible,
        }
    }

    /// Current profile.
    #[inline]
    #[must_use]
    pub fn profile(&self) -> SnapProfile {
        self.profile
    }

    /// Whether the last measurements fed in were usable, as opposed to the
    /// pre-layout fallbacks.
    #[must_use]
    pub fn is_measured(&self) -> bool {
        self.inputs.is_some_and(|i| i.is_measured())
    }

    /// Feed new measurements. Returns the new profile if it changed.
    pub fn update(&mut self, inputs: LayoutInputs) -> Option<SnapProfile> {
        if self.inputs == Some(inputs) {
            return None;
        }
        self.inputs = Some(inputs);
        let next = derive(&self.config, &inputs, self.dismissible);
        if next == self.profile {
            return None;
        }
        debug!(
            expanded = next.expanded(),
            middle = next.middle(),
            collapsed = next.collapsed(),
            hidden = ?next.hidden(),
            measured = inputs.is_measured(),
            "snap profile recomputed"
        );
        self.profile = next;
        Some(next)
    }

    /// Toggle whether the derived profile includes a hidden position.
    pub fn set_dismissible(&mut self, dismissible: bool) -> Option<SnapProfile> {
        if self.dismissible == dismissible {
            return None;
        }
        self.dismissible = dismissible;
        let inputs = self.inputs.unwrap_or_default();
        self.profile = derive(&self.config, &inputs, dismissible);
        Some(self.profile)
    }
}

/// Pure derivation; see the module docs for the formula.
#[must_use]
pub fn derive(config: &SnapModelConfig, inputs: &LayoutInputs, dismissible: bool) -> SnapProfile {
    let screen_height = if is_positive(inputs.screen_height) {
        inputs.screen_height
    } else {
        if inputs.screen_height != 0.0 {
            warn!(
                screen_height = inputs.screen_height,
                fallback = config.fallback_screen_height,
                "invalid screen height, using fallback"
            );
        }
        config.fallback_screen_height
    };
    let header_height = if is_positive(inputs.header_height) {
        inputs.header_height
    } else {
        config.fallback_header_height
    };
    let safe_top = non_negative(inputs.safe_area_top);
    let safe_bottom = non_negative(inputs.safe_area_bottom);

    let expanded = safe_top + config.top_inset_padding;
    let middle = (expanded + config.min_gap).max(screen_height * config.middle_fraction);

    let nav_aligned = if is_positive(inputs.nav_bar_top) {
        inputs.nav_bar_top - header_height
    } else if is_positive(inputs.nav_bar_height) {
        screen_height - non_negative(inputs.nav_bar_height) - header_height
    } else {
        screen_height - safe_bottom - header_height
    };
    let collapsed = nav_aligned.max(middle + config.min_gap);
    let hidden = screen_height + config.hidden_overshoot;

    SnapProfile::new(expanded, middle, collapsed, dismissible.then_some(hidden))
}

#[inline]
fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

#[inline]
fn non_negative(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}
