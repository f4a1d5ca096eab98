#![forbid(unsafe_code)]

//! Tunable parameters for the sheet engine.
//!
//! Every threshold, spring coefficient, and projection factor is empirically
//! tuned product data rather than a structural constraint, so all of them
//! live here instead of in code.
//!
//! # Loading
//!
//! ```toml
//! # fsheet.toml
//! [arbiter]
//! slop = 12.0
//! axis_lock_ratio = 1.2
//!
//! [spring]
//! stiffness = 300.0
//! ```
//!
//! ```rust,ignore
//! let config = SheetConfig::from_toml_file("fsheet.toml")?;
//! let config = SheetConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! `SheetConfig::default()` carries the shipped product values. Partial files
//! only override the fields they name.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Errors produced while loading a [`SheetConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read sheet config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML syntax or type error.
    #[cfg(feature = "config")]
    #[error("invalid TOML sheet config: {0}")]
    Toml(#[from] toml::de::Error),
    /// JSON syntax or type error.
    #[cfg(feature = "config")]
    #[error("invalid JSON sheet config: {0}")]
    Json(#[from] serde_json::Error),
    /// Parsed, but one or more values are out of range.
    #[error("sheet config failed validation: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

// ---------------------------------------------------------------------------
// Top-level SheetConfig
// ---------------------------------------------------------------------------

/// All tunables for one sheet.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SheetConfig {
    /// Snap point derivation.
    pub snap: SnapModelConfig,
    /// Settle spring.
    pub spring: SpringConfig,
    /// Touch classification and release resolution.
    pub arbiter: ArbiterConfig,
    /// Nested list scroll persistence.
    pub scroll: ScrollSyncConfig,
    /// Controller reconciliation.
    pub controller: ControllerConfig,
}

impl SheetConfig {
    /// Load from a TOML string and validate.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validated()
    }

    /// Load from a TOML file on disk and validate.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string and validate.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validated()
    }

    /// Load from a JSON file on disk and validate.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Return `self` if [`validate`](Self::validate) reports nothing.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Check every parameter and collect all violations.
    ///
    /// An empty list means the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let snap = &self.snap;
        if snap.min_gap < 0.0 || !snap.min_gap.is_finite() {
            errors.push(format!("snap.min_gap must be >= 0, got {}", snap.min_gap));
        }
        if !(0.0..=1.0).contains(&snap.middle_fraction) {
            errors.push(format!(
                "snap.middle_fraction must be in [0, 1], got {}",
                snap.middle_fraction
            ));
        }
        if snap.fallback_screen_height <= 0.0 {
            errors.push(format!(
                "snap.fallback_screen_height must be > 0, got {}",
                snap.fallback_screen_height
            ));
        }
        if snap.fallback_header_height < 0.0 {
            errors.push(format!(
                "snap.fallback_header_height must be >= 0, got {}",
                snap.fallback_header_height
            ));
        }

        if self.spring.stiffness <= 0.0 {
            errors.push(format!(
                "spring.stiffness must be > 0, got {}",
                self.spring.stiffness
            ));
        }
        if self.spring.rest_threshold <= 0.0 {
            errors.push("spring.rest_threshold must be > 0".into());
        }

        let arb = &self.arbiter;
        if arb.slop < 0.0 {
            errors.push(format!("arbiter.slop must be >= 0, got {}", arb.slop));
        }
        if arb.axis_lock_ratio < 1.0 {
            errors.push(format!(
                "arbiter.axis_lock_ratio must be >= 1, got {}",
                arb.axis_lock_ratio
            ));
        }
        if arb.projection_factor < 0.0 {
            errors.push("arbiter.projection_factor must be >= 0".into());
        }
        if arb.fling_velocity <= 0.0 {
            errors.push("arbiter.fling_velocity must be > 0".into());
        }
        if arb.velocity_window_ms == 0 {
            errors.push("arbiter.velocity_window_ms must be > 0".into());
        }

        if self.scroll.restore_epsilon < 0.0 {
            errors.push("scroll.restore_epsilon must be >= 0".into());
        }
        if self.controller.snap_epsilon <= 0.0 {
            errors.push("controller.snap_epsilon must be > 0".into());
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Parameters for deriving a [`SnapProfile`](crate::geometry::SnapProfile)
/// from layout measurements.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SnapModelConfig {
    /// Gap between the top safe-area inset and the expanded sheet top.
    pub top_inset_padding: f64,
    /// Minimum distance between adjacent snap points.
    pub min_gap: f64,
    /// Middle snap point as a fraction of screen height.
    pub middle_fraction: f64,
    /// How far past the screen bottom the hidden position sits.
    pub hidden_overshoot: f64,
    /// Screen height used while the real one is unknown.
    pub fallback_screen_height: f64,
    /// Header height used while the real one is unmeasured.
    pub fallback_header_height: f64,
}

impl Default for SnapModelConfig {
    fn default() -> Self {
        Self {
            top_inset_padding: 8.0,
            min_gap: 48.0,
            middle_fraction: 0.45,
            hidden_overshoot: 24.0,
            fallback_screen_height: 844.0,
            fallback_header_height: 64.0,
        }
    }
}

/// Settle spring coefficients.
///
/// Damping below critical is raised to critical when a spring is built, so
/// every settle converges without oscillating across a snap point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SpringConfig {
    pub stiffness: f64,
    /// `None` means critical damping for the configured stiffness.
    pub damping: Option<f64>,
    /// Position delta (px) below which the spring may rest.
    pub rest_threshold: f64,
    /// Velocity (px/s) below which the spring may rest.
    pub velocity_threshold: f64,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 260.0,
            damping: None,
            rest_threshold: 0.5,
            velocity_threshold: 5.0,
        }
    }
}

/// Touch classification and release resolution thresholds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ArbiterConfig {
    /// Displacement (px) on either axis before a touch is classified.
    pub slop: f64,
    /// `|dx| > ratio * |dy|` classifies a touch as horizontal.
    pub axis_lock_ratio: f64,
    /// Seconds of velocity projected onto the release offset.
    pub projection_factor: f64,
    /// Release speed (px/s) that forces the extreme destination.
    pub fling_velocity: f64,
    /// Distance above `collapsed` within which a downward release dismisses.
    pub dismiss_slop: f64,
    /// Trailing window of touch samples used for velocity estimation.
    pub velocity_window_ms: u64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            slop: 10.0,
            axis_lock_ratio: 1.15,
            projection_factor: 0.08,
            fling_velocity: 2600.0,
            dismiss_slop: 80.0,
            velocity_window_ms: 100,
        }
    }
}

/// Nested list scroll persistence.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ScrollSyncConfig {
    /// Delay before the last restoration attempt.
    pub restore_delay_ms: u64,
    /// Distance at which a restored offset counts as converged.
    pub restore_epsilon: f64,
}

impl Default for ScrollSyncConfig {
    fn default() -> Self {
        Self {
            restore_delay_ms: 120,
            restore_epsilon: 1.0,
        }
    }
}

/// Controller-level reconciliation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ControllerConfig {
    /// Distance at which an external snap request counts as satisfied.
    pub snap_epsilon: f64,
    /// Whether gestures may dismiss the sheet to `hidden`.
    pub dismissible: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            snap_epsilon: 0.5,
            dismissible: true,
        }
    }
}
