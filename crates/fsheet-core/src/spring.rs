#![forbid(unsafe_code)]

//! Damped spring in pixel space.
//!
//! Drives the sheet offset toward a snap point. Based on the classical damped
//! spring equation:
//!
//!   F = -stiffness × (position - target) - damping × velocity
//!
//! # Parameters
//!
//! - **stiffness** (k): restoring force strength.
//! - **damping** (c): velocity drag. Always at least critical (`2√k`), so a
//!   settle never swings past its snap point and always converges.
//! - **rest thresholds**: position delta (px) and speed (px/s) below which
//!   the spring snaps exactly onto its target and reports rest.
//!
//! # Integration
//!
//! Semi-implicit Euler. Large frame deltas are subdivided into steps of at
//! most 4ms so that a stalled frame cannot explode the simulation.
//!
//! # Invariants
//!
//! 1. `damping() >= critical_damping()` for every spring built here.
//! 2. A spring at rest does not move until [`Spring::retarget`] is called.
//! 3. On reaching rest, `position() == target()` exactly and velocity is 0.

use std::time::Duration;

use crate::config::SpringConfig;

/// Maximum dt per integration step.
const MAX_STEP_SECS: f64 = 0.004;

/// Minimum stiffness to prevent degenerate springs.
const MIN_STIFFNESS: f64 = 0.1;

/// A critically or over-damped spring moving a single pixel offset.
#[derive(Debug, Clone)]
pub struct Spring {
    position: f64,
    velocity: f64,
    target: f64,
    stiffness: f64,
    damping: f64,
    rest_threshold: f64,
    velocity_threshold: f64,
    at_rest: bool,
}

impl Spring {
    /// Create a spring at `from` heading to `to` with `initial_velocity` px/s.
    #[must_use]
    pub fn new(from: f64, to: f64, initial_velocity: f64, config: &SpringConfig) -> Self {
        let stiffness = config.stiffness.max(MIN_STIFFNESS);
        let critical = 2.0 * stiffness.sqrt();
        let damping = config.damping.unwrap_or(critical).max(critical);
        Self {
            position: from,
            velocity: if initial_velocity.is_finite() {
                initial_velocity
            } else {
                0.0
            },
            target: to,
            stiffness,
            damping,
            rest_threshold: config.rest_threshold.abs(),
            velocity_threshold: config.velocity_threshold.abs(),
            at_rest: false,
        }
    }

    /// Current position (px).
    #[inline]
    #[must_use]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Current velocity (px/s).
    #[inline]
    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }

    #[inline]
    #[must_use]
    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    #[inline]
    #[must_use]
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Critical damping coefficient for the current stiffness.
    #[must_use]
    pub fn critical_damping(&self) -> f64 {
        2.0 * self.stiffness.sqrt()
    }

    /// Whether the spring has settled at its target.
    #[inline]
    #[must_use]
    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    /// Move the destination, keeping position and velocity.
    pub fn retarget(&mut self, target: f64) {
        if (self.target - target).abs() > self.rest_threshold {
            self.target = target;
            self.at_rest = false;
        }
    }

    fn step(&mut self, dt: f64) {
        let displacement = self.position - self.target;
        let acceleration = -self.stiffness * displacement - self.damping * self.velocity;
        self.velocity += acceleration * dt;
        self.position += self.velocity * dt;
    }

    /// Advance by `dt`. Returns `true` once the spring is at rest.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if self.at_rest {
            return true;
        }
        let mut remaining = dt.as_secs_f64();
        while remaining > 0.0 {
            let step_dt = remaining.min(MAX_STEP_SECS);
            self.step(step_dt);
            remaining -= step_dt;
        }
        if (self.position - self.target).abs() < self.rest_threshold
            && self.velocity.abs() < self.velocity_threshold
        {
            self.position = self.target;
            self.velocity = 0.0;
            self.at_rest = true;
        }
        self.at_rest
    }
}

/// Ready-made configurations.
pub mod presets {
    use crate::config::SpringConfig;

    /// Default settle: critically damped.
    #[must_use]
    pub fn settle() -> SpringConfig {
        SpringConfig::default()
    }

    /// Quicker, slightly over-damped settle.
    #[must_use]
    pub fn snappy() -> SpringConfig {
        SpringConfig {
            stiffness: 420.0,
            damping: Some(2.2 * 420.0_f64.sqrt()),
            ..SpringConfig::default()
        }
    }

    /// Slow, heavily damped settle.
    #[must_use]
    pub fn gentle() -> SpringConfig {
        SpringConfig {
            stiffness: 120.0,
            damping: Some(2.6 * 120.0_f64.sqrt()),
            ..SpringConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_16: Duration = Duration::from_millis(16);

    fn run(spring: &mut Spring, frames: usize) -> usize {
        for i in 0..frames {
            if spring.advance(MS_16) {
                return i + 1;
            }
        }
        frames
    }

    #[test]
    fn reaches_target_exactly() {
        let mut spring = Spring::new(600.0, 300.0, 0.0, &SpringConfig::default());
        run(&mut spring, 300);
        assert!(spring.is_at_rest());
        assert_eq!(spring.position(), 300.0);
        assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn underdamped_config_is_raised_to_critical() {
        let config = SpringConfig {
            stiffness: 100.0,
            damping: Some(1.0),
            ..SpringConfig::default()
        };
        let spring = Spring::new(0.0, 1.0, 0.0, &config);
        assert!((spring.damping() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_overshoot_from_rest() {
        let mut spring = Spring::new(0.0, 500.0, 0.0, &SpringConfig::default());
        let mut max = 0.0_f64;
        for _ in 0..300 {
            spring.advance(MS_16);
            max = max.max(spring.position());
        }
        assert!(max <= 500.0 + 0.5, "overshoot to {max}");
    }

    #[test]
    fn initial_velocity_carries_motion() {
        let mut spring = Spring::new(450.0, 450.0, 2000.0, &SpringConfig::default());
        assert!(!spring.is_at_rest());
        spring.advance(MS_16);
        assert!(spring.position() > 450.0);
        run(&mut spring, 400);
        assert_eq!(spring.position(), 450.0);
    }

    #[test]
    fn nan_velocity_is_zeroed() {
        let spring = Spring::new(0.0, 10.0, f64::NAN, &SpringConfig::default());
        assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn large_dt_is_subdivided() {
        let mut spring = Spring::new(0.0, 100.0, 0.0, &SpringConfig::default());
        assert!(spring.advance(Duration::from_secs(5)));
        assert_eq!(spring.position(), 100.0);
    }

    #[test]
    fn zero_dt_is_noop() {
        let mut spring = Spring::new(0.0, 100.0, 0.0, &SpringConfig::default());
        assert!(!spring.advance(Duration::ZERO));
        assert_eq!(spring.position(), 0.0);
    }

    #[test]
    fn retarget_wakes_rested_spring() {
        let mut spring = Spring::new(0.0, 100.0, 0.0, &SpringConfig::default());
        run(&mut spring, 300);
        spring.retarget(200.0);
        assert!(!spring.is_at_rest());
        run(&mut spring, 300);
        assert_eq!(spring.position(), 200.0);
    }

    #[test]
    fn retarget_within_threshold_stays_at_rest() {
        let mut spring = Spring::new(0.0, 100.0, 0.0, &SpringConfig::default());
        run(&mut spring, 300);
        spring.retarget(100.2);
        assert!(spring.is_at_rest());
    }

    #[test]
    fn presets_all_converge() {
        for (name, config) in [
            ("settle", presets::settle()),
            ("snappy", presets::snappy()),
            ("gentle", presets::gentle()),
        ] {
            let mut spring = Spring::new(700.0, 56.0, -3000.0, &config);
            let frames = run(&mut spring, 600);
            assert!(spring.is_at_rest(), "preset {name} did not converge in {frames} frames");
        }
    }

    #[test]
    fn snappy_is_faster_than_gentle() {
        let mut snappy = Spring::new(0.0, 300.0, 0.0, &presets::snappy());
        let mut gentle = Spring::new(0.0, 300.0, 0.0, &presets::gentle());
        for _ in 0..15 {
            snappy.advance(MS_16);
            gentle.advance(MS_16);
        }
        assert!((300.0 - snappy.position()) < (300.0 - gentle.position()));
    }

    #[test]
    fn deterministic_across_runs() {
        let run_once = || {
            let mut spring = Spring::new(0.0, 300.0, 120.0, &SpringConfig::default());
            (0..40)
                .map(|_| {
                    spring.advance(MS_16);
                    spring.position()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run_once(), run_once());
    }
}
