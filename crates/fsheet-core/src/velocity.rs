#![forbid(unsafe_code)]

//! Release velocity estimation.
//!
//! Keeps a short trailing window of `(time, x, y)` touch samples and fits a
//! least-squares line through them. A single jittery final sample therefore
//! cannot flip the release direction.

use std::collections::VecDeque;
use std::time::Duration;

use web_time::Instant;

/// Upper bound on retained samples, independent of the time window.
const MAX_SAMPLES: usize = 20;

/// Two-axis velocity in px/s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    x: f64,
    y: f64,
}

/// Sliding-window velocity estimator.
#[derive(Debug, Clone)]
pub struct VelocityTracker {
    window: Duration,
    samples: VecDeque<Sample>,
}

impl VelocityTracker {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::with_capacity(MAX_SAMPLES),
        }
    }

    /// Forget every sample.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Record a touch position.
    pub fn push(&mut self, at: Instant, x: f64, y: f64) {
        if let Some(last) = self.samples.back()
            && at < last.at
        {
            // Out-of-order timestamps restart the window.
            self.samples.clear();
        }
        self.samples.push_back(Sample { at, x, y });
        while self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }
        self.prune(at);
    }

    fn prune(&mut self, now: Instant) {
        while let Some(first) = self.samples.front() {
            if now.duration_since(first.at) > self.window && self.samples.len() > 2 {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Estimated velocity over the retained window.
    #[must_use]
    pub fn velocity(&self) -> Velocity {
        let Some(origin) = self.samples.front().map(|s| s.at) else {
            return Velocity::default();
        };
        if self.samples.len() < 2 {
            return Velocity::default();
        }
        let n = self.samples.len() as f64;
        let ts: Vec<f64> = self
            .samples
            .iter()
            .map(|s| s.at.duration_since(origin).as_secs_f64())
            .collect();
        let mean_t = ts.iter().sum::<f64>() / n;
        let var_t: f64 = ts.iter().map(|t| (t - mean_t).powi(2)).sum();
        if var_t <= f64::EPSILON {
            return Velocity::default();
        }
        let mean_x = self.samples.iter().map(|s| s.x).sum::<f64>() / n;
        let mean_y = self.samples.iter().map(|s| s.y).sum::<f64>() / n;
        let mut cov_x = 0.0;
        let mut cov_y = 0.0;
        for (t, s) in ts.iter().zip(&self.samples) {
            cov_x += (t - mean_t) * (s.x - mean_x);
            cov_y += (t - mean_t) * (s.y - mean_y);
        }
        Velocity {
            x: cov_x / var_t,
            y: cov_y / var_t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(base: Instant, n: u64) -> Instant {
        base + Duration::from_millis(n)
    }

    #[test]
    fn empty_and_single_sample_are_zero() {
        let mut tracker = VelocityTracker::new(Duration::from_millis(100));
        assert_eq!(tracker.velocity(), Velocity::default());
        tracker.push(Instant::now(), 0.0, 0.0);
        assert_eq!(tracker.velocity(), Velocity::default());
    }

    #[test]
    fn constant_motion_is_exact() {
        let base = Instant::now();
        let mut tracker = VelocityTracker::new(Duration::from_millis(100));
        for i in 0..6 {
            tracker.push(ms(base, i * 10), 0.0, i as f64 * 20.0);
        }
        let v = tracker.velocity();
        assert!((v.y - 2000.0).abs() < 1e-6, "{v:?}");
        assert!(v.x.abs() < 1e-6);
    }

    #[test]
    fn old_samples_fall_out_of_window() {
        let base = Instant::now();
        let mut tracker = VelocityTracker::new(Duration::from_millis(50));
        // Fast downward, then a pause, then slow upward.
        tracker.push(ms(base, 0), 0.0, 0.0);
        tracker.push(ms(base, 10), 0.0, 100.0);
        tracker.push(ms(base, 200), 0.0, 100.0);
        tracker.push(ms(base, 210), 0.0, 99.0);
        tracker.push(ms(base, 220), 0.0, 98.0);
        assert!(tracker.velocity().y < 0.0);
    }

    #[test]
    fn simultaneous_samples_are_zero() {
        let base = Instant::now();
        let mut tracker = VelocityTracker::new(Duration::from_millis(100));
        tracker.push(base, 0.0, 0.0);
        tracker.push(base, 0.0, 50.0);
        assert_eq!(tracker.velocity(), Velocity::default());
    }

    #[test]
    fn reset_clears() {
        let base = Instant::now();
        let mut tracker = VelocityTracker::new(Duration::from_millis(100));
        tracker.push(base, 0.0, 0.0);
        tracker.push(ms(base, 10), 0.0, 10.0);
        tracker.reset();
        assert_eq!(tracker.velocity(), Velocity::default());
    }
}
