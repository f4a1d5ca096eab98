#![forbid(unsafe_code)]

//! Spring-driven settle motion with generation-token cancellation.
//!
//! [`AnimationDriver`] owns the writer half of the shared sheet offset. It
//! runs at most one spring at a time; starting another supersedes the first.
//!
//! # Token protocol
//!
//! Every [`move_to`](AnimationDriver::move_to),
//! [`set_immediate`](AnimationDriver::set_immediate), and
//! [`interrupt`](AnimationDriver::interrupt) advances the current
//! [`AnimationToken`]. A spring captures the token it was started under and
//! reports it in its [`Completion`]. Superseded springs still report, with
//! `finished == false`, exactly like an interrupted platform animation
//! callback. A completion counts as a settle only if
//! [`is_settle`](AnimationDriver::is_settle) holds: finished naturally *and*
//! its token is still current. That comparison is the only thing standing
//! between overlapping settles and double state transitions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use fsheet_core::config::SpringConfig;
use fsheet_core::spring::Spring;

use crate::cell::CellWriter;

/// Monotonic generation of sheet motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimationToken(u64);

impl AnimationToken {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Shared view of the current token, readable from any context.
#[derive(Debug, Clone)]
pub struct TokenReader {
    current: Arc<AtomicU64>,
}

impl TokenReader {
    #[must_use]
    pub fn current(&self) -> AnimationToken {
        AnimationToken(self.current.load(Ordering::Acquire))
    }
}

/// Report from a spring that stopped running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub token: AnimationToken,
    pub target: f64,
    pub notify_hidden: bool,
    /// `true` if the spring reached its target, `false` if superseded.
    pub finished: bool,
}

#[derive(Debug, Clone)]
struct ActiveSpring {
    token: AnimationToken,
    spring: Spring,
    notify_hidden: bool,
}

/// Drives the shared offset toward a target.
#[derive(Debug)]
pub struct AnimationDriver {
    config: SpringConfig,
    offset: CellWriter<f64>,
    current: Arc<AtomicU64>,
    active: Option<ActiveSpring>,
    superseded: Vec<Completion>,
}

impl AnimationDriver {
    /// Wrap the offset writer. The offset is left untouched.
    #[must_use]
    pub fn new(config: SpringConfig, offset: CellWriter<f64>) -> Self {
        Self {
            config,
            offset,
            current: Arc::new(AtomicU64::new(0)),
            active: None,
            superseded: Vec::new(),
        }
    }

    pub fn set_config(&mut self, config: SpringConfig) {
        self.config = config;
    }

    /// Current shared offset.
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.offset.get()
    }

    #[must_use]
    pub fn token(&self) -> AnimationToken {
        AnimationToken(self.current.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn token_reader(&self) -> TokenReader {
        TokenReader {
            current: Arc::clone(&self.current),
        }
    }

    /// Target of the running spring, if any.
    #[must_use]
    pub fn target(&self) -> Option<f64> {
        self.active.as_ref().map(|a| a.spring.target())
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    fn advance_token(&mut self) -> AnimationToken {
        let next = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(old) = self.active.take() {
            self.superseded.push(Completion {
                token: old.token,
                target: old.spring.target(),
                notify_hidden: old.notify_hidden,
                finished: false,
            });
        }
        AnimationToken(next)
    }

    /// Start a spring from the current offset toward `target`.
    pub fn move_to(
        &mut self,
        target: f64,
        initial_velocity: f64,
        notify_hidden_on_arrival: bool,
    ) -> AnimationToken {
        let token = self.advance_token();
        let spring = Spring::new(self.offset.get(), target, initial_velocity, &self.config);
        tracing::debug!(
            token = token.get(),
            from = self.offset.get(),
            target,
            initial_velocity,
            "spring start"
        );
        self.active = Some(ActiveSpring {
            token,
            spring,
            notify_hidden: notify_hidden_on_arrival,
        });
        token
    }

    /// Redirect the running spring without starting a new generation.
    ///
    /// Returns `false` if no spring is running.
    pub fn retarget(&mut self, target: f64) -> bool {
        match self.active.as_mut() {
            Some(active) => {
                active.spring.retarget(target);
                true
            }
            None => false,
        }
    }

    /// Jump to `offset` without animation.
    pub fn set_immediate(&mut self, offset: f64) -> AnimationToken {
        let token = self.advance_token();
        self.offset.set(offset);
        token
    }

    /// Stop any running spring where it is.
    pub fn interrupt(&mut self) -> AnimationToken {
        self.advance_token()
    }

    /// Write a gesture-driven offset. Any running spring is interrupted
    /// first, so a drag always wins over an in-flight settle.
    pub fn drag_to(&mut self, offset: f64) {
        if self.active.is_some() {
            self.interrupt();
        }
        self.offset.set(offset);
    }

    /// Advance the running spring by `dt` and collect completions:
    /// superseded springs first, then the active one if it came to rest.
    pub fn tick(&mut self, dt: Duration) -> Vec<Completion> {
        let mut out = std::mem::take(&mut self.superseded);
        if let Some(active) = self.active.as_mut() {
            let at_rest = active.spring.advance(dt);
            self.offset.set(active.spring.position());
            tracing::trace!(
                token = active.token.get(),
                offset = active.spring.position(),
                "spring frame"
            );
            if at_rest {
                out.push(Completion {
                    token: active.token,
                    target: active.spring.target(),
                    notify_hidden: active.notify_hidden,
                    finished: true,
                });
                self.active = None;
            }
        }
        out
    }

    /// Whether `completion` is a real settle rather than a stale report.
    #[must_use]
    pub fn is_settle(&self, completion: &Completion) -> bool {
        completion.finished && completion.token == self.token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::shared_cell;

    const MS_16: Duration = Duration::from_millis(16);

    fn driver(at: f64) -> (AnimationDriver, crate::cell::CellReader<f64>) {
        let (w, r) = shared_cell(at);
        (AnimationDriver::new(SpringConfig::default(), w), r)
    }

    fn run(d: &mut AnimationDriver, frames: usize) -> Vec<Completion> {
        let mut all = Vec::new();
        for _ in 0..frames {
            all.extend(d.tick(MS_16));
        }
        all
    }

    #[test]
    fn move_to_advances_token_and_settles() {
        let (mut d, offset) = driver(700.0);
        let t0 = d.token();
        let t1 = d.move_to(300.0, 0.0, false);
        assert!(t1 > t0);
        let done = run(&mut d, 300);
        assert_eq!(done.len(), 1);
        assert!(d.is_settle(&done[0]));
        assert_eq!(offset.get(), 300.0);
        assert!(!d.is_animating());
    }

    #[test]
    fn superseded_spring_reports_unfinished_and_stale() {
        let (mut d, offset) = driver(700.0);
        let first = d.move_to(300.0, 0.0, false);
        d.tick(MS_16);
        let second = d.move_to(0.0, 0.0, false);
        let done = run(&mut d, 300);
        assert_eq!(done.len(), 2);
        assert_eq!(done[0].token, first);
        assert!(!done[0].finished);
        assert!(!d.is_settle(&done[0]));
        assert_eq!(done[1].token, second);
        assert!(d.is_settle(&done[1]));
        assert_eq!(offset.get(), 0.0);
    }

    #[test]
    fn finished_completion_with_old_token_is_rejected() {
        let (mut d, _) = driver(0.0);
        d.move_to(10.0, 0.0, false);
        let done = run(&mut d, 300);
        d.interrupt();
        assert!(!d.is_settle(&done[0]));
    }

    #[test]
    fn drag_interrupts_spring() {
        let (mut d, offset) = driver(700.0);
        let t = d.move_to(0.0, 0.0, false);
        d.tick(MS_16);
        d.drag_to(500.0);
        assert!(d.token() > t);
        assert_eq!(offset.get(), 500.0);
        let done = d.tick(MS_16);
        assert_eq!(done.len(), 1);
        assert!(!done[0].finished);
        assert_eq!(offset.get(), 500.0);
    }

    #[test]
    fn set_immediate_writes_without_completion() {
        let (mut d, offset) = driver(0.0);
        d.set_immediate(420.0);
        assert_eq!(offset.get(), 420.0);
        assert!(d.tick(MS_16).is_empty());
    }

    #[test]
    fn retarget_keeps_token() {
        let (mut d, offset) = driver(700.0);
        let t = d.move_to(300.0, 0.0, true);
        d.tick(MS_16);
        assert!(d.retarget(320.0));
        assert_eq!(d.token(), t);
        let done = run(&mut d, 300);
        assert!(d.is_settle(&done[0]));
        assert!(done[0].notify_hidden);
        assert_eq!(offset.get(), 320.0);
    }

    #[test]
    fn token_reader_tracks_driver() {
        let (mut d, _) = driver(0.0);
        let reader = d.token_reader();
        let t = d.move_to(5.0, 0.0, false);
        assert_eq!(reader.current(), t);
    }
}
