#![forbid(unsafe_code)]

//! Nested list scroll state and per-overlay scroll persistence.
//!
//! Two halves, one per execution context:
//!
//! - [`ScrollTracker`] lives in the animation context. It folds the list's
//!   scroll event stream into the shared [`ScrollSnapshot`] cell so the
//!   gesture arbiter's "list at top and idle" test reads current state with
//!   no cross-context delay. It reports the offset at drag and momentum
//!   boundaries for mirroring to the application context.
//! - [`ScrollSync`] lives in the application context. On an overlay switch it
//!   persists the outgoing offset and restores the incoming one through the
//!   list's imperative `scroll_to_offset`.
//!
//! # Restoration
//!
//! A freshly mounted virtualized list may not be attached, or may not have
//! enough content yet, when the first restore runs. Restoration is therefore
//! attempted three times: immediately, once pending interactions finish,
//! and after a short fixed delay. Every attempt re-reads the list's
//! effective offset, so a list that remounts and resets between attempts is
//! scrolled back again.

use std::time::Duration;

use fsheet_core::config::ScrollSyncConfig;
use fsheet_core::gesture::ScrollSnapshot;
use web_time::Instant;

use crate::cell::CellWriter;
use crate::dispatch::{Deferred, When};
use crate::overlay::{OverlayId, OverlayScrollStore};

/// One event from the nested list's scroll stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollEvent {
    Offset(f64),
    BeginDrag,
    EndDrag,
    MomentumBegin,
    MomentumEnd,
}

/// Imperative surface of the nested list.
pub trait ListView {
    /// Whether the native view is mounted and can accept scroll commands.
    fn is_attached(&self) -> bool;
    /// Scroll to `offset`. May clamp, and is a no-op while detached.
    fn scroll_to_offset(&mut self, offset: f64, animated: bool);
    /// Offset the list is actually showing.
    fn effective_offset(&self) -> f64;
}

// ---------------------------------------------------------------------------
// Animation context
// ---------------------------------------------------------------------------

/// Folds scroll events into the shared snapshot.
#[derive(Debug)]
pub struct ScrollTracker {
    cell: CellWriter<ScrollSnapshot>,
    dragging: bool,
}

impl ScrollTracker {
    #[must_use]
    pub fn new(cell: CellWriter<ScrollSnapshot>) -> Self {
        Self {
            cell,
            dragging: false,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ScrollSnapshot {
        self.cell.get()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Apply `event`. Returns the offset to mirror when `event` is a
    /// boundary (begin/end drag, momentum begin/end).
    pub fn apply(&mut self, event: ScrollEvent) -> Option<f64> {
        let mut snap = self.cell.get();
        let boundary = match event {
            ScrollEvent::Offset(y) => {
                snap.offset_y = if y.is_finite() { y } else { snap.offset_y };
                false
            }
            ScrollEvent::BeginDrag => {
                self.dragging = true;
                // A touch on a coasting list stops it.
                snap.in_momentum = false;
                true
            }
            ScrollEvent::EndDrag => {
                self.dragging = false;
                true
            }
            ScrollEvent::MomentumBegin => {
                snap.in_momentum = true;
                true
            }
            ScrollEvent::MomentumEnd => {
                snap.in_momentum = false;
                true
            }
        };
        self.cell.set(snap);
        if boundary {
            tracing::trace!(?event, offset = snap.offset_y, "scroll boundary");
            Some(snap.offset_y)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Application context
// ---------------------------------------------------------------------------

/// Which of the three restoration attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    Immediate,
    AfterInteractions,
    AfterDelay,
}

/// A scheduled restoration attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreAttempt {
    pub overlay: OverlayId,
    pub offset: f64,
    pub phase: RestorePhase,
}

/// Result of running one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The list now shows the target offset.
    Converged,
    /// The list was detached or clamped short of the target.
    Pending,
    /// The overlay is no longer active.
    Skipped,
}

/// Persists and restores per-overlay list offsets.
#[derive(Debug)]
pub struct ScrollSync {
    config: ScrollSyncConfig,
    active: Option<OverlayId>,
    converged: bool,
    deferred: Deferred<RestoreAttempt>,
}

impl ScrollSync {
    #[must_use]
    pub fn new(config: ScrollSyncConfig) -> Self {
        Self {
            config,
            active: None,
            converged: true,
            deferred: Deferred::new(),
        }
    }

    /// Overlay whose offset is currently shown.
    #[must_use]
    pub fn active(&self) -> Option<&OverlayId> {
        self.active.as_ref()
    }

    /// Whether the latest attempt for the active overlay found the list at
    /// its target.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Attempts still waiting to run.
    #[must_use]
    pub fn pending_attempts(&self) -> usize {
        self.deferred.len()
    }

    /// Adopt `overlay` as active without restoring anything.
    pub fn attach(&mut self, overlay: OverlayId) {
        self.active = Some(overlay);
        self.converged = true;
    }

    /// Switch overlays: persist `outgoing_offset` for the current overlay,
    /// then schedule restoration of `incoming`'s stored offset.
    ///
    /// Returns the offset being restored, if the store had one.
    pub fn switch_overlay(
        &mut self,
        incoming: OverlayId,
        outgoing_offset: f64,
        store: &mut dyn OverlayScrollStore,
        now: Instant,
    ) -> Option<f64> {
        if self.active.as_ref() == Some(&incoming) {
            return None;
        }
        if let Some(outgoing) = self.active.take() {
            store.set_scroll_offset(&outgoing, outgoing_offset);
            tracing::debug!(overlay = %outgoing, offset = outgoing_offset, "persist overlay scroll");
        }
        // Attempts for an overlay we are leaving are moot.
        self.deferred.cancel_where(|a| a.overlay != incoming);

        let target = store.get_scroll_offset(&incoming).unwrap_or(0.0);
        self.active = Some(incoming.clone());
        self.converged = false;

        let delay = Duration::from_millis(self.config.restore_delay_ms);
        for (when, phase) in [
            (When::Now, RestorePhase::Immediate),
            (When::AfterInteractions, RestorePhase::AfterInteractions),
            (When::After(delay), RestorePhase::AfterDelay),
        ] {
            self.deferred.schedule(
                when,
                now,
                RestoreAttempt {
                    overlay: incoming.clone(),
                    offset: target,
                    phase,
                },
            );
        }
        tracing::debug!(overlay = %incoming, offset = target, "scheduled scroll restore");
        Some(target)
    }

    /// Run every attempt whose gate has opened.
    pub fn run_due(
        &mut self,
        now: Instant,
        interactions_idle: bool,
        list: &mut dyn ListView,
    ) -> Vec<(RestorePhase, RestoreOutcome)> {
        self.deferred
            .take_ready(now, interactions_idle)
            .into_iter()
            .map(|attempt| {
                let outcome = self.attempt(&attempt, list);
                (attempt.phase, outcome)
            })
            .collect()
    }

    fn attempt(&mut self, attempt: &RestoreAttempt, list: &mut dyn ListView) -> RestoreOutcome {
        if self.active.as_ref() != Some(&attempt.overlay) {
            return RestoreOutcome::Skipped;
        }
        let epsilon = self.config.restore_epsilon;
        let at_target = |list: &dyn ListView| {
            list.is_attached() && (list.effective_offset() - attempt.offset).abs() <= epsilon
        };
        if list.is_attached() && !at_target(&*list) {
            list.scroll_to_offset(attempt.offset, false);
        }
        let reached = at_target(&*list);
        tracing::debug!(
            overlay = %attempt.overlay,
            phase = ?attempt.phase,
            target = attempt.offset,
            effective = list.effective_offset(),
            reached,
            "scroll restore attempt"
        );
        self.converged = reached;
        if reached {
            RestoreOutcome::Converged
        } else {
            RestoreOutcome::Pending
        }
    }
}
