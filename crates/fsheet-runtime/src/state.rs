#![forbid(unsafe_code)]

//! Logical sheet state and lifecycle notifications.
//!
//! # State Machine
//!
//! ```text
//!            show(k)                     complete
//!  Hidden ───────────► Settling(k) ─────────────────► Settled(k)
//!    ▲                   │    ▲                          │
//!    │ complete(hidden)  │    │ begin_settle             │ begin_drag
//!    └───────────────────┘    │                          ▼
//!                             └────────────────────── Dragging
//! ```
//!
//! # Invariants
//!
//! 1. `SnapChange` fires only when the settled key differs from the last
//!    notified key, unless [`force_resync`](SheetStateMachine::force_resync)
//!    was requested.
//! 2. `Hidden` fires at most once per hide: the guard flag is set on arrival
//!    and cleared only when a non-hidden target is requested.
//! 3. `DragStateChange` and `SettleStateChange` alternate strictly; the
//!    machine never reports `true` twice in a row for either.
//! 4. A completion for a key other than the current settling target is
//!    ignored.

use fsheet_core::geometry::{SnapKey, SnapSource};

use crate::dispatch::SheetNotification;

/// Logical sheet state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetState {
    Hidden,
    Settled(SnapKey),
    Dragging,
    Settling { target: SnapKey, source: SnapSource },
}

impl SheetState {
    /// Settled key, if resting.
    #[must_use]
    pub fn settled_key(&self) -> Option<SnapKey> {
        match *self {
            Self::Settled(key) => Some(key),
            Self::Hidden => Some(SnapKey::Hidden),
            _ => None,
        }
    }

    /// Hidden, or on its way there.
    #[must_use]
    pub fn is_hidden_or_hiding(&self) -> bool {
        matches!(
            self,
            Self::Hidden
                | Self::Settling {
                    target: SnapKey::Hidden,
                    ..
                }
        )
    }
}

/// Tracks [`SheetState`] and emits notifications on real transitions.
#[derive(Debug, Clone)]
pub struct SheetStateMachine {
    state: SheetState,
    last_notified: Option<SnapKey>,
    hidden_notified: bool,
    force_next: bool,
}

impl Default for SheetStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetStateMachine {
    /// Start hidden. Mounting hidden is not a hide, so no `Hidden` fires
    /// until the sheet has been shown.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SheetState::Hidden,
            last_notified: None,
            hidden_notified: true,
            force_next: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> SheetState {
        self.state
    }

    /// Key last reported through `SnapChange`.
    #[must_use]
    pub fn last_notified(&self) -> Option<SnapKey> {
        self.last_notified
    }

    /// Visibility became true. Only acts when hidden or hiding.
    pub fn show(&mut self, initial: SnapKey) -> Vec<SheetNotification> {
        if !self.state.is_hidden_or_hiding() {
            return Vec::new();
        }
        self.begin_settle(initial, SnapSource::Programmatic)
    }

    /// A gesture claimed the panel.
    pub fn begin_drag(&mut self) -> Vec<SheetNotification> {
        let mut out = Vec::new();
        match self.state {
            SheetState::Dragging => return out,
            SheetState::Settling { .. } => {
                out.push(SheetNotification::SettleStateChange { settling: false });
            }
            SheetState::Settled(_) | SheetState::Hidden => {}
        }
        self.state = SheetState::Dragging;
        out.push(SheetNotification::DragStateChange { dragging: true });
        out
    }

    /// A settle toward `target` began.
    pub fn begin_settle(&mut self, target: SnapKey, source: SnapSource) -> Vec<SheetNotification> {
        let mut out = Vec::new();
        match self.state {
            SheetState::Dragging => {
                out.push(SheetNotification::DragStateChange { dragging: false });
                out.push(SheetNotification::SettleStateChange { settling: true });
            }
            SheetState::Settled(_) | SheetState::Hidden => {
                out.push(SheetNotification::SettleStateChange { settling: true });
            }
            SheetState::Settling { .. } => {}
        }
        if target != SnapKey::Hidden {
            self.hidden_notified = false;
        }
        self.state = SheetState::Settling { target, source };
        out.push(SheetNotification::SnapStart {
            key: target,
            source,
        });
        tracing::debug!(target = target.as_str(), ?source, "settle begin");
        out
    }

    /// The driver reported a real settle at `target`.
    pub fn complete(&mut self, target: SnapKey, notify_hidden: bool) -> Vec<SheetNotification> {
        let SheetState::Settling {
            target: expected,
            source,
        } = self.state
        else {
            tracing::debug!(target = target.as_str(), state = ?self.state, "completion outside settle ignored");
            return Vec::new();
        };
        if expected != target {
            tracing::debug!(
                target = target.as_str(),
                expected = expected.as_str(),
                "completion for stale target ignored"
            );
            return Vec::new();
        }

        let mut out = vec![SheetNotification::SettleStateChange { settling: false }];
        self.state = if target == SnapKey::Hidden {
            SheetState::Hidden
        } else {
            SheetState::Settled(target)
        };

        if self.last_notified != Some(target) || self.force_next {
            self.last_notified = Some(target);
            self.force_next = false;
            out.push(SheetNotification::SnapChange { key: target, source });
        }

        if target == SnapKey::Hidden && notify_hidden && !self.hidden_notified {
            self.hidden_notified = true;
            out.push(SheetNotification::Hidden);
        }
        tracing::debug!(target = target.as_str(), ?source, "settled");
        out
    }

    /// Re-announce the settled key. When resting, `SnapChange` fires now;
    /// otherwise the next settle notifies even if the key is unchanged.
    pub fn force_resync(&mut self) -> Vec<SheetNotification> {
        match self.state {
            SheetState::Settled(key) => {
                self.last_notified = Some(key);
                vec![SheetNotification::SnapChange {
                    key,
                    source: SnapSource::Programmatic,
                }]
            }
            _ => {
                self.force_next = true;
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SheetNotification as N;

    fn settled_at(key: SnapKey) -> SheetStateMachine {
        let mut sm = SheetStateMachine::new();
        sm.show(key);
        sm.complete(key, false);
        sm
    }

    #[test]
    fn show_from_hidden_starts_settle() {
        let mut sm = SheetStateMachine::new();
        let out = sm.show(SnapKey::Middle);
        assert_eq!(
            out,
            vec![
                N::SettleStateChange { settling: true },
                N::SnapStart {
                    key: SnapKey::Middle,
                    source: SnapSource::Programmatic
                },
            ]
        );
        assert_eq!(
            sm.state(),
            SheetState::Settling {
                target: SnapKey::Middle,
                source: SnapSource::Programmatic
            }
        );
    }

    #[test]
    fn show_while_visible_is_noop() {
        let mut sm = settled_at(SnapKey::Middle);
        assert!(sm.show(SnapKey::Expanded).is_empty());
    }

    #[test]
    fn snap_change_only_on_new_key() {
        let mut sm = settled_at(SnapKey::Middle);
        sm.begin_drag();
        sm.begin_settle(SnapKey::Middle, SnapSource::Gesture);
        let out = sm.complete(SnapKey::Middle, false);
        assert_eq!(out, vec![N::SettleStateChange { settling: false }]);

        sm.begin_settle(SnapKey::Expanded, SnapSource::Gesture);
        let out = sm.complete(SnapKey::Expanded, false);
        assert!(out.contains(&N::SnapChange {
            key: SnapKey::Expanded,
            source: SnapSource::Gesture
        }));
    }

    #[test]
    fn drag_and_release_notifications() {
        let mut sm = settled_at(SnapKey::Collapsed);
        assert_eq!(sm.begin_drag(), vec![N::DragStateChange { dragging: true }]);
        assert!(sm.begin_drag().is_empty());
        let out = sm.begin_settle(SnapKey::Middle, SnapSource::Gesture);
        assert_eq!(
            out,
            vec![
                N::DragStateChange { dragging: false },
                N::SettleStateChange { settling: true },
                N::SnapStart {
                    key: SnapKey::Middle,
                    source: SnapSource::Gesture
                },
            ]
        );
    }

    #[test]
    fn drag_during_settle_ends_settle() {
        let mut sm = SheetStateMachine::new();
        sm.show(SnapKey::Middle);
        assert_eq!(
            sm.begin_drag(),
            vec![
                N::SettleStateChange { settling: false },
                N::DragStateChange { dragging: true },
            ]
        );
    }

    #[test]
    fn hidden_fires_once() {
        let mut sm = settled_at(SnapKey::Middle);
        sm.begin_settle(SnapKey::Hidden, SnapSource::Programmatic);
        let out = sm.complete(SnapKey::Hidden, true);
        assert_eq!(out.iter().filter(|n| **n == N::Hidden).count(), 1);
        assert_eq!(sm.state(), SheetState::Hidden);

        // A second hide request while already hidden does not re-fire.
        sm.begin_settle(SnapKey::Hidden, SnapSource::Programmatic);
        let out = sm.complete(SnapKey::Hidden, true);
        assert!(!out.contains(&N::Hidden));
    }

    #[test]
    fn hidden_guard_resets_on_visible_target() {
        let mut sm = settled_at(SnapKey::Middle);
        sm.begin_settle(SnapKey::Hidden, SnapSource::Programmatic);
        sm.complete(SnapKey::Hidden, true);
        sm.show(SnapKey::Middle);
        sm.complete(SnapKey::Middle, false);
        sm.begin_settle(SnapKey::Hidden, SnapSource::Gesture);
        assert!(sm.complete(SnapKey::Hidden, true).contains(&N::Hidden));
    }

    #[test]
    fn mount_hidden_never_notifies_hidden() {
        let mut sm = SheetStateMachine::new();
        sm.begin_settle(SnapKey::Hidden, SnapSource::Programmatic);
        assert!(!sm.complete(SnapKey::Hidden, true).contains(&N::Hidden));
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut sm = SheetStateMachine::new();
        sm.show(SnapKey::Middle);
        sm.begin_settle(SnapKey::Expanded, SnapSource::Programmatic);
        assert!(sm.complete(SnapKey::Middle, false).is_empty());
        assert!(!sm.complete(SnapKey::Expanded, false).is_empty());
        assert!(sm.complete(SnapKey::Expanded, false).is_empty());
    }

    #[test]
    fn force_resync_when_settled_notifies_now() {
        let mut sm = settled_at(SnapKey::Collapsed);
        assert_eq!(
            sm.force_resync(),
            vec![N::SnapChange {
                key: SnapKey::Collapsed,
                source: SnapSource::Programmatic
            }]
        );
    }

    #[test]
    fn force_resync_while_settling_applies_to_next_settle() {
        let mut sm = settled_at(SnapKey::Middle);
        sm.begin_settle(SnapKey::Middle, SnapSource::Programmatic);
        assert!(sm.force_resync().is_empty());
        let out = sm.complete(SnapKey::Middle, false);
        assert!(out.contains(&N::SnapChange {
            key: SnapKey::Middle,
            source: SnapSource::Programmatic
        }));
    }
}
