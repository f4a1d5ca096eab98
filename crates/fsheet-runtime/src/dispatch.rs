#![forbid(unsafe_code)]

//! Crossing from the animation context to the application context.
//!
//! The animation context never calls application code directly. It pushes
//! [`SheetNotification`]s onto an `mpsc` queue and moves on; the
//! application context drains the queue on its own cadence and delivers
//! each notification to a [`SheetListener`].
//!
//! Every queued notification carries the overlay scope the engine was
//! working under when it produced it, so application-side bookkeeping is
//! attributed to the overlay the event happened on rather than the one
//! active at drain time.
//!
//! [`Deferred`] holds application-context work that must wait: either until
//! pending interactions (drags and settles) finish, or until a fixed delay
//! has elapsed.

use std::sync::mpsc;
use std::time::Duration;

use fsheet_core::geometry::{SnapKey, SnapSource};
use web_time::Instant;

/// A lifecycle event produced by the animation context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SheetNotification {
    /// The sheet arrived at `hidden`. Fires once per real hide.
    Hidden,
    /// A settle toward `key` began.
    SnapStart { key: SnapKey, source: SnapSource },
    /// The sheet settled at a key different from the last notified one.
    SnapChange { key: SnapKey, source: SnapSource },
    DragStateChange { dragging: bool },
    SettleStateChange { settling: bool },
    /// Nested list offset at a scroll boundary (drag or momentum edge).
    ScrollOffsetChange { offset: f64 },
}

impl SheetNotification {
    /// Invoke the matching listener method.
    pub fn deliver(&self, listener: &mut dyn SheetListener) {
        match *self {
            Self::Hidden => listener.on_hidden(),
            Self::SnapStart { key, source } => listener.on_snap_start(key, source),
            Self::SnapChange { key, source } => listener.on_snap_change(key, source),
            Self::DragStateChange { dragging } => listener.on_drag_state_change(dragging),
            Self::SettleStateChange { settling } => listener.on_settle_state_change(settling),
            Self::ScrollOffsetChange { offset } => listener.on_scroll_offset_change(offset),
        }
    }
}

/// Application-side receiver of sheet lifecycle events.
///
/// Every method defaults to a no-op.
pub trait SheetListener {
    fn on_hidden(&mut self) {}
    fn on_snap_start(&mut self, _key: SnapKey, _source: SnapSource) {}
    fn on_snap_change(&mut self, _key: SnapKey, _source: SnapSource) {}
    fn on_drag_state_change(&mut self, _dragging: bool) {}
    fn on_settle_state_change(&mut self, _settling: bool) {}
    fn on_scroll_offset_change(&mut self, _offset: f64) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl SheetListener for NoopListener {}

type Callback0 = Box<dyn FnMut() + Send>;
type SnapCallback = Box<dyn FnMut(SnapKey, SnapSource) + Send>;
type BoolCallback = Box<dyn FnMut(bool) + Send>;
type OffsetCallback = Box<dyn FnMut(f64) + Send>;

/// Closure-based listener, one optional callback per notification.
#[derive(Default)]
pub struct SheetCallbacks {
    on_hidden: Option<Callback0>,
    on_snap_start: Option<SnapCallback>,
    on_snap_change: Option<SnapCallback>,
    on_drag_state_change: Option<BoolCallback>,
    on_settle_state_change: Option<BoolCallback>,
    on_scroll_offset_change: Option<OffsetCallback>,
}

impl std::fmt::Debug for SheetCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetCallbacks")
            .field("on_hidden", &self.on_hidden.is_some())
            .field("on_snap_start", &self.on_snap_start.is_some())
            .field("on_snap_change", &self.on_snap_change.is_some())
            .field("on_drag_state_change", &self.on_drag_state_change.is_some())
            .field("on_settle_state_change", &self.on_settle_state_change.is_some())
            .field("on_scroll_offset_change", &self.on_scroll_offset_change.is_some())
            .finish()
    }
}

impl SheetCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_hidden(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_hidden = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_snap_start(mut self, f: impl FnMut(SnapKey, SnapSource) + Send + 'static) -> Self {
        self.on_snap_start = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_snap_change(mut self, f: impl FnMut(SnapKey, SnapSource) + Send + 'static) -> Self {
        self.on_snap_change = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_drag_state_change(mut self, f: impl FnMut(bool) + Send + 'static) -> Self {
        self.on_drag_state_change = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_settle_state_change(mut self, f: impl FnMut(bool) + Send + 'static) -> Self {
        self.on_settle_state_change = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_scroll_offset_change(mut self, f: impl FnMut(f64) + Send + 'static) -> Self {
        self.on_scroll_offset_change = Some(Box::new(f));
        self
    }
}

impl SheetListener for SheetCallbacks {
    fn on_hidden(&mut self) {
        if let Some(f) = self.on_hidden.as_mut() {
            f();
        }
    }

    fn on_snap_start(&mut self, key: SnapKey, source: SnapSource) {
        if let Some(f) = self.on_snap_start.as_mut() {
            f(key, source);
        }
    }

    fn on_snap_change(&mut self, key: SnapKey, source: SnapSource) {
        if let Some(f) = self.on_snap_change.as_mut() {
            f(key, source);
        }
    }

    fn on_drag_state_change(&mut self, dragging: bool) {
        if let Some(f) = self.on_drag_state_change.as_mut() {
            f(dragging);
        }
    }

    fn on_settle_state_change(&mut self, settling: bool) {
        if let Some(f) = self.on_settle_state_change.as_mut() {
            f(settling);
        }
    }

    fn on_scroll_offset_change(&mut self, offset: f64) {
        if let Some(f) = self.on_scroll_offset_change.as_mut() {
            f(offset);
        }
    }
}

/// A notification tagged with the overlay scope it was produced under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scoped {
    pub scope: u64,
    pub notification: SheetNotification,
}

/// Create a connected sender/queue pair.
#[must_use]
pub fn notification_channel() -> (NotificationSender, NotificationQueue) {
    let (tx, rx) = mpsc::channel();
    (NotificationSender { tx }, NotificationQueue { rx })
}

/// Animation-context end. Sending never blocks.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<Scoped>,
}

impl NotificationSender {
    /// Queue `notification` under `scope`. A disconnected application
    /// context is logged and otherwise ignored.
    pub fn send(&self, scope: u64, notification: SheetNotification) {
        if self.tx.send(Scoped { scope, notification }).is_err() {
            tracing::debug!(?notification, scope, "application context gone, notification dropped");
        }
    }

    pub fn send_all(
        &self,
        scope: u64,
        notifications: impl IntoIterator<Item = SheetNotification>,
    ) {
        for n in notifications {
            self.send(scope, n);
        }
    }
}

/// Application-context end.
#[derive(Debug)]
pub struct NotificationQueue {
    rx: mpsc::Receiver<Scoped>,
}

impl NotificationQueue {
    /// Take everything queued so far without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<Scoped> {
        self.rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next notification.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Scoped> {
        self.rx.recv_timeout(timeout).ok()
    }
}

// ---------------------------------------------------------------------------
// Deferred application-context work
// ---------------------------------------------------------------------------

/// When a deferred task becomes runnable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
    /// Next time the queue is polled.
    Now,
    /// Once no drag or settle is in progress.
    AfterInteractions,
    /// After a fixed delay from scheduling time.
    After(Duration),
}

#[derive(Debug)]
enum Gate {
    Immediate,
    Interactions,
    At(Instant),
}

/// Pending application-context tasks.
#[derive(Debug)]
pub struct Deferred<T> {
    tasks: Vec<(Gate, T)>,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<T> Deferred<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task`. Delays are measured from `now`.
    pub fn schedule(&mut self, when: When, now: Instant, task: T) {
        let gate = match when {
            When::Now => Gate::Immediate,
            When::AfterInteractions => Gate::Interactions,
            When::After(delay) => Gate::At(now + delay),
        };
        self.tasks.push((gate, task));
    }

    /// Remove and return every task that may run now, in scheduling order.
    pub fn take_ready(&mut self, now: Instant, interactions_idle: bool) -> Vec<T> {
        let mut ready = Vec::new();
        let mut waiting = Vec::with_capacity(self.tasks.len());
        for (gate, task) in self.tasks.drain(..) {
            let runnable = match gate {
                Gate::Immediate => true,
                Gate::Interactions => interactions_idle,
                Gate::At(due) => now >= due,
            };
            if runnable {
                ready.push(task);
            } else {
                waiting.push((gate, task));
            }
        }
        self.tasks = waiting;
        ready
    }

    /// Drop queued tasks matching `pred`.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) {
        self.tasks.retain(|(_, t)| !pred(t));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl SheetListener for Recorder {
        fn on_hidden(&mut self) {
            self.0.push("hidden".into());
        }
        fn on_snap_change(&mut self, key: SnapKey, _source: SnapSource) {
            self.0.push(format!("change:{key}"));
        }
    }

    #[test]
    fn queue_preserves_order() {
        let (tx, queue) = notification_channel();
        tx.send(
            1,
            SheetNotification::SnapChange {
                key: SnapKey::Middle,
                source: SnapSource::Gesture,
            },
        );
        tx.send(2, SheetNotification::Hidden);
        let mut rec = Recorder::default();
        let drained = queue.drain();
        assert_eq!(drained.iter().map(|s| s.scope).collect::<Vec<_>>(), vec![1, 2]);
        for s in drained {
            s.notification.deliver(&mut rec);
        }
        assert_eq!(rec.0, vec!["change:middle", "hidden"]);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn send_after_queue_dropped_does_not_panic() {
        let (tx, queue) = notification_channel();
        drop(queue);
        tx.send(0, SheetNotification::Hidden);
    }

    #[test]
    fn callbacks_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s1 = Arc::clone(&seen);
        let s2 = Arc::clone(&seen);
        let mut cbs = SheetCallbacks::new()
            .on_drag_state_change(move |d| s1.lock().unwrap().push(format!("drag:{d}")))
            .on_scroll_offset_change(move |o| s2.lock().unwrap().push(format!("scroll:{o}")));
        SheetNotification::DragStateChange { dragging: true }.deliver(&mut cbs);
        SheetNotification::ScrollOffsetChange { offset: 12.0 }.deliver(&mut cbs);
        SheetNotification::Hidden.deliver(&mut cbs);
        assert_eq!(*seen.lock().unwrap(), vec!["drag:true", "scroll:12"]);
    }

    #[test]
    fn deferred_gates() {
        let base = Instant::now();
        let mut d = Deferred::new();
        d.schedule(When::Now, base, 1);
        d.schedule(When::AfterInteractions, base, 2);
        d.schedule(When::After(Duration::from_millis(100)), base, 3);

        assert_eq!(d.take_ready(base, false), vec![1]);
        assert_eq!(d.take_ready(base + Duration::from_millis(50), true), vec![2]);
        assert!(d.take_ready(base + Duration::from_millis(99), true).is_empty());
        assert_eq!(d.take_ready(base + Duration::from_millis(100), true), vec![3]);
        assert!(d.is_empty());
    }

    #[test]
    fn deferred_cancel_where() {
        let base = Instant::now();
        let mut d = Deferred::new();
        d.schedule(When::AfterInteractions, base, "a");
        d.schedule(When::AfterInteractions, base, "b");
        d.cancel_where(|t| *t == "a");
        assert_eq!(d.len(), 1);
        assert_eq!(d.take_ready(base, true), vec!["b"]);
    }
}
