#![forbid(unsafe_code)]

//! Sheet orchestration across the two execution contexts.
//!
//! # Contexts
//!
//! - [`SheetEngine`] is the animation context. It owns every shared-cell
//!   writer, the [`GestureArbiter`], the [`AnimationDriver`], the
//!   [`SheetStateMachine`], and the [`ScrollTracker`]. Touches and scroll
//!   events are handled synchronously; app requests are drained at the start
//!   of each [`frame`](SheetEngine::frame).
//! - [`SheetApp`] is the application context. It diffs incoming
//!   [`SheetProps`], turns them into engine requests, drains notifications
//!   into a [`SheetListener`], records user snaps in [`PositionMemory`], and
//!   runs scroll restoration through [`ScrollSync`].
//!
//! [`OverlaySheetController`] bundles both halves with a [`VirtualList`] and a
//! listener for single-threaded hosts. [`sheet_contexts`] builds the halves
//! separately when they run on different threads.
//!
//! # External snap requests vs gestures
//!
//! The engine stamps every claim and every external request with a sequence
//! number. Whichever was issued last wins: a gesture claim drops an
//! outstanding external request, while an external request that arrives
//! mid-drag is applied at release instead of the gesture's destination. An
//! external request is satisfied once the offset is within
//! `snap_epsilon` of its target.
//!
//! # Touches during a settle
//!
//! A touch-down while settling freezes the spring where it is, so a claim
//! tracks the finger 1:1 from the frozen offset. If the stream ends or is
//! handed off without a claim, the held settle resumes toward its target.
//!
//! # Overlay scopes
//!
//! Each overlay the app enters gets a scope number, forwarded to the engine
//! ahead of any request issued under it. Notifications carry the scope that
//! was current when the settle began, and position memory is recorded under
//! that scope's overlay.

use std::sync::mpsc;
use std::time::Duration;

use ahash::AHashMap;
use fsheet_core::config::{ArbiterConfig, SheetConfig};
use fsheet_core::geometry::{SnapKey, SnapProfile, SnapSource};
use fsheet_core::gesture::{
    ArbiterInputs, ArbiterOutcome, AxisLock, Classification, GestureArbiter, Region,
    ScrollSnapshot, TouchEvent,
};
use fsheet_core::snap::{LayoutInputs, SnapPointModel};
use web_time::Instant;

use crate::cell::{CellReader, CellWriter, shared_cell};
use crate::dispatch::{
    NotificationQueue, NotificationSender, Scoped, SheetListener, SheetNotification,
    notification_channel,
};
use crate::driver::{AnimationDriver, AnimationToken, TokenReader};
use crate::list::VirtualList;
use crate::memory::PositionMemory;
use crate::overlay::{InMemoryScrollStore, OverlayId, OverlayScrollStore, OverlayStack};
use crate::scroll::{ListView, ScrollEvent, ScrollSync, ScrollTracker};
use crate::state::{SheetState, SheetStateMachine};

/// Imperative snap request. A request equal to the last one seen is ignored,
/// so bump `token` to repeat a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapRequest {
    pub key: SnapKey,
    pub token: u64,
}

impl SnapRequest {
    #[must_use]
    pub const fn new(key: SnapKey, token: u64) -> Self {
        Self { key, token }
    }
}

/// Declarative controller inputs, re-sent whole on every host update.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetProps {
    pub visible: bool,
    pub snap_profile: SnapProfile,
    /// Key shown on open when nothing is remembered for the overlay.
    pub initial_snap_key: SnapKey,
    pub snap_to: Option<SnapRequest>,
    pub interaction_enabled: bool,
    /// Overrides the arbiter's `dismiss_slop` when set.
    pub dismiss_threshold: Option<f64>,
    pub header_height: f64,
    pub root_overlay: OverlayId,
    pub overlay: OverlayId,
}

impl Default for SheetProps {
    fn default() -> Self {
        let root = OverlayId::from("root");
        Self {
            visible: false,
            snap_profile: SnapProfile::default(),
            initial_snap_key: SnapKey::Middle,
            snap_to: None,
            interaction_enabled: true,
            dismiss_threshold: None,
            header_height: 64.0,
            overlay: root.clone(),
            root_overlay: root,
        }
    }
}

/// Advisory request from the application context.
#[derive(Debug, Clone, Copy, PartialEq)]
enum EngineRequest {
    Show { initial: SnapKey },
    Hide,
    SetProfile(SnapProfile),
    SnapTo { key: SnapKey },
    SetInteraction(bool),
    SetDismissThreshold(Option<f64>),
    SetHeaderHeight(f64),
    /// Requests and notifications that follow belong to this overlay scope.
    SetScope(u64),
    ForceResync,
}

/// Overlay scopes remembered for late notifications.
const SCOPE_HISTORY: u64 = 8;

/// Build a connected engine/app pair.
#[must_use]
pub fn sheet_contexts(config: SheetConfig) -> (SheetEngine, SheetApp) {
    let (notify_tx, notify_rx) = notification_channel();
    let (request_tx, request_rx) = mpsc::channel();

    let profile = SnapProfile::default();
    let (offset_w, offset_r) = shared_cell(profile.offset(SnapKey::Hidden));
    let (scroll_w, scroll_r) = shared_cell(ScrollSnapshot::default());
    let (axis_w, axis_r) = shared_cell(AxisLock::None);
    let (profile_w, profile_r) = shared_cell(profile);

    let driver = AnimationDriver::new(config.spring.clone(), offset_w);
    let tokens = driver.token_reader();

    let engine = SheetEngine {
        arbiter: GestureArbiter::new(config.arbiter.clone()),
        base_arbiter: config.arbiter.clone(),
        driver,
        state: SheetStateMachine::new(),
        scroll: ScrollTracker::new(scroll_w),
        axis_lock: axis_w,
        profile: profile_w,
        notifier: notify_tx,
        requests: request_rx,
        header_height: SheetProps::default().header_height,
        interaction_enabled: true,
        dismissible: config.controller.dismissible,
        snap_epsilon: config.controller.snap_epsilon,
        seq: 0,
        gesture_seq: 0,
        pending_external: None,
        held: None,
        scope: 0,
        settle_scope: 0,
    };
    let app = SheetApp {
        props: None,
        overlays: None,
        scope: 0,
        scopes: AHashMap::new(),
        snap_model: SnapPointModel::new(config.snap.clone(), config.controller.dismissible),
        requests: request_tx,
        queue: notify_rx,
        memory: PositionMemory::new(),
        scroll_sync: ScrollSync::new(config.scroll.clone()),
        store: Box::new(InMemoryScrollStore::new()),
        last_snap_request: None,
        dragging: false,
        settling: false,
        offset: offset_r,
        scroll: scroll_r,
        axis_lock: axis_r,
        profile: profile_r,
        tokens,
    };
    (engine, app)
}

// ---------------------------------------------------------------------------
// Animation context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExternalSnap {
    key: SnapKey,
    seq: u64,
}

/// Animation-context half of the sheet.
#[derive(Debug)]
pub struct SheetEngine {
    arbiter: GestureArbiter,
    base_arbiter: ArbiterConfig,
    driver: AnimationDriver,
    state: SheetStateMachine,
    scroll: ScrollTracker,
    axis_lock: CellWriter<AxisLock>,
    profile: CellWriter<SnapProfile>,
    notifier: NotificationSender,
    requests: mpsc::Receiver<EngineRequest>,
    header_height: f64,
    interaction_enabled: bool,
    dismissible: bool,
    snap_epsilon: f64,
    seq: u64,
    gesture_seq: u64,
    pending_external: Option<ExternalSnap>,
    /// Settle target frozen under a touch that has not claimed yet.
    held: Option<SnapKey>,
    scope: u64,
    settle_scope: u64,
}

impl SheetEngine {
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.driver.offset()
    }

    #[must_use]
    pub fn profile(&self) -> SnapProfile {
        self.profile.get()
    }

    #[must_use]
    pub fn state(&self) -> SheetState {
        self.state.state()
    }

    #[must_use]
    pub fn token(&self) -> AnimationToken {
        self.driver.token()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.arbiter.is_dragging()
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.driver.is_animating()
    }

    #[must_use]
    pub fn interaction_enabled(&self) -> bool {
        self.interaction_enabled
    }

    /// Key of the external request still being honored, if any.
    #[must_use]
    pub fn pending_external(&self) -> Option<SnapKey> {
        self.pending_external.map(|p| p.key)
    }

    /// Overlay scope the engine is currently working under.
    #[must_use]
    pub fn scope(&self) -> u64 {
        self.scope
    }

    fn emit(&self, out: Vec<SheetNotification>) {
        self.notifier.send_all(self.scope, out);
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn inputs(&self) -> ArbiterInputs {
        ArbiterInputs {
            offset: self.driver.offset(),
            profile: self.profile.get(),
            scroll: self.scroll.snapshot(),
            header_height: self.header_height,
            dismissible: self.dismissible,
        }
    }

    /// Feed one pointer event.
    pub fn touch(&mut self, event: TouchEvent) -> ArbiterOutcome {
        if matches!(event, TouchEvent::Down { .. })
            && (!self.interaction_enabled || self.state.state().is_hidden_or_hiding())
        {
            tracing::trace!(
                interaction_enabled = self.interaction_enabled,
                "touch down ignored"
            );
            return ArbiterOutcome::Ignored;
        }
        let inputs = self.inputs();
        let outcome = self.arbiter.process(event, &inputs);
        if matches!(event, TouchEvent::Down { .. }) && outcome == ArbiterOutcome::Tracking {
            self.hold_settle();
        }
        self.apply_outcome(outcome);
        self.resume_held_settle();
        self.publish_axis_lock();
        outcome
    }

    /// Freeze a running settle under a fresh touch.
    fn hold_settle(&mut self) {
        let SheetState::Settling { target, .. } = self.state.state() else {
            return;
        };
        if !self.driver.is_animating() {
            return;
        }
        self.driver.interrupt();
        self.held = Some(target);
        tracing::debug!(
            target = target.as_str(),
            offset = self.driver.offset(),
            "settle held under touch"
        );
    }

    /// Resume a held settle once the touch can no longer claim the panel.
    fn resume_held_settle(&mut self) {
        let Some(target) = self.held else {
            return;
        };
        if matches!(
            self.arbiter.classification(),
            Some(Classification::Neutral | Classification::VerticalClaimed(_))
        ) {
            return;
        }
        self.held = None;
        let offset = self.profile.get().offset(target);
        tracing::debug!(target = target.as_str(), "held settle resumed");
        self.driver.move_to(offset, 0.0, target == SnapKey::Hidden);
    }

    fn publish_axis_lock(&mut self) {
        let lock = self
            .arbiter
            .context(Region::Expand)
            .map_or(AxisLock::None, |ctx| ctx.axis_lock);
        self.axis_lock.set(lock);
    }

    fn apply_outcome(&mut self, outcome: ArbiterOutcome) {
        match outcome {
            ArbiterOutcome::Claimed { offset, .. } => {
                self.gesture_seq = self.next_seq();
                if let Some(p) = self.pending_external.take() {
                    tracing::debug!(key = p.key.as_str(), "gesture supersedes external snap");
                }
                self.held = None;
                self.driver.drag_to(offset);
                let out = self.state.begin_drag();
                self.emit(out);
            }
            ArbiterOutcome::Dragged { offset } => self.driver.drag_to(offset),
            ArbiterOutcome::Released {
                destination,
                velocity,
                ..
            } => match self.pending_external {
                Some(p) if p.seq > self.gesture_seq => {
                    tracing::debug!(
                        key = p.key.as_str(),
                        gesture = destination.as_str(),
                        "external snap issued mid-drag wins release"
                    );
                    self.settle(p.key, SnapSource::Programmatic, velocity);
                }
                _ => self.settle(destination, SnapSource::Gesture, velocity),
            },
            ArbiterOutcome::Ignored | ArbiterOutcome::Tracking | ArbiterOutcome::HandedOff(_) => {}
        }
    }

    fn settle(&mut self, key: SnapKey, source: SnapSource, velocity: f64) {
        let target = self.profile.get().offset(key);
        self.held = None;
        self.settle_scope = self.scope;
        let out = self.state.begin_settle(key, source);
        self.emit(out);
        self.driver.move_to(target, velocity, key == SnapKey::Hidden);
    }

    /// Feed one event from the nested list.
    pub fn scroll_event(&mut self, event: ScrollEvent) {
        if let Some(offset) = self.scroll.apply(event) {
            self.notifier
                .send(self.scope, SheetNotification::ScrollOffsetChange { offset });
        }
    }

    /// Run one display frame. Returns whether another frame is needed.
    pub fn frame(&mut self, dt: Duration) -> bool {
        let _span = tracing::debug_span!(
            "sheet.frame",
            token = self.driver.token().get(),
            dt_ms = dt.as_secs_f64() * 1000.0
        )
        .entered();
        while let Ok(request) = self.requests.try_recv() {
            self.handle_request(request);
        }

        for completion in self.driver.tick(dt) {
            if !self.driver.is_settle(&completion) {
                tracing::trace!(
                    token = completion.token.get(),
                    finished = completion.finished,
                    "stale completion"
                );
                continue;
            }
            let SheetState::Settling { target, .. } = self.state.state() else {
                continue;
            };
            tracing::debug!(
                token = completion.token.get(),
                key = target.as_str(),
                "settle complete"
            );
            let out = self.state.complete(target, completion.notify_hidden);
            self.notifier.send_all(self.settle_scope, out);
        }

        if let Some(p) = self.pending_external {
            let target = self.profile.get().offset(p.key);
            if (self.driver.offset() - target).abs() <= self.snap_epsilon {
                self.pending_external = None;
            }
        }
        self.driver.is_animating()
    }

    fn handle_request(&mut self, request: EngineRequest) {
        tracing::trace!(?request, "engine request");
        match request {
            EngineRequest::Show { initial } => {
                if !self.state.state().is_hidden_or_hiding() {
                    return;
                }
                self.settle_scope = self.scope;
                let out = self.state.show(initial);
                self.emit(out);
                let target = self.profile.get().offset(initial);
                self.driver.move_to(target, 0.0, false);
            }
            EngineRequest::Hide => {
                if self.state.state().is_hidden_or_hiding() {
                    return;
                }
                self.arbiter.reset();
                self.publish_axis_lock();
                self.pending_external = None;
                self.settle(SnapKey::Hidden, SnapSource::Programmatic, 0.0);
            }
            EngineRequest::SetProfile(profile) => self.set_profile(profile),
            EngineRequest::SnapTo { key } => self.snap_to(key),
            EngineRequest::SetInteraction(enabled) => self.set_interaction(enabled),
            EngineRequest::SetDismissThreshold(threshold) => {
                let mut config = self.base_arbiter.clone();
                if let Some(t) = threshold.filter(|t| t.is_finite() && *t >= 0.0) {
                    config.dismiss_slop = t;
                }
                self.arbiter.set_config(config);
            }
            EngineRequest::SetHeaderHeight(h) => {
                self.header_height = if h.is_finite() { h.max(0.0) } else { 0.0 };
            }
            EngineRequest::SetScope(scope) => self.scope = scope,
            EngineRequest::ForceResync => {
                let out = self.state.force_resync();
                self.emit(out);
            }
        }
    }

    fn snap_to(&mut self, key: SnapKey) {
        if self.pending_external.is_some_and(|p| p.key == key) {
            tracing::debug!(key = key.as_str(), "external snap already in flight");
            return;
        }
        let seq = self.next_seq();
        self.pending_external = Some(ExternalSnap { key, seq });
        if self.arbiter.is_dragging() {
            tracing::debug!(key = key.as_str(), "external snap deferred to release");
            return;
        }
        let at_target =
            (self.driver.offset() - self.profile.get().offset(key)).abs() <= self.snap_epsilon;
        if at_target && self.state.state() == SheetState::Settled(key) {
            tracing::debug!(key = key.as_str(), "external snap already satisfied");
            self.pending_external = None;
            return;
        }
        tracing::debug!(key = key.as_str(), seq, "external snap");
        self.settle(key, SnapSource::Programmatic, 0.0);
    }

    fn set_profile(&mut self, profile: SnapProfile) {
        if !self.profile.set(profile) {
            return;
        }
        match self.state.state() {
            SheetState::Settled(key) => {
                self.driver.set_immediate(profile.offset(key));
            }
            SheetState::Hidden => {
                self.driver.set_immediate(profile.offset(SnapKey::Hidden));
            }
            SheetState::Settling { target, .. } => {
                self.driver.retarget(profile.offset(target));
            }
            // The next move re-clamps against the new profile.
            SheetState::Dragging => {}
        }
    }

    fn set_interaction(&mut self, enabled: bool) {
        if self.interaction_enabled == enabled {
            return;
        }
        self.interaction_enabled = enabled;
        if enabled {
            return;
        }
        let inputs = self.inputs();
        let outcome = self.arbiter.force_release(&inputs);
        tracing::debug!(?outcome, "interaction disabled");
        self.apply_outcome(outcome);
        self.arbiter.reset();
        self.resume_held_settle();
        self.publish_axis_lock();
    }
}

// ---------------------------------------------------------------------------
// Application context
// ---------------------------------------------------------------------------

/// Application-context half of the sheet.
pub struct SheetApp {
    props: Option<SheetProps>,
    overlays: Option<OverlayStack>,
    scope: u64,
    /// Scope number to `(root overlay, overlay)`.
    scopes: AHashMap<u64, (OverlayId, OverlayId)>,
    snap_model: SnapPointModel,
    requests: mpsc::Sender<EngineRequest>,
    queue: NotificationQueue,
    memory: PositionMemory,
    scroll_sync: ScrollSync,
    store: Box<dyn OverlayScrollStore + Send>,
    last_snap_request: Option<SnapRequest>,
    dragging: bool,
    settling: bool,
    offset: CellReader<f64>,
    scroll: CellReader<ScrollSnapshot>,
    axis_lock: CellReader<AxisLock>,
    profile: CellReader<SnapProfile>,
    tokens: TokenReader,
}

impl std::fmt::Debug for SheetApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetApp")
            .field("props", &self.props)
            .field("overlays", &self.overlays)
            .field("scope", &self.scope)
            .field("memory", &self.memory)
            .field("scroll_sync", &self.scroll_sync)
            .field("dragging", &self.dragging)
            .field("settling", &self.settling)
            .finish_non_exhaustive()
    }
}

impl SheetApp {
    /// Replace the overlay scroll store.
    #[must_use]
    pub fn with_store(mut self, store: impl OverlayScrollStore + Send + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    #[must_use]
    pub fn props(&self) -> Option<&SheetProps> {
        self.props.as_ref()
    }

    /// Latest published sheet offset.
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.offset.get()
    }

    #[must_use]
    pub fn offset_reader(&self) -> CellReader<f64> {
        self.offset.clone()
    }

    #[must_use]
    pub fn scroll_snapshot(&self) -> ScrollSnapshot {
        self.scroll.get()
    }

    #[must_use]
    pub fn axis_lock(&self) -> AxisLock {
        self.axis_lock.get()
    }

    /// Profile the engine is currently using.
    #[must_use]
    pub fn profile(&self) -> SnapProfile {
        self.profile.get()
    }

    #[must_use]
    pub fn token(&self) -> AnimationToken {
        self.tokens.current()
    }

    /// Active and previous overlay of the current root.
    #[must_use]
    pub fn overlays(&self) -> Option<&OverlayStack> {
        self.overlays.as_ref()
    }

    /// Feed layout measurements to the snap model. Returns the profile to
    /// pass as [`SheetProps::snap_profile`].
    pub fn update_layout(&mut self, inputs: LayoutInputs) -> SnapProfile {
        self.snap_model.update(inputs);
        self.snap_model.profile()
    }

    /// Whether the snap model has seen a usable measurement yet.
    #[must_use]
    pub fn is_layout_measured(&self) -> bool {
        self.snap_model.is_measured()
    }

    #[must_use]
    pub fn memory(&self) -> &PositionMemory {
        &self.memory
    }

    #[must_use]
    pub fn scroll_sync(&self) -> &ScrollSync {
        &self.scroll_sync
    }

    #[must_use]
    pub fn store(&self) -> &dyn OverlayScrollStore {
        self.store.as_ref()
    }

    /// Whether a drag or settle was in progress as of the last pump.
    #[must_use]
    pub fn is_interacting(&self) -> bool {
        self.dragging || self.settling
    }

    fn request(&self, request: EngineRequest) {
        if self.requests.send(request).is_err() {
            tracing::debug!(?request, "animation context gone, request dropped");
        }
    }

    /// Open a new overlay scope and forward it ahead of later requests.
    fn enter_scope(&mut self, props: &SheetProps) {
        self.scope += 1;
        self.scopes.insert(
            self.scope,
            (props.root_overlay.clone(), props.overlay.clone()),
        );
        let oldest = self.scope.saturating_sub(SCOPE_HISTORY);
        self.scopes.retain(|scope, _| *scope > oldest);
        self.request(EngineRequest::SetScope(self.scope));
    }

    /// Track the overlay stack. Returns whether the active overlay changed
    /// from a previously known one.
    fn track_overlay(&mut self, props: &SheetProps) -> bool {
        if let Some(stack) = self
            .overlays
            .as_mut()
            .filter(|stack| stack.root() == &props.root_overlay)
        {
            return stack.switch_to(props.overlay.clone()).is_some();
        }
        let known = self.overlays.is_some();
        let mut stack = OverlayStack::new(props.root_overlay.clone());
        stack.switch_to(props.overlay.clone());
        self.overlays = Some(stack);
        known
    }

    /// Ask the engine to re-announce its settled key.
    pub fn force_resync(&self) {
        self.request(EngineRequest::ForceResync);
    }

    /// Apply a new set of props. `list` supplies the outgoing scroll offset
    /// when the overlay changes.
    pub fn set_props(&mut self, props: SheetProps, now: Instant, list: &dyn ListView) {
        let prev = self.props.take();

        if prev.as_ref().map(|p| p.snap_profile) != Some(props.snap_profile) {
            self.request(EngineRequest::SetProfile(props.snap_profile));
        }
        if prev.as_ref().map(|p| p.interaction_enabled) != Some(props.interaction_enabled) {
            self.request(EngineRequest::SetInteraction(props.interaction_enabled));
        }
        if prev.as_ref().map(|p| p.dismiss_threshold) != Some(props.dismiss_threshold) {
            self.request(EngineRequest::SetDismissThreshold(props.dismiss_threshold));
        }
        if prev.as_ref().map(|p| p.header_height) != Some(props.header_height) {
            self.request(EngineRequest::SetHeaderHeight(props.header_height));
        }

        let was_visible = prev.as_ref().is_some_and(|p| p.visible);
        let switched = self.track_overlay(&props);
        if prev.is_none() || switched {
            self.enter_scope(&props);
        }
        match &prev {
            None => self.scroll_sync.attach(props.overlay.clone()),
            Some(p) if switched => {
                tracing::debug!(from = %p.overlay, to = %props.overlay, "overlay switch");
                self.scroll_sync.switch_overlay(
                    props.overlay.clone(),
                    list.effective_offset(),
                    self.store.as_mut(),
                    now,
                );
                if was_visible && props.visible {
                    let key = self.memory.resolve_remembered(
                        &props.root_overlay,
                        &props.overlay,
                        props.initial_snap_key,
                    );
                    self.request(EngineRequest::SnapTo { key });
                }
            }
            Some(_) => {}
        }

        if props.visible && !was_visible {
            let initial = self.memory.resolve_remembered(
                &props.root_overlay,
                &props.overlay,
                props.initial_snap_key,
            );
            tracing::debug!(key = initial.as_str(), "show");
            self.request(EngineRequest::Show { initial });
        } else if !props.visible && was_visible {
            tracing::debug!("hide");
            self.request(EngineRequest::Hide);
        }

        if let Some(req) = props.snap_to {
            if self.last_snap_request == Some(req) {
                tracing::trace!(key = req.key.as_str(), token = req.token, "snap request dedupe");
            } else {
                self.last_snap_request = Some(req);
                if props.visible {
                    tracing::debug!(key = req.key.as_str(), token = req.token, "snap request");
                    self.request(EngineRequest::SnapTo { key: req.key });
                }
            }
        }

        self.props = Some(props);
    }

    /// Drain notifications into `listener` and run due scroll restoration.
    /// Returns how many notifications were delivered.
    pub fn pump(
        &mut self,
        now: Instant,
        list: &mut dyn ListView,
        listener: &mut dyn SheetListener,
    ) -> usize {
        let notifications = self.queue.drain();
        let delivered = notifications.len();
        for Scoped {
            scope,
            notification: n,
        } in notifications
        {
            match n {
                SheetNotification::DragStateChange { dragging } => self.dragging = dragging,
                SheetNotification::SettleStateChange { settling } => self.settling = settling,
                SheetNotification::SnapStart { key, source }
                | SheetNotification::SnapChange { key, source } => {
                    match self.scopes.get(&scope) {
                        Some((root, overlay)) => {
                            self.memory.record_user_snap(root, overlay, key, source);
                        }
                        None => {
                            tracing::trace!(scope, key = key.as_str(), "snap outside a known overlay scope");
                        }
                    }
                }
                SheetNotification::Hidden | SheetNotification::ScrollOffsetChange { .. } => {}
            }
            n.deliver(listener);
        }
        let idle = !self.is_interacting();
        for (phase, outcome) in self.scroll_sync.run_due(now, idle, list) {
            tracing::trace!(?phase, ?outcome, "restore attempt ran");
        }
        delivered
    }
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

/// Engine, app, list, and listener driven from one thread.
pub struct OverlaySheetController<T> {
    engine: SheetEngine,
    app: SheetApp,
    list: VirtualList<T>,
    listener: Box<dyn SheetListener + Send>,
}

impl<T> std::fmt::Debug for OverlaySheetController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlaySheetController")
            .field("engine", &self.engine)
            .field("app", &self.app)
            .finish_non_exhaustive()
    }
}

impl<T> OverlaySheetController<T> {
    /// Mount a hidden controller. Nothing shows until props arrive.
    #[must_use]
    pub fn new(
        config: SheetConfig,
        list: VirtualList<T>,
        listener: impl SheetListener + Send + 'static,
    ) -> Self {
        let (engine, app) = sheet_contexts(config);
        Self {
            engine,
            app,
            list,
            listener: Box::new(listener),
        }
    }

    /// Replace the overlay scroll store.
    #[must_use]
    pub fn with_store(mut self, store: impl OverlayScrollStore + Send + 'static) -> Self {
        self.app = self.app.with_store(store);
        self
    }

    pub fn set_props(&mut self, props: SheetProps, now: Instant) {
        self.app.set_props(props, now, &self.list);
    }

    pub fn touch(&mut self, event: TouchEvent) -> ArbiterOutcome {
        self.engine.touch(event)
    }

    /// Run one frame of both contexts. Returns whether the engine still
    /// needs frames.
    pub fn frame(&mut self, dt: Duration, now: Instant) -> bool {
        self.forward_scroll_events();
        let animating = self.engine.frame(dt);
        self.app
            .pump(now, &mut self.list, self.listener.as_mut());
        // Restoration may have scrolled the list.
        self.forward_scroll_events();
        animating
    }

    fn forward_scroll_events(&mut self) {
        for event in self.list.take_events() {
            self.engine.scroll_event(event);
        }
    }

    pub fn force_resync(&self) {
        self.app.force_resync();
    }

    #[must_use]
    pub fn offset(&self) -> f64 {
        self.engine.offset()
    }

    #[must_use]
    pub fn state(&self) -> SheetState {
        self.engine.state()
    }

    #[must_use]
    pub fn engine(&self) -> &SheetEngine {
        &self.engine
    }

    #[must_use]
    pub fn app(&self) -> &SheetApp {
        &self.app
    }

    #[must_use]
    pub fn list(&self) -> &VirtualList<T> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut VirtualList<T> {
        &mut self.list
    }

    /// Separate the halves for hosts that run them on different threads.
    #[must_use]
    pub fn into_parts(self) -> (SheetEngine, SheetApp, VirtualList<T>, Box<dyn SheetListener + Send>) {
        (self.engine, self.app, self.list, self.listener)
    }
}
