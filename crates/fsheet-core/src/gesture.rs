#![forbid(unsafe_code)]

//! Touch arbitration between the sheet panel and its nested list.
//!
//! [`GestureArbiter`] consumes one pointer stream at a time and decides who
//! owns it: the panel (drag the sheet), the nested list (native scroll), or
//! a horizontal consumer such as a tab pager.
//!
//! # State Machine
//!
//! Each stream moves through explicit classification states:
//!
//! ```text
//!            ┌─────────── |dx| > ratio·|dy| ──────────► HorizontalHandoff
//!  Neutral ──┤
//!            └─ vertical intent ─┬─ panel claims ─────► VerticalClaimed(region)
//!                                └─ list owns ────────► ScrollOwned
//! ```
//!
//! Two recognizer regions share the stream:
//!
//! - **Expand region**: active whenever the panel is below `expanded`, and
//!   for touches that begin inside the header. At `expanded`, upward motion
//!   outside the header is left to the list.
//! - **Collapse region**: armed at touch-down only when the panel rests at
//!   `expanded`; claims downward motion if, at the moment vertical intent is
//!   established, the list is at its top and not coasting.
//!
//! # Invariants
//!
//! 1. Until vertical intent is established no offset is ever produced.
//! 2. A stream that hands off (horizontal or scroll) never produces an
//!    offset for the rest of its lifetime.
//! 3. Drag offsets are clamped into `[expanded, dismiss_or_collapsed]`.
//! 4. A claimed stream ends in exactly one `Released`, including on cancel.

use std::time::Duration;

use web_time::Instant;

use crate::config::ArbiterConfig;
use crate::geometry::{SnapKey, SnapProfile, nearest};
use crate::logging::{debug, trace};
use crate::velocity::VelocityTracker;

/// Distance from `expanded` within which the panel counts as fully open.
const EXPANDED_EPSILON: f64 = 0.5;

/// A raw pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    Down { x: f64, y: f64, at: Instant },
    Move { x: f64, y: f64, at: Instant },
    Up { x: f64, y: f64, at: Instant },
    Cancel,
}

/// Which recognizer owns a claimed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Expand,
    Collapse,
}

impl Region {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expand => "expand-region",
            Self::Collapse => "collapse-region",
        }
    }
}

/// Axis classification of a touch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisLock {
    #[default]
    None,
    Horizontal,
    Vertical,
}

/// Per-recognizer bookkeeping for one stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureContext {
    pub start_offset: f64,
    pub start_touch_x: f64,
    pub start_touch_y: f64,
    pub last_touch_x: f64,
    pub last_touch_y: f64,
    pub axis_lock: AxisLock,
    pub touch_in_header: bool,
}

impl GestureContext {
    fn new(offset: f64, x: f64, y: f64, touch_in_header: bool) -> Self {
        Self {
            start_offset: offset,
            start_touch_x: x,
            start_touch_y: y,
            last_touch_x: x,
            last_touch_y: y,
            axis_lock: AxisLock::None,
            touch_in_header,
        }
    }

    #[inline]
    fn dx(&self) -> f64 {
        self.last_touch_x - self.start_touch_x
    }

    #[inline]
    fn dy(&self) -> f64 {
        self.last_touch_y - self.start_touch_y
    }
}

/// Where a stream currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Neutral,
    HorizontalHandoff,
    VerticalClaimed(Region),
    ScrollOwned,
}

/// Why the panel gave a stream away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// Horizontal intent: swipe-between-tabs and similar consumers.
    Horizontal,
    /// The nested list scrolls instead.
    Scroll,
}

/// Nested list state as seen from the gesture context.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollSnapshot {
    pub offset_y: f64,
    pub in_momentum: bool,
}

impl ScrollSnapshot {
    /// The list sits at its top edge and is not coasting.
    #[inline]
    #[must_use]
    pub fn at_top_and_idle(&self) -> bool {
        self.offset_y <= 0.0 && !self.in_momentum
    }
}

/// Everything the arbiter reads when classifying.
#[derive(Debug, Clone, Copy)]
pub struct ArbiterInputs {
    /// Current panel offset.
    pub offset: f64,
    pub profile: SnapProfile,
    pub scroll: ScrollSnapshot,
    pub header_height: f64,
    /// Gesture dismissal to `hidden` is allowed.
    pub dismissible: bool,
}

impl ArbiterInputs {
    #[inline]
    fn at_expanded(&self) -> bool {
        self.offset <= self.profile.expanded() + EXPANDED_EPSILON
    }
}

/// Result of feeding one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArbiterOutcome {
    /// Nothing to do: no stream, or the stream was already handed off.
    Ignored,
    /// Stream is live but not yet classified.
    Tracking,
    /// The panel gave the stream away.
    HandedOff(Handoff),
    /// The panel took ownership; `offset` is the first drag offset.
    Claimed { region: Region, offset: f64 },
    /// New drag offset.
    Dragged { offset: f64 },
    /// The claimed stream ended.
    Released {
        region: Region,
        offset: f64,
        velocity: f64,
        destination: SnapKey,
    },
}

#[derive(Debug, Clone)]
struct Stream {
    expand: GestureContext,
    collapse: Option<GestureContext>,
    classification: Classification,
    tracker: VelocityTracker,
    offset: f64,
}

impl Stream {
    fn context(&self, region: Region) -> &GestureContext {
        match region {
            Region::Expand => &self.expand,
            Region::Collapse => self.collapse.as_ref().unwrap_or(&self.expand),
        }
    }

    fn track(&mut self, x: f64, y: f64) {
        self.expand.last_touch_x = x;
        self.expand.last_touch_y = y;
        if let Some(ctx) = self.collapse.as_mut() {
            ctx.last_touch_x = x;
            ctx.last_touch_y = y;
        }
    }

    fn lock_axis(&mut self, lock: AxisLock) {
        self.expand.axis_lock = lock;
        if let Some(ctx) = self.collapse.as_mut() {
            ctx.axis_lock = lock;
        }
    }
}

/// Stateful arbiter for a single pointer stream.
#[derive(Debug, Clone)]
pub struct GestureArbiter {
    config: ArbiterConfig,
    stream: Option<Stream>,
}

impl GestureArbiter {
    #[must_use]
    pub fn new(config: ArbiterConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ArbiterConfig) {
        self.config = config;
    }

    /// Current classification, `None` without a live stream.
    #[must_use]
    pub fn classification(&self) -> Option<Classification> {
        self.stream.as_ref().map(|s| s.classification)
    }

    /// Whether the panel currently owns a stream.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(
            self.classification(),
            Some(Classification::VerticalClaimed(_))
        )
    }

    /// Context of the given region for the live stream.
    #[must_use]
    pub fn context(&self, region: Region) -> Option<&GestureContext> {
        let stream = self.stream.as_ref()?;
        match region {
            Region::Expand => Some(&stream.expand),
            Region::Collapse => stream.collapse.as_ref(),
        }
    }

    /// Drop any live stream without producing a release.
    pub fn reset(&mut self) {
        self.stream = None;
    }

    /// Feed one event.
    pub fn process(&mut self, event: TouchEvent, inputs: &ArbiterInputs) -> ArbiterOutcome {
        match event {
            TouchEvent::Down { x, y, at } => self.on_down(x, y, at, inputs),
            TouchEvent::Move { x, y, at } => self.on_move(x, y, at, inputs),
            TouchEvent::Up { x, y, at } => {
                if let Some(stream) = self.stream.as_mut() {
                    stream.track(x, y);
                    stream.tracker.push(at, x, y);
                    if let Classification::VerticalClaimed(region) = stream.classification {
                        stream.offset = drag_offset(stream.context(region), &inputs.profile);
                    }
                }
                self.finish(inputs, true)
            }
            TouchEvent::Cancel => self.finish(inputs, false),
        }
    }

    /// End a claimed stream in place with zero velocity.
    pub fn force_release(&mut self, inputs: &ArbiterInputs) -> ArbiterOutcome {
        self.finish(inputs, false)
    }

    fn on_down(&mut self, x: f64, y: f64, at: Instant, inputs: &ArbiterInputs) -> ArbiterOutcome {
        if self.stream.is_some() {
            // Second pointer while a stream is live.
            return ArbiterOutcome::Ignored;
        }
        let offset = inputs.offset;
        let touch_in_header = y >= offset && y < offset + inputs.header_height.max(0.0);
        let collapse = inputs
            .at_expanded()
            .then(|| GestureContext::new(offset, x, y, touch_in_header));
        let mut tracker =
            VelocityTracker::new(Duration::from_millis(self.config.velocity_window_ms));
        tracker.push(at, x, y);
        self.stream = Some(Stream {
            expand: GestureContext::new(offset, x, y, touch_in_header),
            collapse,
            classification: Classification::Neutral,
            tracker,
            offset,
        });
        trace!(x, y, offset, touch_in_header, "touch down");
        ArbiterOutcome::Tracking
    }

    fn on_move(&mut self, x: f64, y: f64, at: Instant, inputs: &ArbiterInputs) -> ArbiterOutcome {
        let config = &self.config;
        let Some(stream) = self.stream.as_mut() else {
            return ArbiterOutcome::Ignored;
        };
        stream.track(x, y);
        stream.tracker.push(at, x, y);

        match stream.classification {
            Classification::HorizontalHandoff | Classification::ScrollOwned => {
                ArbiterOutcome::Ignored
            }
            Classification::VerticalClaimed(region) => {
                let offset = drag_offset(stream.context(region), &inputs.profile);
                stream.offset = offset;
                trace!(offset, region = region.as_str(), "drag");
                ArbiterOutcome::Dragged { offset }
            }
            Classification::Neutral => {
                let (dx, dy) = (stream.expand.dx(), stream.expand.dy());
                if dx.abs() < config.slop && dy.abs() < config.slop {
                    return ArbiterOutcome::Tracking;
                }
                if dx.abs() > config.axis_lock_ratio * dy.abs() {
                    stream.lock_axis(AxisLock::Horizontal);
                    stream.classification = Classification::HorizontalHandoff;
                    debug!(dx, dy, "axis lock horizontal, panel recognizers fail");
                    return ArbiterOutcome::HandedOff(Handoff::Horizontal);
                }
                stream.lock_axis(AxisLock::Vertical);
                match claim_region(stream, dy, inputs) {
                    Some(region) => {
                        stream.classification = Classification::VerticalClaimed(region);
                        let offset = drag_offset(stream.context(region), &inputs.profile);
                        stream.offset = offset;
                        debug!(region = region.as_str(), dy, offset, "panel claims gesture");
                        ArbiterOutcome::Claimed { region, offset }
                    }
                    None => {
                        stream.classification = Classification::ScrollOwned;
                        debug!(
                            dy,
                            list_offset = inputs.scroll.offset_y,
                            in_momentum = inputs.scroll.in_momentum,
                            "deferring to nested scroll"
                        );
                        ArbiterOutcome::HandedOff(Handoff::Scroll)
                    }
                }
            }
        }
    }

    fn finish(&mut self, inputs: &ArbiterInputs, with_velocity: bool) -> ArbiterOutcome {
        let Some(stream) = self.stream.take() else {
            return ArbiterOutcome::Ignored;
        };
        let Classification::VerticalClaimed(region) = stream.classification else {
            return ArbiterOutcome::Ignored;
        };
        let velocity = if with_velocity {
            stream.tracker.velocity().y
        } else {
            0.0
        };
        let offset = inputs.profile.clamp(stream.offset);
        let destination = resolve_release(
            &inputs.profile,
            offset,
            velocity,
            &self.config,
            inputs.dismissible,
        );
        debug!(
            region = region.as_str(),
            offset,
            velocity,
            destination = destination.as_str(),
            "release"
        );
        ArbiterOutcome::Released {
            region,
            offset,
            velocity,
            destination,
        }
    }
}

/// Decide which region (if any) claims a stream that just showed vertical
/// intent. `dy > 0` is downward.
fn claim_region(stream: &Stream, dy: f64, inputs: &ArbiterInputs) -> Option<Region> {
    if !inputs.at_expanded() || stream.expand.touch_in_header {
        return Some(Region::Expand);
    }
    if dy < 0.0 {
        return None;
    }
    // Re-read the list state now rather than trusting the touch-down snapshot.
    if stream.collapse.is_some() && inputs.scroll.at_top_and_idle() {
        Some(Region::Collapse)
    } else {
        None
    }
}

fn drag_offset(ctx: &GestureContext, profile: &SnapProfile) -> f64 {
    profile.clamp(ctx.start_offset + ctx.dy())
}

/// Resolve the settle destination for a release at `current` moving at
/// `velocity` px/s (positive is downward).
///
/// 1. Upward fling beyond `fling_velocity` goes to the topmost candidate.
/// 2. With dismissal enabled, a downward fling, or any downward release
///    within `dismiss_slop` of `collapsed`, goes to `hidden`.
/// 3. Without dismissal, a downward fling goes to `collapsed`.
/// 4. Otherwise the candidate nearest `current + velocity * projection_factor`.
#[must_use]
pub fn resolve_release(
    profile: &SnapProfile,
    current: f64,
    velocity: f64,
    config: &ArbiterConfig,
    dismissible: bool,
) -> SnapKey {
    let dismissible = dismissible && profile.is_dismissible();
    let candidates = profile.candidates(dismissible);
    let velocity = if velocity.is_finite() { velocity } else { 0.0 };

    if velocity <= -config.fling_velocity {
        return candidates[0].0;
    }
    if dismissible {
        if velocity >= config.fling_velocity {
            return SnapKey::Hidden;
        }
        if velocity > 0.0 && current >= profile.collapsed() - config.dismiss_slop {
            return SnapKey::Hidden;
        }
    } else if velocity >= config.fling_velocity {
        return SnapKey::Collapsed;
    }

    let projected = current + velocity * config.projection_factor;
    nearest(&candidates, projected)
}
