#![forbid(unsafe_code)]

//! Runtime: the two execution contexts of the sheet and the cells between them.
//!
//! # Role in FrankenSheet
//! The animation context evaluates every display frame: touch
//! classification, offset mutation, spring evaluation, and token
//! comparisons all happen there without crossing contexts. The application
//! context runs business logic on its own cadence and only reads shared
//! cells or issues advisory requests.
//!
//! # Primary responsibilities
//! - **Shared cells** ([`cell`]): single-writer values with lock-free reads.
//! - **Dispatch** ([`dispatch`]): non-blocking notification queue and
//!   deferred application work.
//! - **AnimationDriver** ([`driver`]): spring settles gated by generation
//!   tokens.
//! - **SheetStateMachine** ([`state`]): lifecycle notifications, once per
//!   real transition.
//! - **ScrollSync** ([`scroll`]): list scroll state for arbitration and
//!   per-overlay scroll restoration.
//! - **PositionMemory** ([`memory`]): last user-chosen key per overlay.
//! - **VirtualList** ([`list`]): the hosted list model.
//! - **OverlaySheetController** ([`controller`]): composes everything.

pub mod cell;
pub mod controller;
pub mod dispatch;
pub mod driver;
pub mod list;
pub mod memory;
pub mod overlay;
pub mod scroll;
pub mod state;

pub use cell::{CellReader, CellWriter, shared_cell};
pub use controller::{
    OverlaySheetController, SheetApp, SheetEngine, SheetProps, SnapRequest, sheet_contexts,
};
pub use dispatch::{
    Deferred, NoopListener, NotificationQueue, NotificationSender, Scoped, SheetCallbacks,
    SheetListener, SheetNotification, When, notification_channel,
};
pub use driver::{AnimationDriver, AnimationToken, Completion, TokenReader};
pub use list::{VirtualList, VisibleItem};
pub use memory::PositionMemory;
pub use overlay::{InMemoryScrollStore, OverlayId, OverlayScrollStore, OverlayStack};
pub use scroll::{
    ListView, RestoreAttempt, RestoreOutcome, RestorePhase, ScrollEvent, ScrollSync,
    ScrollTracker,
};
pub use state::{SheetState, SheetStateMachine};

// Core types, re-exported for hosts.
pub use fsheet_core;
