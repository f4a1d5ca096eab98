#![forbid(unsafe_code)]

//! Core: snap geometry, spring physics, and gesture arbitration.
//!
//! # Role in FrankenSheet
//! `fsheet-core` holds the pure pieces of the sheet engine. Nothing here is
//! shared across threads; every type is owned by whichever execution context
//! drives it.
//!
//! # Primary responsibilities
//! - **SnapProfile / SnapKey**: the discrete resting positions and their
//!   validated pixel offsets.
//! - **SnapPointModel**: derives a profile from layout measurements.
//! - **Spring**: critically damped settle motion in pixel space.
//! - **GestureArbiter**: classifies touch streams and resolves release
//!   destinations.
//! - **SheetConfig**: every tuned constant, loadable from TOML/JSON.
//!
//! # How it fits in the system
//! `fsheet-runtime` owns the shared cells and the two execution contexts
//! and drives these types from its animation context.

pub mod config;
pub mod geometry;
pub mod gesture;
pub mod logging;
pub mod snap;
pub mod spring;
pub mod velocity;

// Tracing macros at the crate root.
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

pub use config::{
    ArbiterConfig, ConfigError, ControllerConfig, ScrollSyncConfig, SheetConfig,
    SnapModelConfig, SpringConfig,
};
pub use geometry::{SnapKey, SnapProfile, SnapSource};
pub use gesture::{
    ArbiterInputs, ArbiterOutcome, AxisLock, Classification, GestureArbiter, GestureContext,
    Handoff, Region, ScrollSnapshot, TouchEvent, resolve_release,
};
pub use snap::{LayoutInputs, SnapPointModel};
pub use spring::Spring;
pub use velocity::{Velocity, VelocityTracker};
