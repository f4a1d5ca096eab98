#![forbid(unsafe_code)]

//! Tracing re-exports.
//!
//! Sheet crates log through `tracing`; hosts choose the subscriber. The
//! re-exports let downstream code use `fsheet_core::debug!` without naming
//! the dependency.

pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
