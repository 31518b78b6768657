//! # icerad Core
//!
//! Core types and utilities for the icerad in-ice radio neutrino
//! simulation suite.
//!
//! This crate provides the foundational building blocks used throughout
//! the icerad workspace:
//!
//! - **Trace types**: [`Trace`] for uniformly sampled voltage series with
//!   a sampling rate and a start time.
//! - **Event model**: [`NeutrinoEvent`] (generated kinematics),
//!   [`SimEvent`] / [`SimStation`] / [`SimChannel`] (detector response),
//!   and [`TriggerRecord`].
//! - **Error types**: the [`error`] module with per-subsystem error enums
//!   and a recoverability classification.
//! - **Units**: the [`units`] module — the suite-wide internal unit
//!   system (ns / GHz / V / m / eV).
//!
//! ## Example
//!
//! ```rust
//! use icerad_core::{Trace, units};
//!
//! let trace = Trace::new(vec![0.0, 0.5, -0.5, 0.0], 2.0 * units::GHZ, 0.0).unwrap();
//! assert!((trace.dt() - 0.5).abs() < 1e-12);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod types;
pub mod units;
pub mod utils;

// Re-export commonly used types at the crate root
pub use error::{CoreError, CoreResult, EventError, TraceError};
pub use types::{
    // Identifiers
    ChannelId, EventId, RunId, StationId,
    // Kinematics
    Current, Direction, Flavor, NeutrinoEvent, Position, Shower, ShowerKind,
    // Detector-event hierarchy
    SimChannel, SimEvent, SimStation, TriggerRecord,
    // Traces
    Trace,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
///
/// ```rust
/// use icerad_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{CoreError, CoreResult, EventError, TraceError};
    pub use crate::types::{
        ChannelId, Current, Direction, EventId, Flavor, NeutrinoEvent, Position, RunId, Shower,
        ShowerKind, SimChannel, SimEvent, SimStation, StationId, Trace, TriggerRecord,
    };
    pub use crate::units;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_valid() {
        assert!(!VERSION.is_empty());
    }
}
