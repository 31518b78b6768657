//! # icerad Sim
//!
//! Event generation and the simulation pipeline of the icerad suite:
//!
//! - [`generator`] — deterministic neutrino event lists (cylindrical
//!   fiducial volume, isotropic directions, fixed or power-law energies).
//! - [`propagation`] — straight-line signal propagation through
//!   homogeneous ice.
//! - [`pipeline`] — the per-event chain: analytic pulses shaped by the
//!   antenna responses, thermal noise, station triggers, and optional
//!   digitization.
//! - [`veff`] — effective-volume estimates from trigger counts.

#![forbid(unsafe_code)]

pub mod error;
pub mod generator;
pub mod pipeline;
pub mod propagation;
pub mod veff;

pub use error::{SimError, SimResult};
pub use generator::{CylinderVolume, EnergySpectrum, EventGenerator, EventGeneratorConfig};
pub use pipeline::{SimulationConfig, SimulationOutcome, SimulationPipeline, SimulationStats};
pub use propagation::{PropagationConfig, PropagationResult, StraightLinePropagator};
pub use veff::{TriggerFractionBinned, VeffEstimate};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
