//! Error types for event generation and the simulation pipeline.

use thiserror::Error;

use icerad_core::{EventError, TraceError};
use icerad_detector::DetectorError;
use icerad_signal::{NoiseError, PulseError};

/// A specialized `Result` type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Errors from the simulation subsystem.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SimError {
    /// Generator or pipeline configuration problem
    #[error("Invalid simulation configuration: {message}")]
    Configuration {
        /// What was wrong
        message: String,
    },

    /// Signal path geometry too degenerate to evaluate
    #[error("Degenerate propagation geometry: path length {distance} m below {minimum} m")]
    DegenerateGeometry {
        /// Path length in m
        distance: f64,
        /// Configured minimum in m
        minimum: f64,
    },

    /// Detector-side failure
    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),

    /// Pulse construction failure
    #[error("Pulse error: {0}")]
    Pulse(#[from] PulseError),

    /// Noise generation failure
    #[error("Noise error: {0}")]
    Noise(#[from] NoiseError),

    /// Trace-level failure
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    /// Event model failure
    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

impl SimError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if this error only affects the current event.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::DegenerateGeometry { .. } => true,
            Self::Detector(e) => e.is_recoverable(),
            Self::Trace(e) => e.is_recoverable(),
            Self::Event(e) => e.is_recoverable(),
            Self::Configuration { .. } | Self::Pulse(_) | Self::Noise(_) => false,
        }
    }
}
