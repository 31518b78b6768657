//! Error types shared across the icerad suite.
//!
//! Each subsystem keeps its own error enum; [`CoreError`] is the top-level
//! type the pipeline works with. Errors carry an `is_recoverable`
//! classification: a recoverable error aborts the current event (and is
//! logged), a non-recoverable one aborts the run.

use thiserror::Error;

/// A specialized `Result` type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Top-level error type for the simulation suite.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Trace construction or manipulation error
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    /// Event model error
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
    },

    /// Resource not found
    #[error("Resource not found: {resource_type} with id '{id}'")]
    NotFound {
        /// Type of resource that was not found
        resource_type: &'static str,
        /// Identifier of the missing resource
        id: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

impl CoreError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new not found error.
    #[must_use]
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Trace(e) => e.is_recoverable(),
            Self::Event(e) => e.is_recoverable(),
            Self::Configuration { .. } | Self::NotFound { .. } | Self::Internal { .. } => false,
        }
    }
}

/// Errors related to voltage/field traces.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    /// Sampling rate must be strictly positive
    #[error("Invalid sampling rate: {rate} GHz")]
    InvalidSamplingRate {
        /// The offending rate in GHz
        rate: f64,
    },

    /// Trace has no samples
    #[error("Empty trace")]
    Empty,

    /// Two traces disagree on a property that must match
    #[error("Trace mismatch: {message}")]
    Mismatch {
        /// What disagreed
        message: String,
    },

    /// Not enough samples for the requested operation
    #[error("Insufficient samples: need at least {required}, got {available}")]
    InsufficientSamples {
        /// Minimum required samples
        required: usize,
        /// Available samples
        available: usize,
    },
}

impl TraceError {
    /// Returns `true` if this error is recoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::InsufficientSamples { .. } => true,
            Self::InvalidSamplingRate { .. } | Self::Empty | Self::Mismatch { .. } => false,
        }
    }
}

/// Errors in the event model.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EventError {
    /// Station id not present in the event
    #[error("Unknown station id {station_id}")]
    UnknownStation {
        /// The missing station id
        station_id: u32,
    },

    /// Channel id not present in the station
    #[error("Unknown channel id {channel_id} in station {station_id}")]
    UnknownChannel {
        /// Station the lookup ran against
        station_id: u32,
        /// The missing channel id
        channel_id: u32,
    },

    /// Kinematic value outside its physical range
    #[error("Invalid kinematics: {message}")]
    InvalidKinematics {
        /// Which value and why
        message: String,
    },
}

impl EventError {
    /// Returns `true` if this error is recoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::UnknownStation { .. } | Self::UnknownChannel { .. } => true,
            Self::InvalidKinematics { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_display() {
        let err = CoreError::configuration("bad threshold");
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("bad threshold"));
    }

    #[test]
    fn trace_error_conversion() {
        let trace_err = TraceError::InvalidSamplingRate { rate: -1.0 };
        let core_err: CoreError = trace_err.into();
        assert!(matches!(core_err, CoreError::Trace(_)));
        assert!(!core_err.is_recoverable());
    }

    #[test]
    fn unknown_station_is_recoverable() {
        let err: CoreError = EventError::UnknownStation { station_id: 51 }.into();
        assert!(err.is_recoverable());
    }
}
