//! Error types for detector description, digitization, and triggering.

use std::path::PathBuf;
use thiserror::Error;

use icerad_core::TraceError;
use icerad_signal::{FilterError, ResampleError};

/// A specialized `Result` type for detector operations.
pub type DetectorResult<T> = Result<T, DetectorError>;

/// Errors from the detector subsystem.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DetectorError {
    /// Detector description file could not be read
    #[error("Failed to read detector description '{path}': {source}")]
    DescriptionIo {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Detector description is not valid JSON
    #[error("Failed to parse detector description: {source}")]
    DescriptionParse {
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Description content violates an invariant
    #[error("Invalid detector description: {message}")]
    Validation {
        /// What was wrong
        message: String,
    },

    /// No antenna pattern registered under the requested name
    #[error("No antenna pattern found for model '{model}' (channel {channel_id})")]
    AntennaPatternNotFound {
        /// The unknown model name
        model: String,
        /// Channel that referenced it
        channel_id: u32,
    },

    /// A mandatory ADC field is absent from the channel description
    #[error("The field '{field}' is not present in channel {channel_id}. Please specify it in the detector file")]
    MissingAdcField {
        /// Missing field name, including any `trigger_` prefix
        field: &'static str,
        /// Channel that was being digitized
        channel_id: u32,
    },

    /// ADC clock faster than the simulated channel
    #[error("ADC sampling rate {adc_rate} GHz is greater than the channel {channel_id} sampling rate {channel_rate} GHz")]
    AdcRateAboveChannelRate {
        /// Channel being digitized
        channel_id: u32,
        /// ADC clock in GHz
        adc_rate: f64,
        /// Channel sampling rate in GHz
        channel_rate: f64,
    },

    /// Nyquist zone index must be at least 1
    #[error("Nyquist zone {zone} is less than one")]
    InvalidNyquistZone {
        /// The offending zone index
        zone: usize,
    },

    /// Requested Nyquist zone reaches beyond the simulated bandwidth
    #[error("Nyquist zone needs {required} GHz but the input provides {available} GHz; use a larger simulation sampling frequency")]
    NyquistZoneAboveInput {
        /// Upper passband edge in GHz
        required: f64,
        /// Input Nyquist frequency in GHz
        available: f64,
    },

    /// Trigger configuration is inconsistent
    #[error("Invalid trigger configuration: {message}")]
    InvalidTrigger {
        /// What was wrong
        message: String,
    },

    /// Trace-level failure during digitization
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    /// Filter construction failed
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Resampling failed
    #[error("Resample error: {0}")]
    Resample(#[from] ResampleError),
}

impl DetectorError {
    /// Returns `true` if this error is recoverable (the current event can
    /// be skipped and the run continued).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Trace(e) => e.is_recoverable(),
            Self::DescriptionIo { .. }
            | Self::DescriptionParse { .. }
            | Self::Validation { .. }
            | Self::AntennaPatternNotFound { .. }
            | Self::MissingAdcField { .. }
            | Self::AdcRateAboveChannelRate { .. }
            | Self::InvalidNyquistZone { .. }
            | Self::NyquistZoneAboveInput { .. }
            | Self::InvalidTrigger { .. }
            | Self::Filter(_)
            | Self::Resample(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_names_field_and_channel() {
        let err = DetectorError::MissingAdcField {
            field: "trigger_adc_n_bits",
            channel_id: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("trigger_adc_n_bits"));
        assert!(msg.contains("channel 7"));
    }

    #[test]
    fn antenna_not_found_is_fatal() {
        let err = DetectorError::AntennaPatternNotFound {
            model: "unknown_model".into(),
            channel_id: 0,
        };
        assert!(!err.is_recoverable());
    }
}
