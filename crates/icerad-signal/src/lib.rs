//! # icerad Signal
//!
//! Signal processing for the icerad simulation suite.
//!
//! - [`fft`] — the suite-wide real-FFT conventions (single-sided
//!   amplitude-density spectra).
//! - [`filter`] — analog Butterworth responses applied in the frequency
//!   domain.
//! - [`resample`] — Fourier resampling, FIR upsampling, sub-sample trace
//!   delays.
//! - [`pulse`] — the analytic impulse parameterization for in-ice radio
//!   emission.
//! - [`noise`] — seeded band-limited thermal noise.
//!
//! All frequencies are in GHz, times in ns, and voltages in V
//! (`icerad_core::units`).

#![forbid(unsafe_code)]

pub mod fft;
pub mod filter;
pub mod noise;
pub mod pulse;
pub mod resample;

pub use filter::{bandpass_response, butterworth_filter_trace, FilterError};
pub use noise::{AmplitudeMode, NoiseConfig, NoiseError, NoiseGenerator};
pub use pulse::{amp_from_energy, analytic_pulse, analytic_pulse_freq, PulseError};
pub use resample::{
    delay_trace, fourier_resample, linear_interp, upsampling_fir, ResampleError,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
