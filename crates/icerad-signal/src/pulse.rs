//! Analytic impulse parameterization for in-ice radio emission.
//!
//! The pulse is defined in the frequency domain by an energy-fluence
//! amplitude parameter `amp_p0`, an exponential spectral slope `amp_p1`,
//! and a linear phase `phase_p0 + f * phase_p1`. The normalization is
//! chosen so that the squared pulse integrated over the trace equals
//! `amp_p0 / EPSILON0_C`, either over the full band or over an explicit
//! passband shaped by a 10th-order analog Butterworth.

use num_complex::Complex64;
use thiserror::Error;

use icerad_core::units;

use crate::fft;
use crate::filter::{self, FilterError};

/// Butterworth order used for the optional passband shaping.
const BANDPASS_ORDER: usize = 10;

/// Errors from pulse construction.
#[derive(Debug, Error)]
pub enum PulseError {
    /// Without a passband, a flat spectral slope has no finite band
    /// integral to normalize against
    #[error("Spectral slope must be negative when no passband is given, got {slope}")]
    InvalidSlope {
        /// The offending slope in 1/GHz
        slope: f64,
    },

    /// Trace length must allow at least one non-DC frequency bin
    #[error("Trace length {n} is too short for a pulse")]
    TraceTooShort {
        /// The offending length
        n: usize,
    },

    /// Passband construction failed
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Amplitude parameter (log10 of the energy fluence in eV/m^2) expected
/// for a shower of `energy` eV, from the parameterization fit.
#[must_use]
pub fn amp_from_energy(energy: f64) -> f64 {
    0.5 * energy.log10() + 0.128_767_05
}

/// Frequency-domain analytic pulse.
///
/// `amp_p0` is the energy fluence in eV/m^2 (its sign carries the field
/// polarity), `amp_p1` the spectral slope in 1/GHz, `phase_p0`/`phase_p1`
/// the linear phase, `bandpass` an optional (low, high) band in GHz.
///
/// # Errors
///
/// Returns [`PulseError::InvalidSlope`] when the normalization integral
/// diverges and [`PulseError::Filter`] for a degenerate passband.
pub fn analytic_pulse_freq(
    amp_p0: f64,
    amp_p1: f64,
    phase_p0: f64,
    phase_p1: f64,
    n_samples: usize,
    sampling_rate: f64,
    bandpass: Option<(f64, f64)>,
) -> Result<Vec<Complex64>, PulseError> {
    if n_samples < 2 {
        return Err(PulseError::TraceTooShort { n: n_samples });
    }

    let fluence = amp_p0 / units::EPSILON0_C;
    let dt = 1.0 / sampling_rate;
    let frequencies = fft::rfftfreq(n_samples, sampling_rate);
    let df = frequencies[1] - frequencies[0];

    let amp_root = fluence.signum() * fluence.abs().sqrt();

    let ln10 = std::f64::consts::LN_10;
    let norm = match bandpass {
        None => {
            if amp_p1 >= 0.0 {
                return Err(PulseError::InvalidSlope { slope: amp_p1 });
            }
            -1.0 / (2.0 * amp_p1 * ln10)
        }
        Some((low, high)) => {
            if amp_p1 == 0.0 {
                high - low
            } else {
                (100_f64.powf(amp_p1 * high) - 100_f64.powf(amp_p1 * low)) / (2.0 * amp_p1 * ln10)
            }
        }
    };

    let mut spectrum: Vec<Complex64> = frequencies
        .iter()
        .map(|&f| {
            let amp = amp_root * 10_f64.powf(f * amp_p1);
            let phase = phase_p0 + f * phase_p1;
            Complex64::from_polar(amp, phase) / norm.sqrt() / dt.sqrt() * df.sqrt()
        })
        .collect();

    if let Some(band) = bandpass {
        let response = filter::bandpass_response(&frequencies, BANDPASS_ORDER, band)?;
        for (s, h) in spectrum.iter_mut().zip(response.iter()) {
            *s *= h;
        }
    }

    Ok(spectrum)
}

/// Time-domain analytic pulse; see [`analytic_pulse_freq`].
///
/// # Errors
///
/// Same as [`analytic_pulse_freq`].
pub fn analytic_pulse(
    amp_p0: f64,
    amp_p1: f64,
    phase_p0: f64,
    phase_p1: f64,
    n_samples: usize,
    sampling_rate: f64,
    bandpass: Option<(f64, f64)>,
) -> Result<Vec<f64>, PulseError> {
    let spectrum = analytic_pulse_freq(
        amp_p0,
        amp_p1,
        phase_p0,
        phase_p1,
        n_samples,
        sampling_rate,
        bandpass,
    )?;
    Ok(fft::freq2time(&spectrum, sampling_rate, n_samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amp_scales_with_energy() {
        let a18 = amp_from_energy(1e18);
        let a19 = amp_from_energy(1e19);
        assert!((a19 - a18 - 0.5).abs() < 1e-12);
        assert!((a18 - 9.128_767_05).abs() < 1e-6);
    }

    #[test]
    fn spectrum_has_rfft_length() {
        let spec =
            analytic_pulse_freq(1e9, -0.5, 0.0, 0.0, 512, 2.0, Some((0.1, 0.5))).unwrap();
        assert_eq!(spec.len(), 257);
    }

    #[test]
    fn pulse_samples_are_finite() {
        let pulse = analytic_pulse(1e9, -0.4, 1.0, -20.0, 256, 1.0, Some((0.05, 0.3))).unwrap();
        assert_eq!(pulse.len(), 256);
        assert!(pulse.iter().all(|v| v.is_finite()));
        assert!(pulse.iter().any(|v| v.abs() > 0.0));
    }

    #[test]
    fn band_limited_pulse_has_no_out_of_band_power() {
        let band = (0.1, 0.3);
        let spec = analytic_pulse_freq(1e9, -0.5, 0.0, 0.0, 1024, 2.0, Some(band)).unwrap();
        let freqs = fft::rfftfreq(1024, 2.0);
        for (f, s) in freqs.iter().zip(spec.iter()) {
            if *f > 3.0 * band.1 {
                assert!(
                    s.norm() < 1e-3 * spec[51].norm(),
                    "power at {f} GHz not suppressed"
                );
            }
        }
    }

    #[test]
    fn flat_slope_without_band_is_rejected() {
        assert!(matches!(
            analytic_pulse_freq(1e9, 0.0, 0.0, 0.0, 128, 1.0, None),
            Err(PulseError::InvalidSlope { .. })
        ));
    }

    #[test]
    fn negative_fluence_flips_polarity() {
        let plus = analytic_pulse(1e9, -0.5, 0.0, 0.0, 256, 1.0, Some((0.1, 0.4))).unwrap();
        let minus = analytic_pulse(-1e9, -0.5, 0.0, 0.0, 256, 1.0, Some((0.1, 0.4))).unwrap();
        for (p, m) in plus.iter().zip(minus.iter()) {
            assert!((p + m).abs() < 1e-9);
        }
    }

    #[test]
    fn integrated_power_is_linear_in_fluence() {
        let rate = 2.0;
        let power = |fluence: f64| {
            let pulse =
                analytic_pulse(fluence, -0.2, 0.0, -60.0, 2048, rate, Some((0.2, 0.7))).unwrap();
            pulse.iter().map(|v| v * v).sum::<f64>() / rate
        };
        let p1 = power(1e9);
        let p2 = power(2e9);
        assert!((p2 / p1 - 2.0).abs() < 1e-6);
    }

    #[test]
    fn fluence_recovered_from_integrated_pulse() {
        // the normalization references the trace window: fluence equals
        // the squared-voltage integral times duration / rate (in internal
        // units) times EPSILON0_C
        let fluence = 1e9;
        let rate = 2.0;
        let n = 4096_usize;
        let pulse = analytic_pulse(fluence, -0.2, 0.0, -60.0, n, rate, Some((0.2, 0.7))).unwrap();
        let dt = 1.0 / rate;
        let integral: f64 = pulse.iter().map(|v| v * v).sum::<f64>() * dt;
        let duration = n as f64 * dt;
        let recovered = integral * duration / rate * units::EPSILON0_C;
        assert!(
            (recovered - fluence).abs() / fluence < 0.2,
            "recovered {recovered:.3e} vs {fluence:.3e}"
        );
    }
}
