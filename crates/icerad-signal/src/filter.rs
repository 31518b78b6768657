//! Analog Butterworth responses applied in the frequency domain.
//!
//! Filtering multiplies the trace spectrum by the analog response instead
//! of designing a digital filter; that keeps the response exact at every
//! frequency bin and leaves the higher Nyquist zones untouched until the
//! response itself rolls them off.

use num_complex::Complex64;
use thiserror::Error;

use crate::fft;

/// Errors from filter construction.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Filter order must be at least 1
    #[error("Filter order must be >= 1")]
    InvalidOrder,

    /// Passband edges must satisfy 0 < low < high
    #[error("Invalid passband: ({low}, {high}) GHz")]
    InvalidPassband {
        /// Lower edge in GHz
        low: f64,
        /// Upper edge in GHz
        high: f64,
    },
}

/// Left-half-plane poles of the normalized Butterworth lowpass prototype.
fn prototype_poles(order: usize) -> Vec<Complex64> {
    let n = order as f64;
    (0..order)
        .map(|k| {
            let theta = std::f64::consts::PI * (2.0 * k as f64 + n + 1.0) / (2.0 * n);
            Complex64::new(theta.cos(), theta.sin())
        })
        .collect()
}

/// Complex response of an analog Butterworth bandpass of the given order,
/// evaluated at `frequencies` (GHz). Unity gain at the geometric band
/// center, -3 dB at the edges.
///
/// # Errors
///
/// Returns [`FilterError`] for a zero order or a degenerate passband.
pub fn bandpass_response(
    frequencies: &[f64],
    order: usize,
    passband: (f64, f64),
) -> Result<Vec<Complex64>, FilterError> {
    if order == 0 {
        return Err(FilterError::InvalidOrder);
    }
    let (low, high) = passband;
    if low <= 0.0 || high <= low {
        return Err(FilterError::InvalidPassband { low, high });
    }

    let poles = prototype_poles(order);
    let bw = high - low;
    let f0_sq = low * high;

    let response = frequencies
        .iter()
        .map(|&f| {
            // lowpass-to-bandpass transform s -> (s^2 + f1 f2) / (s (f2 - f1)),
            // evaluated on the imaginary axis s = j f
            let s = Complex64::new(0.0, f);
            let s_lp = if f == 0.0 {
                // transform diverges at DC; the bandpass gain there is 0
                return Complex64::new(0.0, 0.0);
            } else {
                (s * s + f0_sq) / (s * bw)
            };
            let denom: Complex64 = poles.iter().map(|&p| s_lp - p).product();
            denom.finv()
        })
        .collect();
    Ok(response)
}

/// Filters a trace with an analog Butterworth bandpass applied in the
/// frequency domain. Trace length and sampling rate are preserved.
///
/// # Errors
///
/// Same as [`bandpass_response`].
pub fn butterworth_filter_trace(
    samples: &[f64],
    sampling_rate: f64,
    passband: (f64, f64),
    order: usize,
) -> Result<Vec<f64>, FilterError> {
    let freqs = fft::rfftfreq(samples.len(), sampling_rate);
    let response = bandpass_response(&freqs, order, passband)?;
    let mut spectrum = fft::time2freq(samples, sampling_rate);
    for (s, h) in spectrum.iter_mut().zip(response.iter()) {
        *s *= h;
    }
    Ok(fft::freq2time(&spectrum, sampling_rate, samples.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn unity_gain_at_band_center() {
        let (low, high) = (0.1_f64, 0.4);
        let center = (low * high).sqrt();
        let h = bandpass_response(&[center], 8, (low, high)).unwrap();
        assert!((h[0].norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn half_power_at_band_edges() {
        for order in [2, 4, 8] {
            let h = bandpass_response(&[0.1, 0.4], order, (0.1, 0.4)).unwrap();
            for r in &h {
                assert!(
                    (r.norm() - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6,
                    "order {order}: |H| = {}",
                    r.norm()
                );
            }
        }
    }

    #[test]
    fn deep_stopband_suppression() {
        let h = bandpass_response(&[2.0], 8, (0.1, 0.4)).unwrap();
        assert!(h[0].norm() < 1e-4);
    }

    #[test]
    fn dc_gain_is_zero() {
        let h = bandpass_response(&[0.0], 4, (0.1, 0.4)).unwrap();
        assert_eq!(h[0].norm(), 0.0);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(
            bandpass_response(&[0.1], 0, (0.1, 0.4)),
            Err(FilterError::InvalidOrder)
        ));
        assert!(matches!(
            bandpass_response(&[0.1], 4, (0.4, 0.1)),
            Err(FilterError::InvalidPassband { .. })
        ));
    }

    #[test]
    fn in_band_tone_passes_out_of_band_tone_dies() {
        let rate = 2.0;
        let n = 1024;
        let in_band: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 0.2 * i as f64 / rate).sin())
            .collect();
        let out_band: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 0.9 * i as f64 / rate).sin())
            .collect();

        let passed = butterworth_filter_trace(&in_band, rate, (0.1, 0.4), 8).unwrap();
        let blocked = butterworth_filter_trace(&out_band, rate, (0.1, 0.4), 8).unwrap();

        let rms = |v: &[f64]| (v.iter().map(|x| x * x).sum::<f64>() / v.len() as f64).sqrt();
        assert!(rms(&passed) > 0.6);
        assert!(rms(&blocked) < 0.01);
    }
}
