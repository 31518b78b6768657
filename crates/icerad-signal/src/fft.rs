//! Real FFT conventions used throughout the suite.
//!
//! Spectra are single-sided amplitude densities: the forward transform
//! multiplies the DFT by `sqrt(2) * dt` so that the squared spectrum
//! integrated over frequency equals the squared trace integrated over
//! time. The inverse undoes exactly that, so
//! `freq2time(time2freq(x)) == x` up to float noise.
//!
//! Frequencies are in GHz and times in ns (see `icerad_core::units`).

use num_complex::Complex64;
use rustfft::{num_complex::Complex, FftPlanner};

const SQRT2: f64 = std::f64::consts::SQRT_2;

/// Frequency grid of the single-sided spectrum of an `n`-sample trace
/// sampled at `sampling_rate` GHz. Length `n / 2 + 1`.
#[must_use]
pub fn rfftfreq(n: usize, sampling_rate: f64) -> Vec<f64> {
    let df = sampling_rate / n as f64;
    (0..=n / 2).map(|k| k as f64 * df).collect()
}

/// Unnormalized DFT of a real trace, truncated to the positive
/// frequencies (length `n / 2 + 1`).
fn rfft_raw(samples: &[f64]) -> Vec<Complex64> {
    let n = samples.len();
    let mut buffer: Vec<Complex<f64>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);
    buffer.truncate(n / 2 + 1);
    buffer
}

/// Unnormalized inverse DFT of a single-sided spectrum back to `n` real
/// samples. The missing negative frequencies are restored by hermitian
/// symmetry.
fn irfft_raw(spectrum: &[Complex64], n: usize) -> Vec<f64> {
    let mut full: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); n];
    let n_half = spectrum.len();
    for (k, &s) in spectrum.iter().enumerate().take(n_half.min(n)) {
        full[k] = s;
    }
    for k in 1..n_half {
        let mirror = n.wrapping_sub(k);
        if mirror > n_half - 1 && mirror < n {
            full[mirror] = spectrum[k].conj();
        }
    }
    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(n);
    ifft.process(&mut full);
    full.iter().map(|c| c.re / n as f64).collect()
}

/// Transforms a trace into its single-sided amplitude-density spectrum.
///
/// Spectrum units are V/GHz when the trace is in V.
#[must_use]
pub fn time2freq(samples: &[f64], sampling_rate: f64) -> Vec<Complex64> {
    let dt = 1.0 / sampling_rate;
    rfft_raw(samples)
        .into_iter()
        .map(|c| c * SQRT2 * dt)
        .collect()
}

/// Transforms a single-sided spectrum back into `n_samples` time-domain
/// samples. `n_samples` disambiguates the even/odd trace length that the
/// spectrum alone cannot encode.
#[must_use]
pub fn freq2time(spectrum: &[Complex64], sampling_rate: f64, n_samples: usize) -> Vec<f64> {
    let dt = 1.0 / sampling_rate;
    let rescaled: Vec<Complex64> = spectrum.iter().map(|&c| c / (SQRT2 * dt)).collect();
    irfft_raw(&rescaled, n_samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq: f64, rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / rate).sin())
            .collect()
    }

    #[test]
    fn rfftfreq_grid() {
        let freqs = rfftfreq(8, 2.0);
        assert_eq!(freqs.len(), 5);
        assert!((freqs[1] - 0.25).abs() < 1e-12);
        assert!((freqs[4] - 1.0).abs() < 1e-12); // Nyquist
    }

    #[test]
    fn round_trip_even_length() {
        let x = tone(0.2, 1.0, 256);
        let spec = time2freq(&x, 1.0);
        let y = freq2time(&spec, 1.0, x.len());
        for (a, b) in x.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn round_trip_odd_length() {
        let x = tone(0.11, 1.0, 255);
        let spec = time2freq(&x, 1.0);
        let y = freq2time(&spec, 1.0, x.len());
        for (a, b) in x.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn tone_peaks_at_expected_bin() {
        let rate = 2.0;
        let n = 512;
        let freq = 0.5;
        let spec = time2freq(&tone(freq, rate, n), rate);
        let freqs = rfftfreq(n, rate);
        let peak = spec
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.norm().partial_cmp(&b.norm()).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert!((freqs[peak] - freq).abs() < 2.0 * rate / n as f64);
    }

    #[test]
    fn parseval_within_convention() {
        // integral of |X|^2 df equals integral of x^2 dt
        let rate = 1.0;
        let n = 1024;
        let x = tone(0.13, rate, n);
        let spec = time2freq(&x, rate);
        let df = rate / n as f64;
        let dt = 1.0 / rate;
        let freq_power: f64 = spec.iter().map(|c| c.norm_sqr()).sum::<f64>() * df;
        let time_power: f64 = x.iter().map(|v| v * v).sum::<f64>() * dt;
        assert!(
            (freq_power - time_power).abs() / time_power < 0.02,
            "{freq_power} vs {time_power}"
        );
    }
}
