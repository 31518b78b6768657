//! Resampling and sub-sample delay primitives.
//!
//! Three distinct tools, each with a different aliasing contract:
//!
//! - [`fourier_resample`] — spectral truncation / zero-padding. Band
//!   limited and exact for band-limited inputs; destroys higher Nyquist
//!   zones, so it is only safe *above* the highest frequency of interest.
//! - [`upsampling_fir`] — zero-stuffing plus a windowed-sinc lowpass,
//!   the fixed-point-friendly scheme an FPGA applies after digitization.
//! - [`delay_trace`] — sub-sample shift by linear interpolation.

use num_complex::Complex64;
use thiserror::Error;

use crate::fft;

/// Errors from resampling operations.
#[derive(Debug, Error)]
pub enum ResampleError {
    /// Target length must be non-zero
    #[error("Target length must be > 0")]
    EmptyTarget,

    /// Input trace must be non-empty
    #[error("Input trace is empty")]
    EmptyInput,

    /// Upsampling factor must be an integer >= 2
    #[error("Upsampling factor {factor} must be >= 2")]
    InvalidFactor {
        /// The offending factor
        factor: usize,
    },
}

/// Resamples to `new_len` samples via the frequency domain, the
/// equivalent of a band-limited sinc interpolation.
///
/// # Errors
///
/// Returns [`ResampleError`] for empty input or target.
pub fn fourier_resample(samples: &[f64], new_len: usize) -> Result<Vec<f64>, ResampleError> {
    if samples.is_empty() {
        return Err(ResampleError::EmptyInput);
    }
    if new_len == 0 {
        return Err(ResampleError::EmptyTarget);
    }
    let old_len = samples.len();
    if new_len == old_len {
        return Ok(samples.to_vec());
    }

    // work on the unnormalized single-sided DFT; the sqrt(2)*dt factors of
    // the suite convention cancel between forward and inverse
    let spectrum = fft::time2freq(samples, 1.0);
    let old_bins = spectrum.len();
    let new_bins = new_len / 2 + 1;

    let mut resized: Vec<Complex64> = vec![Complex64::new(0.0, 0.0); new_bins];
    let copy = old_bins.min(new_bins);
    resized[..copy].copy_from_slice(&spectrum[..copy]);

    if new_len > old_len {
        // the old Nyquist bin splits between a positive and a negative
        // frequency in the longer transform
        if old_len % 2 == 0 {
            resized[old_bins - 1] *= 0.5;
        }
    } else if new_len % 2 == 0 {
        // the new Nyquist bin must be real
        resized[new_bins - 1] = Complex64::new(resized[new_bins - 1].re, 0.0);
    }

    let mut out = fft::freq2time(&resized, 1.0, new_len);
    let gain = new_len as f64 / old_len as f64;
    for v in &mut out {
        *v *= gain;
    }
    Ok(out)
}

/// Upsamples by an integer factor with zero-stuffing followed by a
/// Hamming-windowed-sinc lowpass of `ntaps` taps cut off at the original
/// Nyquist frequency. The filter gain compensates the stuffing so a DC
/// level survives unchanged.
///
/// # Errors
///
/// Returns [`ResampleError::InvalidFactor`] for factors below 2 and
/// [`ResampleError::EmptyInput`] for an empty trace.
pub fn upsampling_fir(
    samples: &[f64],
    factor: usize,
    ntaps: usize,
) -> Result<Vec<f64>, ResampleError> {
    if samples.is_empty() {
        return Err(ResampleError::EmptyInput);
    }
    if factor < 2 {
        return Err(ResampleError::InvalidFactor { factor });
    }

    let n_out = samples.len() * factor;
    let mut stuffed = vec![0.0; n_out];
    for (i, &s) in samples.iter().enumerate() {
        stuffed[i * factor] = s;
    }

    // odd-length symmetric windowed sinc, cutoff at 1/(2*factor) of the
    // new rate, gain factor to restore the original amplitude
    let half = (ntaps.max(2) / 2).max(1);
    let m = 2 * half + 1;
    let cutoff = 0.5 / factor as f64;
    let taps: Vec<f64> = (0..m)
        .map(|i| {
            let k = i as f64 - half as f64;
            let sinc = if k == 0.0 {
                2.0 * cutoff
            } else {
                (2.0 * std::f64::consts::PI * cutoff * k).sin() / (std::f64::consts::PI * k)
            };
            let window = 0.54
                - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / (m - 1) as f64).cos();
            factor as f64 * sinc * window
        })
        .collect();

    let mut out = vec![0.0; n_out];
    for (i, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for (j, &t) in taps.iter().enumerate() {
            let idx = i as isize + j as isize - half as isize;
            if idx >= 0 && (idx as usize) < n_out {
                acc += stuffed[idx as usize] * t;
            }
        }
        *o = acc;
    }
    Ok(out)
}

/// Delays a trace by `delay` ns through linear interpolation, optionally
/// truncating the output to `out_len` samples. Samples shifted in from
/// before the trace start are zero.
#[must_use]
pub fn delay_trace(
    samples: &[f64],
    sampling_rate: f64,
    delay: f64,
    out_len: Option<usize>,
) -> Vec<f64> {
    let n = out_len.unwrap_or(samples.len()).min(samples.len());
    let dt = 1.0 / sampling_rate;
    (0..n)
        .map(|i| {
            let t = i as f64 * dt - delay;
            let pos = t / dt;
            if pos < 0.0 || samples.is_empty() {
                0.0
            } else {
                let i0 = pos.floor() as usize;
                if i0 + 1 >= samples.len() {
                    *samples.last().unwrap_or(&0.0)
                } else {
                    let frac = pos - i0 as f64;
                    samples[i0] * (1.0 - frac) + samples[i0 + 1] * frac
                }
            }
        })
        .collect()
}

/// Linear interpolation of tabulated `(xs, ys)` at `x`, clamping to the
/// first/last value outside the table.
#[must_use]
pub fn linear_interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    if xs.is_empty() {
        return 0.0;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    // xs is monotonically increasing
    let mut hi = xs.partition_point(|&v| v < x);
    if hi == 0 {
        hi = 1;
    }
    let lo = hi - 1;
    let frac = (x - xs[lo]) / (xs[hi] - xs[lo]);
    ys[lo] * (1.0 - frac) + ys[hi] * frac
}
