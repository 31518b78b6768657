//! Band-limited thermal noise generation.
//!
//! Noise is synthesized in the frequency domain: every bin inside the
//! requested band gets a uniformly random phase and either a fixed
//! ("flat") or Rayleigh-distributed amplitude, scaled so the time-domain
//! RMS over the whole trace matches the requested value. Generation is
//! fully deterministic for a given seed.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Rayleigh};
use thiserror::Error;

use icerad_core::Trace;

use crate::fft;

/// Errors from noise generation.
#[derive(Debug, Error)]
pub enum NoiseError {
    /// Band edges must satisfy 0 <= low < high <= Nyquist
    #[error("Invalid noise band ({low}, {high}) GHz for Nyquist {nyquist} GHz")]
    InvalidBand {
        /// Lower edge in GHz
        low: f64,
        /// Upper edge in GHz
        high: f64,
        /// Nyquist frequency in GHz
        nyquist: f64,
    },

    /// Target RMS must be non-negative
    #[error("Noise RMS must be >= 0, got {rms} V")]
    InvalidRms {
        /// The offending RMS in V
        rms: f64,
    },

    /// No frequency bin falls inside the band
    #[error("Noise band ({low}, {high}) GHz contains no frequency bin")]
    EmptyBand {
        /// Lower edge in GHz
        low: f64,
        /// Upper edge in GHz
        high: f64,
    },
}

/// Amplitude statistics of the synthesized bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmplitudeMode {
    /// Every in-band bin has the same magnitude; only phases are random
    #[default]
    Flat,
    /// Bin magnitudes are Rayleigh distributed around the flat value,
    /// the statistics of true thermal noise
    Rayleigh,
}

/// Configuration for the thermal noise generator.
#[derive(Debug, Clone, Copy)]
pub struct NoiseConfig {
    /// Lower band edge in GHz
    pub min_freq: f64,
    /// Upper band edge in GHz
    pub max_freq: f64,
    /// Target RMS over the full trace, in V
    pub rms: f64,
    /// Bin amplitude statistics
    pub mode: AmplitudeMode,
}

impl NoiseConfig {
    /// Validates the configuration against a concrete sampling rate.
    pub fn validate(&self, sampling_rate: f64) -> Result<(), NoiseError> {
        let nyquist = sampling_rate / 2.0;
        if self.min_freq < 0.0 || self.max_freq <= self.min_freq || self.max_freq > nyquist {
            return Err(NoiseError::InvalidBand {
                low: self.min_freq,
                high: self.max_freq,
                nyquist,
            });
        }
        if self.rms < 0.0 || !self.rms.is_finite() {
            return Err(NoiseError::InvalidRms { rms: self.rms });
        }
        Ok(())
    }
}

/// Seeded band-limited noise generator.
#[derive(Debug)]
pub struct NoiseGenerator {
    config: NoiseConfig,
    rng: StdRng,
}

impl NoiseGenerator {
    /// Creates a generator with a fixed seed.
    #[must_use]
    pub fn new(config: NoiseConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The generator configuration.
    #[must_use]
    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// Synthesizes `n_samples` of band-limited noise at `sampling_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError`] for a band incompatible with the rate or a
    /// band narrower than one frequency bin.
    pub fn bandlimited_noise(
        &mut self,
        n_samples: usize,
        sampling_rate: f64,
    ) -> Result<Vec<f64>, NoiseError> {
        self.config.validate(sampling_rate)?;
        if self.config.rms == 0.0 {
            return Ok(vec![0.0; n_samples]);
        }

        let freqs = fft::rfftfreq(n_samples, sampling_rate);
        let in_band: Vec<usize> = freqs
            .iter()
            .enumerate()
            // DC and Nyquist carry no phase freedom; keep them out
            .filter(|&(k, &f)| {
                k != 0
                    && k != n_samples / 2
                    && f >= self.config.min_freq
                    && f <= self.config.max_freq
            })
            .map(|(k, _)| k)
            .collect();
        if in_band.is_empty() {
            return Err(NoiseError::EmptyBand {
                low: self.config.min_freq,
                high: self.config.max_freq,
            });
        }

        // a single-sided bin of raw DFT magnitude `a` contributes
        // 2 a^2 / N^2 to the mean squared trace
        let n = n_samples as f64;
        let flat_amp = self.config.rms * n / (2.0 * in_band.len() as f64).sqrt();

        let mut spectrum = vec![Complex64::new(0.0, 0.0); freqs.len()];
        for &k in &in_band {
            let phase: f64 = self.rng.gen_range(0.0..2.0 * std::f64::consts::PI);
            let amp = match self.config.mode {
                AmplitudeMode::Flat => flat_amp,
                AmplitudeMode::Rayleigh => {
                    // sigma chosen so the expected power matches the flat case
                    let sigma = flat_amp / std::f64::consts::SQRT_2;
                    Rayleigh::new(sigma).expect("sigma is positive").sample(&mut self.rng)
                }
            };
            spectrum[k] = Complex64::from_polar(amp, phase);
        }

        // convert the raw DFT magnitudes into the suite spectrum
        // convention before the shared inverse transform
        let dt = 1.0 / sampling_rate;
        for s in &mut spectrum {
            *s *= std::f64::consts::SQRT_2 * dt;
        }
        Ok(fft::freq2time(&spectrum, sampling_rate, n_samples))
    }

    /// Adds freshly generated noise to a trace in place.
    ///
    /// # Errors
    ///
    /// Same as [`Self::bandlimited_noise`].
    pub fn add_noise(&mut self, trace: &mut Trace) -> Result<(), NoiseError> {
        let noise = self.bandlimited_noise(trace.len(), trace.sampling_rate())?;
        for (s, n) in trace.samples_mut().iter_mut().zip(noise.iter()) {
            *s += n;
        }
        Ok(())
    }
}
