//! Antenna response models.
//!
//! Patterns are deliberately coarse: a band-limited frequency weighting
//! (a low-order Butterworth magnitude over the antenna band) combined
//! with a cosine-power directivity around the boresight. The registry
//! maps the `antenna_model` names of the detector description onto
//! patterns; an unknown name is a hard error.

use std::collections::HashMap;

use icerad_signal::filter;

use crate::error::DetectorError;

/// Butterworth order of the band weighting.
const BAND_ORDER: usize = 2;

/// A parameterized antenna response.
#[derive(Debug, Clone, PartialEq)]
pub struct AntennaPattern {
    /// Model name
    pub name: String,
    /// Sensitive band in GHz
    pub band: (f64, f64),
    /// Directivity exponent: gain falls as cos^k of the boresight angle
    pub directivity_exponent: f64,
    /// Peak (boresight, band-center) gain relative to an ideal isotropic
    /// radiator
    pub peak_gain: f64,
}

impl AntennaPattern {
    /// Frequency-dependent response magnitudes at `frequencies` (GHz).
    #[must_use]
    pub fn response(&self, frequencies: &[f64]) -> Vec<f64> {
        match filter::bandpass_response(frequencies, BAND_ORDER, self.band) {
            Ok(h) => h.iter().map(|c| self.peak_gain * c.norm()).collect(),
            // band edges are validated at registration; an unexpected
            // failure means no sensitivity
            Err(_) => vec![0.0; frequencies.len()],
        }
    }

    /// Directional gain factor for a signal arriving `angle` rad off the
    /// boresight, clamped to zero beyond 90 degrees.
    #[must_use]
    pub fn directivity(&self, angle: f64) -> f64 {
        let c = angle.cos();
        if c <= 0.0 {
            0.0
        } else {
            c.powf(self.directivity_exponent)
        }
    }
}

/// Registry of antenna patterns keyed by model name.
#[derive(Debug, Clone)]
pub struct AntennaRegistry {
    patterns: HashMap<String, AntennaPattern>,
}

impl AntennaRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in models.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(AntennaPattern {
            name: "bicone".into(),
            band: (0.05, 1.0),
            directivity_exponent: 1.0,
            peak_gain: 2.0,
        });
        registry.insert(AntennaPattern {
            name: "vpol_dipole".into(),
            band: (0.1, 0.7),
            directivity_exponent: 1.5,
            peak_gain: 1.8,
        });
        registry.insert(AntennaPattern {
            name: "hpol_slot".into(),
            band: (0.2, 0.9),
            directivity_exponent: 2.0,
            peak_gain: 1.5,
        });
        registry.insert(AntennaPattern {
            name: "lpda".into(),
            band: (0.08, 0.6),
            directivity_exponent: 3.0,
            peak_gain: 4.0,
        });
        registry
    }

    /// Registers (or replaces) a pattern under its own name.
    pub fn insert(&mut self, pattern: AntennaPattern) {
        self.patterns.insert(pattern.name.clone(), pattern);
    }

    /// Looks up the pattern for `model`, as referenced by `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError::AntennaPatternNotFound`] when no pattern
    /// is registered under `model`.
    pub fn get(&self, model: &str, channel_id: u32) -> Result<&AntennaPattern, DetectorError> {
        self.patterns
            .get(model)
            .ok_or_else(|| DetectorError::AntennaPatternNotFound {
                model: model.to_string(),
                channel_id,
            })
    }

    /// Registered model names, sorted.
    #[must_use]
    pub fn models(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.patterns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for AntennaRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
