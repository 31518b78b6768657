//! Detector description loaded from JSON.
//!
//! The description is the single configuration input of the simulation:
//! station and channel geometry, antenna model names, per-channel trigger
//! thresholds and noise levels, and the optional ADC parameter sets. ADC
//! fields come in two flavors: the plain readout set and a `trigger_`
//! prefixed set for detectors that form their trigger on a separate,
//! usually coarser, digitizer.

use serde::{Deserialize, Serialize};
use std::path::Path;

use icerad_core::{ChannelId, Position, StationId};

use crate::error::DetectorError;

/// One ADC parameter set. All fields optional at the description level;
/// the digitizer checks the mandatory ones when it is actually used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AdcFields {
    /// Number of ADC bits
    pub n_bits: Option<u32>,
    /// Reference voltage in V: largest voltage that converts without
    /// saturating
    pub reference_voltage: Option<f64>,
    /// ADC clock in GHz
    pub sampling_frequency: Option<f64>,
    /// Fixed conversion delay in ns
    pub time_delay: Option<f64>,
    /// FIR taps for post-digitization upsampling
    pub ntaps: Option<usize>,
}

/// One readout channel of a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescription {
    /// Channel identifier, unique within the station
    pub id: ChannelId,
    /// Antenna model name, resolved against the antenna registry
    pub antenna_model: String,
    /// Position relative to the station, in m
    pub position_m: [f64; 3],
    /// Simulation sampling rate for this channel, in GHz
    pub sampling_frequency: f64,
    /// Thermal noise RMS at the digitizer input, in V
    pub noise_rms: f64,
    /// Absolute-voltage trigger threshold, in V
    pub trigger_threshold: f64,
    /// Readout ADC parameters
    #[serde(default)]
    pub adc: AdcFields,
    /// Trigger ADC parameters (`trigger_` set)
    #[serde(default)]
    pub trigger_adc: AdcFields,
}

impl ChannelDescription {
    /// The ADC parameter set selected by `trigger_adc`.
    #[must_use]
    pub fn adc_fields(&self, trigger_adc: bool) -> &AdcFields {
        if trigger_adc {
            &self.trigger_adc
        } else {
            &self.adc
        }
    }
}

/// One detector station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationDescription {
    /// Station identifier, unique within the detector
    pub id: StationId,
    /// Optional human-readable name
    #[serde(default)]
    pub name: Option<String>,
    /// Station reference position, in m
    pub position_m: [f64; 3],
    /// Channels of this station
    pub channels: Vec<ChannelDescription>,
}

impl StationDescription {
    /// Station position as a [`Position`].
    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.position_m[0], self.position_m[1], self.position_m[2])
    }

    /// Absolute position of a channel, in m.
    #[must_use]
    pub fn channel_position(&self, channel: &ChannelDescription) -> Position {
        Position::new(
            self.position_m[0] + channel.position_m[0],
            self.position_m[1] + channel.position_m[1],
            self.position_m[2] + channel.position_m[2],
        )
    }

    /// Looks up a channel by id.
    pub fn channel(&self, id: ChannelId) -> Result<&ChannelDescription, DetectorError> {
        self.channels
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| DetectorError::Validation {
                message: format!("station {} has no channel {}", self.id, id),
            })
    }
}

/// Complete detector description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorDescription {
    /// Optional detector name
    #[serde(default)]
    pub name: Option<String>,
    /// Stations of the detector
    pub stations: Vec<StationDescription>,
}

impl DetectorDescription {
    /// Loads and validates a description from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError::DescriptionIo`] when the file cannot be
    /// read, [`DetectorError::DescriptionParse`] for malformed JSON, and
    /// [`DetectorError::Validation`] for content problems.
    pub fn from_json_file(path: &Path) -> Result<Self, DetectorError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| DetectorError::DescriptionIo {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&contents)
    }

    /// Parses and validates a description from a JSON string.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_json_file`], minus the IO variant.
    pub fn from_json_str(contents: &str) -> Result<Self, DetectorError> {
        let description: DetectorDescription = serde_json::from_str(contents)
            .map_err(|source| DetectorError::DescriptionParse { source })?;
        description.validate()?;
        Ok(description)
    }

    /// Serializes the description to pretty JSON.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(self).expect("detector description serializes")
    }

    /// Fingerprint of the description content, used to check that merged
    /// files were produced against the same detector.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        // stable content hash without a dedicated hashing dependency:
        // FNV-1a over the canonical JSON
        let json = serde_json::to_string(self).expect("detector description serializes");
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in json.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        format!("{hash:016x}")
    }

    /// Validates the invariants of the description.
    ///
    /// # Validated invariants
    ///
    /// - At least one station; at least one channel per station.
    /// - Station ids unique; channel ids unique within a station.
    /// - Sampling frequencies strictly positive.
    /// - Noise RMS non-negative, trigger thresholds strictly positive.
    /// - Antenna model names non-empty.
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.stations.is_empty() {
            return Err(DetectorError::Validation {
                message: "description contains no stations".into(),
            });
        }
        let mut station_ids = std::collections::HashSet::new();
        for station in &self.stations {
            if !station_ids.insert(station.id) {
                return Err(DetectorError::Validation {
                    message: format!("duplicate station id {}", station.id),
                });
            }
            if station.channels.is_empty() {
                return Err(DetectorError::Validation {
                    message: format!("station {} has no channels", station.id),
                });
            }
            let mut channel_ids = std::collections::HashSet::new();
            for channel in &station.channels {
                if !channel_ids.insert(channel.id) {
                    return Err(DetectorError::Validation {
                        message: format!(
                            "duplicate channel id {} in station {}",
                            channel.id, station.id
                        ),
                    });
                }
                if channel.sampling_frequency <= 0.0 {
                    return Err(DetectorError::Validation {
                        message: format!(
                            "channel {} of station {}: sampling_frequency must be > 0",
                            channel.id, station.id
                        ),
                    });
                }
                if channel.noise_rms < 0.0 {
                    return Err(DetectorError::Validation {
                        message: format!(
                            "channel {} of station {}: noise_rms must be >= 0",
                            channel.id, station.id
                        ),
                    });
                }
                if channel.trigger_threshold <= 0.0 {
                    return Err(DetectorError::Validation {
                        message: format!(
                            "channel {} of station {}: trigger_threshold must be > 0",
                            channel.id, station.id
                        ),
                    });
                }
                if channel.antenna_model.is_empty() {
                    return Err(DetectorError::Validation {
                        message: format!(
                            "channel {} of station {}: antenna_model is empty",
                            channel.id, station.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Looks up a station by id.
    pub fn station(&self, id: StationId) -> Result<&StationDescription, DetectorError> {
        self.stations
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| DetectorError::Validation {
                message: format!("no station with id {id}"),
            })
    }
}
