//! Core data types for the icerad simulation suite.
//!
//! # Type categories
//!
//! - **Trace types**: [`Trace`] — uniformly sampled voltage series.
//! - **Kinematics**: [`NeutrinoEvent`], [`Flavor`], [`Current`], [`Shower`],
//!   [`ShowerKind`], [`Direction`], [`Position`].
//! - **Detector-event hierarchy**: [`SimEvent`], [`SimStation`],
//!   [`SimChannel`], [`TriggerRecord`].
//! - **Common types**: [`RunId`], [`EventId`], [`StationId`], [`ChannelId`].

use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EventError, TraceError};
use crate::units;

// =============================================================================
// Common Types
// =============================================================================

/// Unique identifier for a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new unique run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a run ID from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential event identifier within a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct EventId(pub u64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Station identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct StationId(pub u32);

impl std::fmt::Display for StationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Channel identifier within a station.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ChannelId(pub u32);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// Cartesian position in meters. The z axis points up; z = 0 is the ice
/// surface, so in-ice positions have negative z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    /// x coordinate in m
    pub x: f64,
    /// y coordinate in m
    pub y: f64,
    /// z coordinate in m
    pub z: f64,
}

impl Position {
    /// Creates a position from coordinates in meters.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position, in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Horizontal (cylindrical) radius, in meters.
    #[must_use]
    pub fn radius(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Arrival direction in spherical coordinates.
///
/// Zenith is measured from the upward z axis (0 = straight down-going
/// particle seen from above, π = up-going), azimuth counterclockwise from
/// the x axis. Both in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    /// Zenith angle in radians, in [0, π]
    pub zenith: f64,
    /// Azimuth angle in radians, in [0, 2π)
    pub azimuth: f64,
}

impl Direction {
    /// Creates a direction, validating the angular ranges.
    pub fn new(zenith: f64, azimuth: f64) -> Result<Self, EventError> {
        if !(0.0..=std::f64::consts::PI).contains(&zenith) {
            return Err(EventError::InvalidKinematics {
                message: format!("zenith {zenith} outside [0, pi]"),
            });
        }
        if !(0.0..2.0 * std::f64::consts::PI).contains(&azimuth) {
            return Err(EventError::InvalidKinematics {
                message: format!("azimuth {azimuth} outside [0, 2pi)"),
            });
        }
        Ok(Self { zenith, azimuth })
    }

    /// Unit vector pointing along the travel direction.
    #[must_use]
    pub fn unit_vector(&self) -> [f64; 3] {
        let st = self.zenith.sin();
        [
            st * self.azimuth.cos(),
            st * self.azimuth.sin(),
            self.zenith.cos(),
        ]
    }
}

// =============================================================================
// Neutrino kinematics
// =============================================================================

/// Neutrino flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    /// Electron neutrino
    Electron,
    /// Muon neutrino
    Muon,
    /// Tau neutrino
    Tau,
}

impl std::fmt::Display for Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flavor::Electron => write!(f, "nu_e"),
            Flavor::Muon => write!(f, "nu_mu"),
            Flavor::Tau => write!(f, "nu_tau"),
        }
    }
}

/// Interaction current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Current {
    /// Charged-current interaction
    Charged,
    /// Neutral-current interaction
    Neutral,
}

/// Particle shower type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowerKind {
    /// Hadronic cascade at the interaction vertex
    Hadronic,
    /// Electromagnetic cascade (electron-flavor charged current)
    Electromagnetic,
}

/// A particle shower produced by a neutrino interaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shower {
    /// Shower type
    pub kind: ShowerKind,
    /// Shower energy in eV
    pub energy: f64,
}

/// A generated neutrino interaction: the unit of work for the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeutrinoEvent {
    /// Event identifier, sequential within the generated list
    pub id: EventId,
    /// Interaction vertex, in m
    pub vertex: Position,
    /// Neutrino travel direction
    pub direction: Direction,
    /// Neutrino energy in eV
    pub energy: f64,
    /// Neutrino flavor
    pub flavor: Flavor,
    /// Interaction current
    pub current: Current,
    /// Inelasticity y: fraction of the energy transferred to the hadronic
    /// system, in (0, 1)
    pub inelasticity: f64,
}

impl NeutrinoEvent {
    /// Showers produced by this interaction.
    ///
    /// A hadronic shower of energy `y * E` is always present. An
    /// electron-flavor charged-current interaction additionally deposits
    /// the outgoing lepton energy `(1 - y) * E` as an electromagnetic
    /// shower.
    #[must_use]
    pub fn showers(&self) -> Vec<Shower> {
        let mut showers = vec![Shower {
            kind: ShowerKind::Hadronic,
            energy: self.inelasticity * self.energy,
        }];
        if self.flavor == Flavor::Electron && self.current == Current::Charged {
            showers.push(Shower {
                kind: ShowerKind::Electromagnetic,
                energy: (1.0 - self.inelasticity) * self.energy,
            });
        }
        showers
    }

    /// Validates the kinematic ranges.
    pub fn validate(&self) -> Result<(), EventError> {
        if self.energy <= 0.0 {
            return Err(EventError::InvalidKinematics {
                message: format!("energy {} eV must be > 0", self.energy),
            });
        }
        if !(0.0..1.0).contains(&self.inelasticity) || self.inelasticity == 0.0 {
            return Err(EventError::InvalidKinematics {
                message: format!("inelasticity {} outside (0, 1)", self.inelasticity),
            });
        }
        Direction::new(self.direction.zenith, self.direction.azimuth)?;
        Ok(())
    }
}

// =============================================================================
// Traces
// =============================================================================

/// A uniformly sampled voltage (or field-strength) series.
///
/// Sampling rate is in GHz and trace start time in ns, so sample `i` sits
/// at `start_time + i / sampling_rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    samples: Vec<f64>,
    sampling_rate: f64,
    start_time: f64,
}

impl Trace {
    /// Creates a trace from samples.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidSamplingRate`] for a non-positive rate
    /// and [`TraceError::Empty`] for an empty sample vector.
    pub fn new(samples: Vec<f64>, sampling_rate: f64, start_time: f64) -> Result<Self, TraceError> {
        if sampling_rate <= 0.0 || !sampling_rate.is_finite() {
            return Err(TraceError::InvalidSamplingRate {
                rate: sampling_rate,
            });
        }
        if samples.is_empty() {
            return Err(TraceError::Empty);
        }
        Ok(Self {
            samples,
            sampling_rate,
            start_time,
        })
    }

    /// All-zero trace of `n` samples.
    ///
    /// # Errors
    ///
    /// Same as [`Trace::new`].
    pub fn zeros(n: usize, sampling_rate: f64, start_time: f64) -> Result<Self, TraceError> {
        Self::new(vec![0.0; n], sampling_rate, start_time)
    }

    /// Sample values.
    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Mutable sample values.
    pub fn samples_mut(&mut self) -> &mut [f64] {
        &mut self.samples
    }

    /// Consumes the trace, returning its samples.
    #[must_use]
    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    /// Sampling rate in GHz.
    #[must_use]
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Trace start time in ns.
    #[must_use]
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Shifts the trace start time by `dt` ns.
    pub fn shift_start_time(&mut self, dt: f64) {
        self.start_time += dt;
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` when the trace has no samples. Cannot happen for a
    /// trace built through [`Trace::new`]; exists for API completeness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample spacing in ns.
    #[must_use]
    pub fn dt(&self) -> f64 {
        1.0 / self.sampling_rate
    }

    /// Sample times in ns.
    #[must_use]
    pub fn times(&self) -> Array1<f64> {
        let dt = self.dt();
        Array1::from_iter((0..self.samples.len()).map(|i| self.start_time + i as f64 * dt))
    }

    /// Replaces samples and sampling rate in one step, e.g. after
    /// digitization changed both.
    ///
    /// # Errors
    ///
    /// Same as [`Trace::new`].
    pub fn set_trace(&mut self, samples: Vec<f64>, sampling_rate: f64) -> Result<(), TraceError> {
        if sampling_rate <= 0.0 || !sampling_rate.is_finite() {
            return Err(TraceError::InvalidSamplingRate {
                rate: sampling_rate,
            });
        }
        if samples.is_empty() {
            return Err(TraceError::Empty);
        }
        self.samples = samples;
        self.sampling_rate = sampling_rate;
        Ok(())
    }

    /// Root-mean-square of the samples, in V.
    #[must_use]
    pub fn rms(&self) -> f64 {
        let sum_sq: f64 = self.samples.iter().map(|v| v * v).sum();
        (sum_sq / self.samples.len() as f64).sqrt()
    }

    /// Maximum absolute sample value, in V.
    #[must_use]
    pub fn peak_amplitude(&self) -> f64 {
        self.samples.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    /// Adds another trace sample-wise.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Mismatch`] when lengths or sampling rates
    /// differ.
    pub fn add(&mut self, other: &Trace) -> Result<(), TraceError> {
        if self.samples.len() != other.samples.len() {
            return Err(TraceError::Mismatch {
                message: format!(
                    "lengths differ: {} vs {}",
                    self.samples.len(),
                    other.samples.len()
                ),
            });
        }
        if (self.sampling_rate - other.sampling_rate).abs() > 1e-9 * units::GHZ {
            return Err(TraceError::Mismatch {
                message: format!(
                    "sampling rates differ: {} vs {} GHz",
                    self.sampling_rate, other.sampling_rate
                ),
            });
        }
        for (a, b) in self.samples.iter_mut().zip(other.samples.iter()) {
            *a += b;
        }
        Ok(())
    }
}

// =============================================================================
// Simulated detector events
// =============================================================================

/// Result of one named trigger on a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
    /// Trigger name, e.g. `"threshold_2sigma"`
    pub name: String,
    /// Whether the trigger fired
    pub triggered: bool,
    /// Time of the first crossing in ns, when the trigger fired
    pub trigger_time: Option<f64>,
    /// Channels that participated in the decision
    pub channels: Vec<ChannelId>,
}

/// A simulated channel: a readout trace for one antenna.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimChannel {
    /// Channel identifier
    pub id: ChannelId,
    /// Voltage trace at the digitizer input (or output, once digitized)
    pub trace: Trace,
}

/// A simulated station: the channels of one detector station for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimStation {
    /// Station identifier
    pub id: StationId,
    /// Simulated channels
    pub channels: Vec<SimChannel>,
    /// Trigger results, in evaluation order
    pub triggers: Vec<TriggerRecord>,
}

impl SimStation {
    /// Creates an empty station record.
    #[must_use]
    pub fn new(id: StationId) -> Self {
        Self {
            id,
            channels: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// Looks up a channel by id.
    pub fn channel(&self, id: ChannelId) -> Result<&SimChannel, EventError> {
        self.channels
            .iter()
            .find(|c| c.id == id)
            .ok_or(EventError::UnknownChannel {
                station_id: self.id.0,
                channel_id: id.0,
            })
    }

    /// Mutable channel lookup by id.
    pub fn channel_mut(&mut self, id: ChannelId) -> Result<&mut SimChannel, EventError> {
        let station_id = self.id.0;
        self.channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(EventError::UnknownChannel {
                station_id,
                channel_id: id.0,
            })
    }

    /// Whether any trigger fired on this station.
    #[must_use]
    pub fn has_triggered(&self) -> bool {
        self.triggers.iter().any(|t| t.triggered)
    }

    /// Earliest trigger time across fired triggers, in ns.
    #[must_use]
    pub fn trigger_time(&self) -> Option<f64> {
        self.triggers
            .iter()
            .filter(|t| t.triggered)
            .filter_map(|t| t.trigger_time)
            .fold(None, |acc, t| match acc {
                None => Some(t),
                Some(a) => Some(a.min(t)),
            })
    }
}

/// A fully simulated event: input kinematics plus detector response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Run this event belongs to
    pub run_id: RunId,
    /// The generated neutrino interaction
    pub neutrino: NeutrinoEvent,
    /// Per-station detector response
    pub stations: Vec<SimStation>,
    /// Wall-clock creation time of the record
    pub created_at: DateTime<Utc>,
}

impl SimEvent {
    /// Creates an event record with no station responses yet.
    #[must_use]
    pub fn new(run_id: RunId, neutrino: NeutrinoEvent) -> Self {
        Self {
            run_id,
            neutrino,
            stations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Looks up a station by id.
    pub fn station(&self, id: StationId) -> Result<&SimStation, EventError> {
        self.stations
            .iter()
            .find(|s| s.id == id)
            .ok_or(EventError::UnknownStation { station_id: id.0 })
    }

    /// Whether any station triggered.
    #[must_use]
    pub fn has_triggered(&self) -> bool {
        self.stations.iter().any(SimStation::has_triggered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_neutrino() -> NeutrinoEvent {
        NeutrinoEvent {
            id: EventId(0),
            vertex: Position::new(100.0, -50.0, -1200.0),
            direction: Direction::new(2.0, 1.0).unwrap(),
            energy: 1e18,
            flavor: Flavor::Electron,
            current: Current::Charged,
            inelasticity: 0.25,
        }
    }

    #[test]
    fn trace_rejects_bad_inputs() {
        assert!(matches!(
            Trace::new(vec![1.0], 0.0, 0.0),
            Err(TraceError::InvalidSamplingRate { .. })
        ));
        assert!(matches!(Trace::new(vec![], 1.0, 0.0), Err(TraceError::Empty)));
    }

    #[test]
    fn trace_times_and_dt() {
        let trace = Trace::new(vec![0.0; 4], 2.0, 10.0).unwrap();
        assert!((trace.dt() - 0.5).abs() < 1e-12);
        let times = trace.times();
        assert!((times[0] - 10.0).abs() < 1e-12);
        assert!((times[3] - 11.5).abs() < 1e-12);
    }

    #[test]
    fn trace_add_checks_compatibility() {
        let mut a = Trace::new(vec![1.0, 2.0], 1.0, 0.0).unwrap();
        let b = Trace::new(vec![0.5, 0.5], 1.0, 0.0).unwrap();
        a.add(&b).unwrap();
        assert_eq!(a.samples(), &[1.5, 2.5]);

        let c = Trace::new(vec![0.5; 3], 1.0, 0.0).unwrap();
        assert!(a.add(&c).is_err());
    }

    #[test]
    fn trace_rms_of_constant() {
        let trace = Trace::new(vec![2.0; 128], 1.0, 0.0).unwrap();
        assert!((trace.rms() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn electron_cc_has_two_showers() {
        let nu = test_neutrino();
        let showers = nu.showers();
        assert_eq!(showers.len(), 2);
        assert_eq!(showers[0].kind, ShowerKind::Hadronic);
        assert!((showers[0].energy - 0.25e18).abs() < 1e10);
        assert_eq!(showers[1].kind, ShowerKind::Electromagnetic);
        assert!((showers[1].energy - 0.75e18).abs() < 1e10);
    }

    #[test]
    fn neutral_current_has_single_shower() {
        let mut nu = test_neutrino();
        nu.current = Current::Neutral;
        assert_eq!(nu.showers().len(), 1);
    }

    #[test]
    fn direction_validates_ranges() {
        assert!(Direction::new(-0.1, 0.0).is_err());
        assert!(Direction::new(1.0, 7.0).is_err());
        assert!(Direction::new(1.0, 1.0).is_ok());
    }

    #[test]
    fn station_channel_lookup() {
        let mut station = SimStation::new(StationId(51));
        station.channels.push(SimChannel {
            id: ChannelId(3),
            trace: Trace::new(vec![0.0; 8], 1.0, 0.0).unwrap(),
        });
        assert!(station.channel(ChannelId(3)).is_ok());
        assert!(matches!(
            station.channel(ChannelId(4)),
            Err(EventError::UnknownChannel { .. })
        ));
    }

    #[test]
    fn earliest_trigger_time_wins() {
        let mut station = SimStation::new(StationId(1));
        station.triggers.push(TriggerRecord {
            name: "a".into(),
            triggered: true,
            trigger_time: Some(42.0),
            channels: vec![],
        });
        station.triggers.push(TriggerRecord {
            name: "b".into(),
            triggered: true,
            trigger_time: Some(17.0),
            channels: vec![],
        });
        assert!((station.trigger_time().unwrap() - 17.0).abs() < 1e-12);
    }
}
