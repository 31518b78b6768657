//! The per-event simulation pipeline.
//!
//! For every input neutrino the pipeline walks the detector stations and
//! builds the channel voltage traces: analytic pulse per shower, shaped
//! by the antenna response and the straight-line propagation, then
//! thermal noise, then the station trigger, then (optionally) the
//! readout ADC. The trigger runs on the analog traces; digitization is
//! last so count-domain output cannot distort the trigger decision.
//!
//! Recoverable per-event failures are logged and counted, not fatal; the
//! run only aborts on configuration-class errors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use icerad_core::{
    NeutrinoEvent, RunId, SimChannel, SimEvent, SimStation, Trace,
};
use icerad_detector::{
    AdcOptions, AnalogToDigitalConverter, AntennaRegistry, ChannelDescription,
    DetectorDescription, StationDescription, ThresholdTrigger, ThresholdTriggerConfig,
};
use icerad_signal::noise::{AmplitudeMode, NoiseConfig, NoiseGenerator};
use icerad_signal::{fft, pulse};

use crate::error::SimError;
use crate::propagation::{PropagationConfig, PropagationResult, StraightLinePropagator};

/// Fraction of the trace duration a signal may be delayed into before it
/// is considered outside the readout window.
const MAX_WINDOW_FRACTION: f64 = 0.9;

/// Configuration of the simulation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Samples per channel trace; must be even
    pub n_samples: usize,
    /// Time between trace start and the earliest signal arrival, in ns
    pub pre_trigger_time: f64,
    /// Spectral slope of the emitted pulse in 1/GHz; must be negative
    pub spectral_slope: f64,
    /// Add thermal noise to every channel
    pub add_noise: bool,
    /// Noise amplitude statistics
    pub rayleigh_noise: bool,
    /// Noise band in GHz; the upper edge is clamped to each channel's
    /// Nyquist frequency
    pub noise_band: (f64, f64),
    /// Digitize the readout traces after triggering
    pub digitize: bool,
    /// Channels required for a station trigger
    pub coincidence: usize,
    /// Coincidence window in ns
    pub coincidence_window: f64,
    /// Keep events that triggered no station
    pub keep_untriggered: bool,
    /// Signal propagation model
    pub propagation: PropagationConfig,
    /// RNG seed for noise and the ADC clock offset
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_samples: 2048,
            pre_trigger_time: 200.0,
            spectral_slope: -0.3,
            add_noise: true,
            rayleigh_noise: true,
            noise_band: (0.05, 1.0),
            digitize: false,
            coincidence: 1,
            coincidence_window: 100.0,
            keep_untriggered: true,
            propagation: PropagationConfig::default(),
            seed: 1,
        }
    }
}

impl SimulationConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.n_samples == 0 || self.n_samples % 2 != 0 {
            return Err(SimError::configuration(format!(
                "n_samples {} must be even and > 0",
                self.n_samples
            )));
        }
        if self.pre_trigger_time < 0.0 {
            return Err(SimError::configuration(format!(
                "pre_trigger_time {} ns must be >= 0",
                self.pre_trigger_time
            )));
        }
        if self.spectral_slope >= 0.0 {
            return Err(SimError::configuration(format!(
                "spectral_slope {} must be negative",
                self.spectral_slope
            )));
        }
        if self.noise_band.0 < 0.0 || self.noise_band.1 <= self.noise_band.0 {
            return Err(SimError::configuration(format!(
                "noise band ({}, {}) GHz is not ordered",
                self.noise_band.0, self.noise_band.1
            )));
        }
        if self.coincidence == 0 {
            return Err(SimError::configuration("coincidence must be >= 1"));
        }
        if self.coincidence > 1 && self.coincidence_window <= 0.0 {
            return Err(SimError::configuration(
                "coincidence_window must be > 0 for multi-channel coincidence",
            ));
        }
        self.propagation.validate()?;
        Ok(())
    }
}

/// Counters accumulated over one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Events handed to the pipeline
    pub n_input: u64,
    /// Events simulated to completion
    pub n_simulated: u64,
    /// Events with at least one fired station trigger
    pub n_triggered: u64,
    /// Events dropped by recoverable errors
    pub n_skipped: u64,
    /// Channels left silent by degenerate geometry or a signal outside
    /// the readout window
    pub n_silent_channels: u64,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct SimulationOutcome {
    /// Simulated events, in input order
    pub events: Vec<SimEvent>,
    /// Run counters
    pub stats: SimulationStats,
}

/// The simulation pipeline.
pub struct SimulationPipeline {
    detector: DetectorDescription,
    antennas: AntennaRegistry,
    config: SimulationConfig,
    propagator: StraightLinePropagator,
    trigger: ThresholdTrigger,
    adc: AnalogToDigitalConverter,
    rng: StdRng,
    run_id: RunId,
    stats: SimulationStats,
    signal_elapsed: Duration,
    noise_elapsed: Duration,
    // working copy of the station list, swapped out while the mutable
    // modules run over it
    station_copies: Vec<StationDescription>,
}

impl SimulationPipeline {
    /// Creates a pipeline over a detector description.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] for inconsistent settings and
    /// detector validation errors from the description.
    pub fn new(
        detector: DetectorDescription,
        antennas: AntennaRegistry,
        config: SimulationConfig,
    ) -> Result<Self, SimError> {
        config.validate()?;
        detector.validate()?;

        // fail fast on unknown antenna models instead of at the first event
        for station in &detector.stations {
            for channel in &station.channels {
                antennas.get(&channel.antenna_model, channel.id.0)?;
            }
        }

        let trigger = ThresholdTrigger::new(ThresholdTriggerConfig {
            name: format!("threshold_{}fold", config.coincidence),
            coincidence: config.coincidence,
            coincidence_window: config.coincidence_window,
            threshold_overrides: Default::default(),
        })?;

        let rng = StdRng::seed_from_u64(config.seed);
        let adc = AnalogToDigitalConverter::new(config.seed.wrapping_add(1));

        Ok(Self {
            propagator: StraightLinePropagator::new(config.propagation)?,
            station_copies: detector.stations.clone(),
            detector,
            antennas,
            config,
            trigger,
            adc,
            rng,
            run_id: RunId::new(),
            stats: SimulationStats::default(),
            signal_elapsed: Duration::ZERO,
            noise_elapsed: Duration::ZERO,
        })
    }

    /// Identifier of this simulation run.
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The detector description the pipeline runs against.
    #[must_use]
    pub fn detector(&self) -> &DetectorDescription {
        &self.detector
    }

    /// The pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulates a single event, updating the run counters.
    ///
    /// Returns `Ok(None)` when the event was skipped by a recoverable
    /// error or dropped as untriggered.
    ///
    /// # Errors
    ///
    /// Only non-recoverable errors propagate.
    pub fn simulate_one(
        &mut self,
        neutrino: &NeutrinoEvent,
    ) -> Result<Option<SimEvent>, SimError> {
        self.stats.n_input += 1;
        let stations = std::mem::take(&mut self.station_copies);
        let result = self.simulate_event(neutrino, &stations);
        self.station_copies = stations;

        match result {
            Ok(event) => {
                self.stats.n_simulated += 1;
                if event.has_triggered() {
                    self.stats.n_triggered += 1;
                    Ok(Some(event))
                } else if self.config.keep_untriggered {
                    Ok(Some(event))
                } else {
                    Ok(None)
                }
            }
            Err(e) if e.is_recoverable() => {
                warn!(event = %neutrino.id, error = %e, "skipping event");
                self.stats.n_skipped += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Simulates a list of events.
    ///
    /// # Errors
    ///
    /// Aborts only on non-recoverable errors; events hit by recoverable
    /// ones are counted in [`SimulationStats::n_skipped`].
    pub fn run(&mut self, events: &[NeutrinoEvent]) -> Result<SimulationOutcome, SimError> {
        self.stats = SimulationStats::default();
        let mut simulated = Vec::with_capacity(events.len());
        for neutrino in events {
            if let Some(event) = self.simulate_one(neutrino)? {
                simulated.push(event);
            }
        }
        self.end();
        Ok(SimulationOutcome {
            events: simulated,
            stats: self.stats,
        })
    }

    fn simulate_event(
        &mut self,
        neutrino: &NeutrinoEvent,
        stations: &[StationDescription],
    ) -> Result<SimEvent, SimError> {
        neutrino.validate()?;
        let mut event = SimEvent::new(self.run_id, neutrino.clone());
        for det_station in stations {
            let station = self.simulate_station(neutrino, det_station)?;
            event.stations.push(station);
        }
        Ok(event)
    }

    fn simulate_station(
        &mut self,
        neutrino: &NeutrinoEvent,
        det_station: &StationDescription,
    ) -> Result<SimStation, SimError> {
        let signal_start = Instant::now();
        let mut station = SimStation::new(det_station.id);

        // propagation first: the earliest arrival defines the common
        // trace start time of the station
        let mut paths: Vec<Option<PropagationResult>> = Vec::new();
        for channel in &det_station.channels {
            let target = det_station.channel_position(channel);
            match self.propagator.propagate(&neutrino.vertex, &target) {
                Ok(path) => paths.push(Some(path)),
                Err(e) if e.is_recoverable() => {
                    debug!(
                        station = %det_station.id,
                        channel = %channel.id,
                        error = %e,
                        "channel left silent"
                    );
                    self.stats.n_silent_channels += 1;
                    paths.push(None);
                }
                Err(e) => return Err(e),
            }
        }

        let earliest = paths
            .iter()
            .flatten()
            .map(|p| p.travel_time)
            .fold(f64::INFINITY, f64::min);
        let trace_start = if earliest.is_finite() {
            earliest - self.config.pre_trigger_time
        } else {
            0.0
        };

        for (channel, path) in det_station.channels.iter().zip(paths.iter()) {
            let mut trace = self.simulate_channel(neutrino, channel, path.as_ref(), earliest)?;
            trace.shift_start_time(trace_start);
            station.channels.push(SimChannel {
                id: channel.id,
                trace,
            });
        }
        self.signal_elapsed += signal_start.elapsed();

        if self.config.add_noise {
            let noise_start = Instant::now();
            for sim_channel in &mut station.channels {
                let det_channel = det_station.channel(sim_channel.id)?;
                if det_channel.noise_rms <= 0.0 {
                    continue;
                }
                let nyquist = det_channel.sampling_frequency / 2.0;
                let band = (
                    self.config.noise_band.0,
                    self.config.noise_band.1.min(nyquist),
                );
                if band.1 <= band.0 {
                    return Err(SimError::configuration(format!(
                        "noise band ({}, {}) GHz collapses at channel {} (Nyquist {} GHz)",
                        self.config.noise_band.0, self.config.noise_band.1,
                        det_channel.id, nyquist
                    )));
                }
                let mode = if self.config.rayleigh_noise {
                    AmplitudeMode::Rayleigh
                } else {
                    AmplitudeMode::Flat
                };
                let mut generator = NoiseGenerator::new(
                    NoiseConfig {
                        min_freq: band.0,
                        max_freq: band.1,
                        rms: det_channel.noise_rms,
                        mode,
                    },
                    self.rng.gen(),
                );
                generator.add_noise(&mut sim_channel.trace)?;
            }
            self.noise_elapsed += noise_start.elapsed();
        }

        self.trigger.run(&mut station, det_station)?;

        if self.config.digitize {
            self.adc
                .run(&mut station, det_station, &AdcOptions::default())?;
        }

        Ok(station)
    }

    /// Builds the signal trace of one channel, in station-local time
    /// (sample 0 at the earliest arrival minus the pre-trigger time).
    fn simulate_channel(
        &mut self,
        neutrino: &NeutrinoEvent,
        channel: &ChannelDescription,
        path: Option<&PropagationResult>,
        earliest_arrival: f64,
    ) -> Result<Trace, SimError> {
        let rate = channel.sampling_frequency;
        let n = self.config.n_samples;
        let mut samples = vec![0.0; n];

        if let Some(path) = path {
            let duration = n as f64 / rate;
            let offset =
                self.config.pre_trigger_time + (path.travel_time - earliest_arrival);

            if offset > MAX_WINDOW_FRACTION * duration {
                debug!(
                    channel = %channel.id,
                    offset_ns = offset,
                    "signal outside the readout window, channel left silent"
                );
                self.stats.n_silent_channels += 1;
            } else {
                let pattern = self.antennas.get(&channel.antenna_model, channel.id.0)?;
                let frequencies = fft::rfftfreq(n, rate);
                let response = pattern.response(&frequencies);
                let directivity = pattern.directivity(path.arrival_angle);
                let scale = path.amplitude_factor * directivity;

                // a linear spectral phase places the pulse at `offset`
                let phase_slope = -2.0 * std::f64::consts::PI * offset;

                for shower in neutrino.showers() {
                    let fluence = 10_f64.powf(pulse::amp_from_energy(shower.energy));
                    let mut spectrum = pulse::analytic_pulse_freq(
                        fluence,
                        self.config.spectral_slope,
                        0.0,
                        phase_slope,
                        n,
                        rate,
                        None,
                    )?;
                    for (s, h) in spectrum.iter_mut().zip(response.iter()) {
                        *s *= h * scale;
                    }
                    let contribution = fft::freq2time(&spectrum, rate, n);
                    for (acc, v) in samples.iter_mut().zip(contribution.iter()) {
                        *acc += v;
                    }
                }
            }
        }

        Ok(Trace::new(samples, rate, 0.0)?)
    }

    /// Logs the accumulated module timings.
    pub fn end(&self) {
        info!(
            "total time used by the signal module is {:?}",
            self.signal_elapsed
        );
        if self.config.add_noise {
            info!(
                "total time used by the noise module is {:?}",
                self.noise_elapsed
            );
        }
        let _ = self.trigger.end();
        if self.config.digitize {
            let _ = self.adc.end();
        }
    }

    /// Counters of the last (or current) run.
    #[must_use]
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icerad_core::{Current, Direction, EventId, Flavor, Position};
    use icerad_detector::{AdcFields, StationDescription};
    use icerad_core::{ChannelId, StationId};

    fn detector() -> DetectorDescription {
        DetectorDescription {
            name: Some("unit_test_array".into()),
            stations: vec![StationDescription {
                id: StationId(11),
                name: None,
                position_m: [0.0, 0.0, -100.0],
                channels: (0..4)
                    .map(|i| ChannelDescription {
                        id: ChannelId(i),
                        antenna_model: "bicone".into(),
                        position_m: [0.0, 0.0, -(i as f64)],
                        sampling_frequency: 2.4,
                        noise_rms: 1e-6,
                        trigger_threshold: 1e-5,
                        adc: AdcFields {
                            n_bits: Some(12),
                            reference_voltage: Some(0.5),
                            sampling_frequency: Some(0.6),
                            time_delay: None,
                            ntaps: None,
                        },
                        trigger_adc: AdcFields::default(),
                    })
                    .collect(),
            }],
        }
    }

    fn close_bright_event() -> NeutrinoEvent {
        NeutrinoEvent {
            id: EventId(0),
            vertex: Position::new(30.0, 0.0, -130.0),
            direction: Direction::new(1.5, 0.0).unwrap(),
            energy: 1e19,
            flavor: Flavor::Electron,
            current: Current::Charged,
            inelasticity: 0.3,
        }
    }

    fn pipeline(config: SimulationConfig) -> SimulationPipeline {
        SimulationPipeline::new(detector(), AntennaRegistry::with_builtin(), config).unwrap()
    }

    #[test]
    fn bright_nearby_event_triggers() {
        let mut pipeline = pipeline(SimulationConfig {
            add_noise: false,
            ..SimulationConfig::default()
        });
        let outcome = pipeline.run(&[close_bright_event()]).unwrap();
        assert_eq!(outcome.stats.n_simulated, 1);
        assert_eq!(outcome.stats.n_triggered, 1);
        assert!(outcome.events[0].has_triggered());
        let station = &outcome.events[0].stations[0];
        assert_eq!(station.channels.len(), 4);
        assert!(station.channels[0].trace.peak_amplitude() > 0.0);
    }

    #[test]
    fn unknown_antenna_model_fails_at_construction() {
        let mut det = detector();
        det.stations[0].channels[0].antenna_model = "missing_model".into();
        let err = SimulationPipeline::new(
            det,
            AntennaRegistry::with_builtin(),
            SimulationConfig::default(),
        )
        .err()
        .expect("construction must fail");
        assert!(matches!(
            err,
            SimError::Detector(icerad_detector::DetectorError::AntennaPatternNotFound { .. })
        ));
    }

    #[test]
    fn degenerate_vertex_skips_the_event_not_the_run() {
        let mut pipeline = pipeline(SimulationConfig {
            add_noise: false,
            ..SimulationConfig::default()
        });
        let mut on_top = close_bright_event();
        // directly on channel 0 of the station
        on_top.vertex = Position::new(0.0, 0.0, -100.0);
        let fine = close_bright_event();

        let outcome = pipeline.run(&[on_top, fine]).unwrap();
        // the degenerate channel is silent, not fatal; both events simulate
        assert_eq!(outcome.stats.n_simulated, 2);
        assert!(outcome.stats.n_silent_channels >= 1);
    }

    #[test]
    fn distant_dim_event_does_not_trigger() {
        let mut det = detector();
        for channel in &mut det.stations[0].channels {
            channel.trigger_threshold = 10.0;
        }
        let mut pipeline = SimulationPipeline::new(
            det,
            AntennaRegistry::with_builtin(),
            SimulationConfig {
                add_noise: false,
                keep_untriggered: true,
                ..SimulationConfig::default()
            },
        )
        .unwrap();
        let mut far = close_bright_event();
        far.vertex = Position::new(2500.0, 0.0, -2000.0);
        far.energy = 1e16;
        let outcome = pipeline.run(&[far]).unwrap();
        assert_eq!(outcome.stats.n_triggered, 0);
        assert_eq!(outcome.events.len(), 1); // kept, untriggered
    }

    #[test]
    fn drop_untriggered_removes_quiet_events() {
        let mut det = detector();
        for channel in &mut det.stations[0].channels {
            channel.trigger_threshold = 10.0;
        }
        let mut pipeline = SimulationPipeline::new(
            det,
            AntennaRegistry::with_builtin(),
            SimulationConfig {
                add_noise: false,
                keep_untriggered: false,
                ..SimulationConfig::default()
            },
        )
        .unwrap();
        let outcome = pipeline.run(&[close_bright_event()]).unwrap();
        assert_eq!(outcome.stats.n_simulated, 1);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn noise_is_deterministic_under_seed() {
        let config = SimulationConfig {
            digitize: false,
            ..SimulationConfig::default()
        };
        let run = |seed: u64| {
            let mut pipeline = pipeline(SimulationConfig { seed, ..config.clone() });
            pipeline.run(&[close_bright_event()]).unwrap()
        };
        let a = run(5);
        let b = run(5);
        assert_eq!(
            a.events[0].stations[0].channels[0].trace.samples(),
            b.events[0].stations[0].channels[0].trace.samples()
        );
        let c = run(6);
        assert_ne!(
            a.events[0].stations[0].channels[0].trace.samples(),
            c.events[0].stations[0].channels[0].trace.samples()
        );
    }

    #[test]
    fn digitization_changes_the_sampling_rate() {
        let mut pipeline = pipeline(SimulationConfig {
            add_noise: false,
            digitize: true,
            ..SimulationConfig::default()
        });
        let outcome = pipeline.run(&[close_bright_event()]).unwrap();
        let trace = &outcome.events[0].stations[0].channels[0].trace;
        assert!((trace.sampling_rate() - 0.6).abs() < 1e-12);
        assert_eq!(trace.len() % 2, 0);
    }

    #[test]
    fn coincidence_trigger_records_participants() {
        let mut pipeline = pipeline(SimulationConfig {
            add_noise: false,
            coincidence: 2,
            coincidence_window: 50.0,
            ..SimulationConfig::default()
        });
        let outcome = pipeline.run(&[close_bright_event()]).unwrap();
        let record = &outcome.events[0].stations[0].triggers[0];
        assert!(record.triggered);
        assert!(record.channels.len() >= 2);
        assert_eq!(record.name, "threshold_2fold");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimulationConfig::default();
        config.n_samples = 1023;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.spectral_slope = 0.1;
        assert!(config.validate().is_err());
    }
}
