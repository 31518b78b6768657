//! Station triggers.
//!
//! [`ThresholdTrigger`] fires when enough channels cross their
//! absolute-voltage thresholds inside a coincidence window. Thresholds
//! come from the detector description per channel and can be overridden
//! per run. Every evaluation appends a named [`TriggerRecord`] to the
//! station, whether it fired or not.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::info;

use icerad_core::{ChannelId, SimStation, TriggerRecord};

use crate::description::StationDescription;
use crate::error::DetectorError;

/// Configuration of a threshold trigger.
#[derive(Debug, Clone)]
pub struct ThresholdTriggerConfig {
    /// Name recorded on the station, e.g. `"threshold_1of2"`
    pub name: String,
    /// Minimum number of channels that must cross, >= 1
    pub coincidence: usize,
    /// Coincidence window in ns; crossings further apart do not count
    /// together
    pub coincidence_window: f64,
    /// Per-channel threshold overrides in V; channels not listed use the
    /// detector description value
    pub threshold_overrides: HashMap<ChannelId, f64>,
}

impl ThresholdTriggerConfig {
    /// Single-channel trigger with detector-file thresholds.
    #[must_use]
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coincidence: 1,
            coincidence_window: 0.0,
            threshold_overrides: HashMap::new(),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.name.is_empty() {
            return Err(DetectorError::InvalidTrigger {
                message: "trigger name is empty".into(),
            });
        }
        if self.coincidence == 0 {
            return Err(DetectorError::InvalidTrigger {
                message: "coincidence must be >= 1".into(),
            });
        }
        if self.coincidence > 1 && self.coincidence_window <= 0.0 {
            return Err(DetectorError::InvalidTrigger {
                message: "coincidence_window must be > 0 for multi-channel coincidence".into(),
            });
        }
        if let Some((id, &t)) = self
            .threshold_overrides
            .iter()
            .find(|(_, &t)| t <= 0.0 || !t.is_finite())
        {
            return Err(DetectorError::InvalidTrigger {
                message: format!("override threshold {t} V for channel {id} must be > 0"),
            });
        }
        Ok(())
    }
}

/// First threshold crossing of one channel.
#[derive(Debug, Clone, Copy)]
struct Crossing {
    channel: ChannelId,
    time: f64,
}

/// Absolute-voltage threshold trigger with optional multi-channel
/// coincidence.
#[derive(Debug)]
pub struct ThresholdTrigger {
    config: ThresholdTriggerConfig,
    elapsed: Duration,
}

impl ThresholdTrigger {
    /// Creates a trigger from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError::InvalidTrigger`] for inconsistent
    /// settings.
    pub fn new(config: ThresholdTriggerConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        Ok(Self {
            config,
            elapsed: Duration::ZERO,
        })
    }

    /// The trigger configuration.
    #[must_use]
    pub fn config(&self) -> &ThresholdTriggerConfig {
        &self.config
    }

    /// Evaluates the trigger on a station and appends the result.
    ///
    /// Returns whether the trigger fired.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a simulated channel has no
    /// counterpart in the detector description.
    pub fn run(
        &mut self,
        station: &mut SimStation,
        det_station: &StationDescription,
    ) -> Result<bool, DetectorError> {
        let start = Instant::now();

        let mut crossings: Vec<Crossing> = Vec::new();
        for channel in &station.channels {
            let threshold = match self.config.threshold_overrides.get(&channel.id) {
                Some(&t) => t,
                None => det_station.channel(channel.id)?.trigger_threshold,
            };
            let dt = channel.trace.dt();
            let t0 = channel.trace.start_time();
            if let Some(i) = channel
                .trace
                .samples()
                .iter()
                .position(|v| v.abs() > threshold)
            {
                crossings.push(Crossing {
                    channel: channel.id,
                    time: t0 + i as f64 * dt,
                });
            }
        }

        crossings.sort_by(|a, b| a.time.partial_cmp(&b.time).expect("crossing times are finite"));

        let (triggered, trigger_time, participating) = self.evaluate(&crossings);

        station.triggers.push(TriggerRecord {
            name: self.config.name.clone(),
            triggered,
            trigger_time,
            channels: participating,
        });

        self.elapsed += start.elapsed();
        Ok(triggered)
    }

    /// Coincidence logic over time-sorted crossings.
    fn evaluate(&self, crossings: &[Crossing]) -> (bool, Option<f64>, Vec<ChannelId>) {
        let needed = self.config.coincidence;
        if crossings.len() < needed {
            return (false, None, crossings.iter().map(|c| c.channel).collect());
        }
        if needed == 1 {
            let first = &crossings[0];
            return (true, Some(first.time), vec![first.channel]);
        }
        for window_start in 0..=crossings.len() - needed {
            let window_end = window_start + needed - 1;
            let span = crossings[window_end].time - crossings[window_start].time;
            if span <= self.config.coincidence_window {
                let members: Vec<ChannelId> = crossings[window_start..=window_end]
                    .iter()
                    .map(|c| c.channel)
                    .collect();
                return (true, Some(crossings[window_start].time), members);
            }
        }
        (false, None, crossings.iter().map(|c| c.channel).collect())
    }

    /// Logs and returns the total time spent in this module.
    pub fn end(&self) -> Duration {
        info!(
            "total time used by trigger '{}' is {:?}",
            self.config.name, self.elapsed
        );
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icerad_core::{SimChannel, StationId, Trace};

    use crate::description::{AdcFields, ChannelDescription};

    fn det_station(thresholds: &[f64]) -> StationDescription {
        StationDescription {
            id: StationId(1),
            name: None,
            position_m: [0.0; 3],
            channels: thresholds
                .iter()
                .enumerate()
                .map(|(i, &t)| ChannelDescription {
                    id: ChannelId(i as u32),
                    antenna_model: "bicone".into(),
                    position_m: [0.0; 3],
                    sampling_frequency: 1.0,
                    noise_rms: 0.0,
                    trigger_threshold: t,
                    adc: AdcFields::default(),
                    trigger_adc: AdcFields::default(),
                })
                .collect(),
        }
    }

    fn station_with_pulses(pulse_samples: &[(usize, f64)]) -> SimStation {
        // one channel per entry; a single spike of the given amplitude at
        // the given sample
        let mut station = SimStation::new(StationId(1));
        for (i, &(at, amplitude)) in pulse_samples.iter().enumerate() {
            let mut samples = vec![0.0; 128];
            samples[at] = amplitude;
            station.channels.push(SimChannel {
                id: ChannelId(i as u32),
                trace: Trace::new(samples, 1.0, 0.0).unwrap(),
            });
        }
        station
    }

    #[test]
    fn fires_above_threshold() {
        let mut station = station_with_pulses(&[(10, 0.2)]);
        let det = det_station(&[0.1]);
        let mut trigger = ThresholdTrigger::new(ThresholdTriggerConfig::single("t")).unwrap();
        assert!(trigger.run(&mut station, &det).unwrap());
        let record = &station.triggers[0];
        assert!(record.triggered);
        assert!((record.trigger_time.unwrap() - 10.0).abs() < 1e-12);
        assert_eq!(record.channels, vec![ChannelId(0)]);
    }

    #[test]
    fn stays_quiet_below_threshold() {
        let mut station = station_with_pulses(&[(10, 0.05)]);
        let det = det_station(&[0.1]);
        let mut trigger = ThresholdTrigger::new(ThresholdTriggerConfig::single("t")).unwrap();
        assert!(!trigger.run(&mut station, &det).unwrap());
        assert!(!station.triggers[0].triggered);
        assert!(station.triggers[0].trigger_time.is_none());
    }

    #[test]
    fn negative_excursions_count() {
        let mut station = station_with_pulses(&[(10, -0.2)]);
        let det = det_station(&[0.1]);
        let mut trigger = ThresholdTrigger::new(ThresholdTriggerConfig::single("t")).unwrap();
        assert!(trigger.run(&mut station, &det).unwrap());
    }

    #[test]
    fn per_channel_override_takes_precedence() {
        let mut station = station_with_pulses(&[(10, 0.2)]);
        let det = det_station(&[0.1]);
        let mut overrides = HashMap::new();
        overrides.insert(ChannelId(0), 0.5);
        let mut trigger = ThresholdTrigger::new(ThresholdTriggerConfig {
            name: "strict".into(),
            coincidence: 1,
            coincidence_window: 0.0,
            threshold_overrides: overrides,
        })
        .unwrap();
        assert!(!trigger.run(&mut station, &det).unwrap());
    }

    #[test]
    fn coincidence_requires_channels_inside_the_window() {
        let det = det_station(&[0.1, 0.1]);
        let config = ThresholdTriggerConfig {
            name: "2of2".into(),
            coincidence: 2,
            coincidence_window: 5.0,
            threshold_overrides: HashMap::new(),
        };

        // crossings at 10 ns and 12 ns: inside the 5 ns window
        let mut close = station_with_pulses(&[(10, 0.2), (12, 0.2)]);
        let mut trigger = ThresholdTrigger::new(config.clone()).unwrap();
        assert!(trigger.run(&mut close, &det).unwrap());
        assert_eq!(close.triggers[0].channels.len(), 2);

        // crossings at 10 ns and 50 ns: outside
        let mut far = station_with_pulses(&[(10, 0.2), (50, 0.2)]);
        let mut trigger = ThresholdTrigger::new(config).unwrap();
        assert!(!trigger.run(&mut far, &det).unwrap());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = ThresholdTriggerConfig {
            name: "x".into(),
            coincidence: 0,
            coincidence_window: 0.0,
            threshold_overrides: HashMap::new(),
        };
        assert!(ThresholdTrigger::new(bad).is_err());

        let bad_window = ThresholdTriggerConfig {
            name: "x".into(),
            coincidence: 2,
            coincidence_window: 0.0,
            threshold_overrides: HashMap::new(),
        };
        assert!(ThresholdTrigger::new(bad_window).is_err());
    }
}
