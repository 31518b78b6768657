//! Effective-volume estimation.
//!
//! The effective volume is the generation volume weighted by the
//! triggered fraction: `Veff = V_gen * N_trig / N_total`. The binned
//! variant resolves it against neutrino energy for sensitivity plots.

use serde::{Deserialize, Serialize};

use icerad_core::SimEvent;

use crate::generator::CylinderVolume;

/// Effective-volume estimate over a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VeffEstimate {
    /// Generation volume in m^3
    pub generation_volume: f64,
    /// Triggered events
    pub n_triggered: u64,
    /// Simulated events
    pub n_total: u64,
    /// Effective volume in m^3
    pub veff: f64,
    /// Poisson uncertainty on the effective volume, in m^3
    pub veff_uncertainty: f64,
}

impl VeffEstimate {
    /// Computes the estimate from trigger counts.
    #[must_use]
    pub fn from_counts(volume: &CylinderVolume, n_triggered: u64, n_total: u64) -> Self {
        let generation_volume = volume.volume();
        let (veff, veff_uncertainty) = if n_total == 0 {
            (0.0, 0.0)
        } else {
            let fraction = n_triggered as f64 / n_total as f64;
            (
                generation_volume * fraction,
                generation_volume * (n_triggered as f64).sqrt() / n_total as f64,
            )
        };
        Self {
            generation_volume,
            n_triggered,
            n_total,
            veff,
            veff_uncertainty,
        }
    }

    /// Triggered fraction.
    #[must_use]
    pub fn triggered_fraction(&self) -> f64 {
        if self.n_total == 0 {
            0.0
        } else {
            self.n_triggered as f64 / self.n_total as f64
        }
    }
}

/// Trigger fraction resolved in neutrino energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerFractionBinned {
    /// Energy bin edges in eV, length `counts + 1`
    pub edges: Vec<f64>,
    /// Simulated events per bin
    pub totals: Vec<u64>,
    /// Triggered events per bin
    pub triggered: Vec<u64>,
}

impl TriggerFractionBinned {
    /// Bins `events` by neutrino energy over the given edges.
    #[must_use]
    pub fn from_events(events: &[SimEvent], edges: &[f64]) -> Self {
        let n_bins = edges.len().saturating_sub(1);
        let mut totals = vec![0_u64; n_bins];
        let mut triggered = vec![0_u64; n_bins];
        for event in events {
            let energy = event.neutrino.energy;
            if n_bins == 0 || energy < edges[0] || energy > edges[n_bins] {
                continue;
            }
            for bin in 0..n_bins {
                let upper_ok = if bin == n_bins - 1 {
                    energy <= edges[bin + 1]
                } else {
                    energy < edges[bin + 1]
                };
                if energy >= edges[bin] && upper_ok {
                    totals[bin] += 1;
                    if event.has_triggered() {
                        triggered[bin] += 1;
                    }
                    break;
                }
            }
        }
        Self {
            edges: edges.to_vec(),
            totals,
            triggered,
        }
    }

    /// Triggered fraction per bin; bins with no events report 0.
    #[must_use]
    pub fn fractions(&self) -> Vec<f64> {
        self.totals
            .iter()
            .zip(self.triggered.iter())
            .map(|(&t, &k)| if t == 0 { 0.0 } else { k as f64 / t as f64 })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icerad_core::{
        Current, Direction, EventId, Flavor, NeutrinoEvent, Position, RunId, SimStation,
        StationId, TriggerRecord,
    };

    fn event(energy: f64, triggered: bool) -> SimEvent {
        let neutrino = NeutrinoEvent {
            id: EventId(0),
            vertex: Position::new(0.0, 0.0, -500.0),
            direction: Direction::new(1.0, 0.0).unwrap(),
            energy,
            flavor: Flavor::Muon,
            current: Current::Charged,
            inelasticity: 0.2,
        };
        let mut sim = SimEvent::new(RunId::new(), neutrino);
        let mut station = SimStation::new(StationId(1));
        station.triggers.push(TriggerRecord {
            name: "t".into(),
            triggered,
            trigger_time: triggered.then_some(0.0),
            channels: vec![],
        });
        sim.stations.push(station);
        sim
    }

    #[test]
    fn veff_is_volume_times_fraction() {
        let volume = CylinderVolume {
            r_min: 0.0,
            r_max: 100.0,
            z_min: -100.0,
            z_max: 0.0,
        };
        let estimate = VeffEstimate::from_counts(&volume, 25, 100);
        assert!((estimate.triggered_fraction() - 0.25).abs() < 1e-12);
        assert!((estimate.veff - 0.25 * volume.volume()).abs() < 1e-6);
        assert!((estimate.veff_uncertainty - volume.volume() * 5.0 / 100.0).abs() < 1e-6);
    }

    #[test]
    fn zero_events_give_zero_veff() {
        let estimate = VeffEstimate::from_counts(&CylinderVolume::default(), 0, 0);
        assert_eq!(estimate.veff, 0.0);
        assert_eq!(estimate.triggered_fraction(), 0.0);
    }

    #[test]
    fn binned_fractions_track_energy() {
        let events = vec![
            event(3e17, false),
            event(5e17, true),
            event(3e18, true),
            event(5e18, true),
        ];
        let edges = [1e17, 1e18, 1e19];
        let binned = TriggerFractionBinned::from_events(&events, &edges);
        assert_eq!(binned.totals, vec![2, 2]);
        assert_eq!(binned.triggered, vec![1, 2]);
        let fractions = binned.fractions();
        assert!((fractions[0] - 0.5).abs() < 1e-12);
        assert!((fractions[1] - 1.0).abs() < 1e-12);
    }
}
