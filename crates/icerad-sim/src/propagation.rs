//! Straight-line signal propagation.
//!
//! The path from a shower vertex to a channel is treated as a straight
//! line through homogeneous ice: travel time from a constant index of
//! refraction, amplitude from 1/R spreading and an exponential
//! attenuation length. Paths shorter than a configurable minimum are
//! rejected as degenerate.

use serde::{Deserialize, Serialize};

use icerad_core::{units, Position};

use crate::error::SimError;

/// Configuration of the straight-line propagator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Index of refraction of the bulk ice
    pub index_of_refraction: f64,
    /// Field attenuation length in m
    pub attenuation_length: f64,
    /// Shortest path length accepted, in m
    pub min_distance: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            index_of_refraction: 1.78,
            attenuation_length: 1000.0,
            min_distance: 1.0,
        }
    }
}

impl PropagationConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.index_of_refraction < 1.0 {
            return Err(SimError::configuration(format!(
                "index of refraction {} must be >= 1",
                self.index_of_refraction
            )));
        }
        if self.attenuation_length <= 0.0 {
            return Err(SimError::configuration(format!(
                "attenuation length {} m must be > 0",
                self.attenuation_length
            )));
        }
        if self.min_distance <= 0.0 {
            return Err(SimError::configuration(format!(
                "minimum distance {} m must be > 0",
                self.min_distance
            )));
        }
        Ok(())
    }
}

/// Result of propagating a signal along one path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationResult {
    /// Path length in m
    pub distance: f64,
    /// Signal travel time in ns
    pub travel_time: f64,
    /// Field amplitude factor relative to 1 m from the vertex
    pub amplitude_factor: f64,
    /// Zenith-like angle of the arrival direction at the channel,
    /// measured from the vertical, in rad
    pub arrival_angle: f64,
}

/// Straight-line propagator.
#[derive(Debug, Clone)]
pub struct StraightLinePropagator {
    config: PropagationConfig,
}

impl StraightLinePropagator {
    /// Creates a propagator from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] for inconsistent settings.
    pub fn new(config: PropagationConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The propagator configuration.
    #[must_use]
    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Propagates from `vertex` to `target`.
    ///
    /// # Errors
    ///
    /// Returns the recoverable [`SimError::DegenerateGeometry`] when the
    /// path is shorter than the configured minimum.
    pub fn propagate(
        &self,
        vertex: &Position,
        target: &Position,
    ) -> Result<PropagationResult, SimError> {
        let distance = vertex.distance_to(target);
        if distance < self.config.min_distance {
            return Err(SimError::DegenerateGeometry {
                distance,
                minimum: self.config.min_distance,
            });
        }

        let travel_time = distance * self.config.index_of_refraction / units::C_LIGHT;
        let amplitude_factor =
            (1.0 / distance) * (-distance / self.config.attenuation_length).exp();

        let dz = (target.z - vertex.z).abs();
        let arrival_angle = (dz / distance).clamp(-1.0, 1.0).acos();

        Ok(PropagationResult {
            distance,
            travel_time,
            amplitude_factor,
            arrival_angle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn propagator() -> StraightLinePropagator {
        StraightLinePropagator::new(PropagationConfig::default()).unwrap()
    }

    #[test]
    fn travel_time_uses_the_ice_index() {
        let result = propagator()
            .propagate(
                &Position::new(0.0, 0.0, -1000.0),
                &Position::new(0.0, 0.0, -700.0),
            )
            .unwrap();
        assert!((result.distance - 300.0).abs() < 1e-9);
        let expected = 300.0 * 1.78 / units::C_LIGHT;
        assert!((result.travel_time - expected).abs() < 1e-9);
    }

    #[test]
    fn amplitude_falls_with_distance() {
        let p = propagator();
        let near = p
            .propagate(&Position::new(0.0, 0.0, -100.0), &Position::new(0.0, 0.0, -200.0))
            .unwrap();
        let far = p
            .propagate(&Position::new(0.0, 0.0, -100.0), &Position::new(0.0, 0.0, -1100.0))
            .unwrap();
        assert!(near.amplitude_factor > far.amplitude_factor);
        // 1/R alone gives a factor 10; attenuation makes it larger
        assert!(near.amplitude_factor / far.amplitude_factor > 10.0);
    }

    #[test]
    fn too_short_paths_are_degenerate() {
        let err = propagator()
            .propagate(
                &Position::new(0.0, 0.0, -100.0),
                &Position::new(0.0, 0.1, -100.0),
            )
            .unwrap_err();
        assert!(matches!(err, SimError::DegenerateGeometry { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn vertical_path_arrives_along_the_axis() {
        let result = propagator()
            .propagate(
                &Position::new(0.0, 0.0, -1000.0),
                &Position::new(0.0, 0.0, -100.0),
            )
            .unwrap();
        assert!(result.arrival_angle.abs() < 1e-9);

        let horizontal = propagator()
            .propagate(
                &Position::new(500.0, 0.0, -100.0),
                &Position::new(0.0, 0.0, -100.0),
            )
            .unwrap();
        assert!((horizontal.arrival_angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }
}
