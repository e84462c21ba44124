//! # Flight phase tracking
//!
//! The vehicle starts on the ground and switches to flying the first time an accepted estimate
//! crosses the liftoff altitude. There is no transition back.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::est::EstSource;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Decides whether a vertical coordinate means the vehicle has left the ground.
///
/// The estimator reports altitude relative to its reference node with either sign, so only the
/// magnitude counts. Motion capture is north-east-down with the floor at zero, so liftoff is a
/// coordinate below a negative threshold.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LiftoffRule {
    pub source: EstSource,
    pub threshold_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FlightPhase {
    Grounded,

    /// Flying since the given estimate timestamp.
    Flying { since_s: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LiftoffRule {
    pub fn is_airborne(&self, z_m: f64) -> bool {
        match self.source {
            EstSource::Estimator => z_m.abs() > self.threshold_m,
            EstSource::GroundTruth => z_m < self.threshold_m,
        }
    }
}

impl Default for FlightPhase {
    fn default() -> Self {
        FlightPhase::Grounded
    }
}

impl FlightPhase {
    /// Update the phase from an accepted sample.
    ///
    /// Returns `true` only on the sample which performs the transition to `Flying`.
    pub fn update(&mut self, z_m: f64, now_s: f64, rule: &LiftoffRule) -> bool {
        if !self.is_flying() && rule.is_airborne(z_m) {
            *self = FlightPhase::Flying { since_s: now_s };
            true
        } else {
            false
        }
    }

    pub fn is_flying(&self) -> bool {
        matches!(self, FlightPhase::Flying { .. })
    }

    /// Seconds spent flying at time `now_s`, or `None` if still grounded.
    pub fn flying_for(&self, now_s: f64) -> Option<f64> {
        match self {
            FlightPhase::Flying { since_s } => Some(now_s - since_s),
            FlightPhase::Grounded => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_estimator_liftoff() {
        let rule = LiftoffRule {
            source: EstSource::Estimator,
            threshold_m: 0.1,
        };
        let mut phase = FlightPhase::default();

        assert!(!phase.update(0.05, 1.0, &rule));
        assert!(!phase.update(-0.1, 2.0, &rule));
        assert_eq!(phase, FlightPhase::Grounded);
        assert_eq!(phase.flying_for(2.0), None);

        assert!(phase.update(-0.15, 3.0, &rule));
        assert_eq!(phase, FlightPhase::Flying { since_s: 3.0 });

        // One way only
        assert!(!phase.update(0.0, 4.0, &rule));
        assert!(!phase.update(-2.0, 5.0, &rule));
        assert!(phase.is_flying());
        assert_eq!(phase.flying_for(5.5), Some(2.5));
    }

    #[test]
    fn test_truth_liftoff() {
        let rule = LiftoffRule {
            source: EstSource::GroundTruth,
            threshold_m: -0.29,
        };

        assert!(!rule.is_airborne(0.5));
        assert!(!rule.is_airborne(-0.2));
        assert!(rule.is_airborne(-0.3));
    }
}
