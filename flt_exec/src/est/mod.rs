//! # Estimate module
//!
//! Converts state estimates arriving on the wire into the vehicle's working representation, and
//! filters spurious jumps out of the estimator's output.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod filter;
pub use filter::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::est as wire;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Smallest quaternion norm accepted from the wire. Anything shorter cannot be normalised and is
/// replaced by the identity.
const MIN_QUAT_NORM: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Timestamped pose and velocity of the vehicle, in the controller's north-east-down frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Estimate {
    /// Time of validity in seconds
    pub timestamp_s: f64,

    /// Position of the vehicle body in the current reference frame
    pub position_m: Vector3<f64>,

    /// Attitude of the vehicle body in the current reference frame
    pub attitude_q: UnitQuaternion<f64>,

    /// Velocity in the body frame
    pub velocity_ms: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The producer of estimates. Exactly one is active in a given flight.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstSource {
    /// The onboard estimator, which may relocalise onto new reference nodes.
    Estimator,

    /// Motion capture, in a fixed frame.
    GroundTruth,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Estimate {
    /// Build an estimate from a wire message produced by the given source.
    ///
    /// The attitude is renormalised. Motion capture reports inertial velocity, which is rotated
    /// into the body frame so both sources hand the controller the same quantity.
    pub fn from_msg(msg: &wire::Estimate, source: EstSource) -> Self {
        let [w, i, j, k] = msg.attitude_q;
        let attitude_q = UnitQuaternion::try_new(Quaternion::new(w, i, j, k), MIN_QUAT_NORM)
            .unwrap_or_else(UnitQuaternion::identity);

        let velocity_ms = Vector3::from(msg.velocity_ms);
        let velocity_ms = match source {
            EstSource::Estimator => velocity_ms,
            EstSource::GroundTruth => attitude_q.inverse_transform_vector(&velocity_ms),
        };

        Self {
            timestamp_s: msg.timestamp_s,
            position_m: Vector3::from(msg.position_m),
            attitude_q,
            velocity_ms,
        }
    }

    /// Heading of the vehicle about the vertical axis, in the range [-pi, pi].
    pub fn heading_rad(&self) -> f64 {
        self.attitude_q.euler_angles().2
    }
}

#[cfg(test)]
pub(crate) fn test_estimate(timestamp_s: f64, x: f64, y: f64, z: f64) -> Estimate {
    Estimate {
        timestamp_s,
        position_m: Vector3::new(x, y, z),
        attitude_q: UnitQuaternion::identity(),
        velocity_ms: Vector3::zeros(),
    }
}
