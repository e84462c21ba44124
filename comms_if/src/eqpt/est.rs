//! # State estimate messages

use serde::{Deserialize, Serialize};

/// Timestamped pose and velocity of the vehicle.
///
/// Produced either by the onboard estimator or by motion capture, never both in one flight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Estimate {
    /// Time of validity of the estimate in seconds.
    pub timestamp_s: f64,

    /// Position in the estimate's reference frame, north-east-down.
    pub position_m: [f64; 3],

    /// Attitude quaternion in `[w, x, y, z]` order.
    pub attitude_q: [f64; 4],

    /// Velocity. Body frame for the estimator, inertial frame for motion capture.
    pub velocity_ms: [f64; 3],
}
