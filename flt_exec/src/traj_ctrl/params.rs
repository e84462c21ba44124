//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Horizontal position controller proportional gain
    pub horiz_k_p: f64,

    /// Horizontal position controller integral gain
    pub horiz_k_i: f64,

    /// Horizontal position controller derivative gain
    pub horiz_k_d: f64,

    /// Altitude controller proportional gain
    pub alt_k_p: f64,

    /// Altitude controller integral gain
    pub alt_k_i: f64,

    /// Altitude controller derivative gain
    pub alt_k_d: f64,

    /// Heading controller proportional gain
    pub head_k_p: f64,

    /// Throttle which holds altitude at the nominal battery voltage
    pub hover_throttle: f64,

    /// Battery voltage at which `hover_throttle` was measured
    pub nominal_batt_voltage_v: f64,

    /// Throttle demand minimum limit
    pub min_throttle: f64,

    /// Throttle demand maximum limit
    pub max_throttle: f64,

    /// Pitch and roll demand limit
    pub max_tilt_rad: f64,

    /// Yaw rate demand limit
    pub max_yaw_rate_rads: f64,

    /// Distance under which a waypoint counts as reached
    pub waypoint_reached_m: f64,
}
