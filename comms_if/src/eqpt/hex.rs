//! # Vehicle status messages

use serde::{Deserialize, Serialize};

/// Status reported by the vehicle's flight controller on its debug stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HexStatus {
    /// Main battery voltage
    pub batt_voltage_v: f64,
}
