//! # Actuation command messages

use serde::{Deserialize, Serialize};

/// A command sent to the vehicle link for actuation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ActCmd {
    pub pitch: f64,
    pub roll: f64,
    pub throttle: f64,
    pub yaw: f64,

    /// Timestamp of the estimate this command was computed from, in seconds.
    pub timestamp_s: f64,
}
