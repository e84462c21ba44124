//! # Telecommand module
//!
//! Requests sent to the flight executive by the ground or a high level planner. Each request is
//! answered with a [`TcResponse`] over the same request-reply socket.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use structopt::{clap::AppSettings, StructOpt};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt, PartialEq)]
pub enum Tc {
    /// A new high level goal has been chosen. The planner will follow up with a path to it.
    #[structopt(name = "goal", setting = AppSettings::AllowNegativeNumbers)]
    NewGoal {
        /// North coordinate of the goal
        x_m: f64,

        /// East coordinate of the goal
        y_m: f64,

        /// Down coordinate of the goal
        z_m: f64,
    },

    /// Turn in place to the given heading while hovering.
    #[structopt(name = "yaw", setting = AppSettings::AllowNegativeNumbers)]
    RequestYaw {
        /// Heading to turn to, in radians
        yaw_rad: f64,
    },
}

/// Response to a telecommand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TcResponse {
    /// The request was accepted.
    Ok,

    /// The request was understood but cannot be executed.
    Rejected,

    /// The request could not be parsed.
    Invalid,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_json() {
        assert_eq!(
            Tc::from_json(r#"{"RequestYaw": {"yaw_rad": 1.5}}"#).unwrap(),
            Tc::RequestYaw { yaw_rad: 1.5 }
        );
        assert!(Tc::from_json(r#"{"Land": null}"#).is_err());
    }

    #[test]
    fn test_from_cli() {
        let tc = Tc::from_iter_safe(&["tc", "goal", "1.0", "-2.5", "-1.0"]).unwrap();
        assert_eq!(
            tc,
            Tc::NewGoal {
                x_m: 1.0,
                y_m: -2.5,
                z_m: -1.0
            }
        );

        assert!(Tc::from_iter_safe(&["tc", "yaw"]).is_err());
    }
}
