//! # Command publisher
//!
//! Stamps the controller's demands with the time of the estimate they were computed from and
//! hands them to the actuation transport. Every accepted estimate produces exactly one send
//! attempt. A failed send is reported to the caller, which carries on with the next estimate.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::act::ActCmd;

use crate::traj_ctrl::ActDems;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something that can deliver actuation commands to the vehicle.
pub trait ActTransport {
    type Error: std::fmt::Display;

    fn send(&mut self, cmd: &ActCmd) -> Result<(), Self::Error>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct CmdPublisher<T: ActTransport> {
    transport: T,

    /// Number of consecutive failed sends
    num_consec_failures: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Could not send the command ({num_consec} consecutive failures): {reason}")]
    SendFailed { reason: String, num_consec: u64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: ActTransport> CmdPublisher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            num_consec_failures: 0,
        }
    }

    /// Stamp and send the demands, returning the command as sent.
    pub fn publish(&mut self, dems: &ActDems, est_timestamp_s: f64) -> Result<ActCmd, PublishError> {
        let cmd = ActCmd {
            pitch: dems.pitch,
            roll: dems.roll,
            throttle: dems.throttle,
            yaw: dems.yaw,
            timestamp_s: est_timestamp_s,
        };

        match self.transport.send(&cmd) {
            Ok(()) => {
                self.num_consec_failures = 0;
                Ok(cmd)
            }
            Err(e) => {
                self.num_consec_failures += 1;
                Err(PublishError::SendFailed {
                    reason: e.to_string(),
                    num_consec: self.num_consec_failures,
                })
            }
        }
    }

    pub fn num_consec_failures(&self) -> u64 {
        self.num_consec_failures
    }
}
