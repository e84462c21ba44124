//! # Trajectory control module
//!
//! Trajectory control turns a target (a hold point or a list of waypoints) into attitude and
//! throttle demands. The flight executive talks to it only through the [`TrajCtrl`] trait, so the
//! control law can be swapped without touching the mode logic.
//!
//! [`PosCtrl`] is the reference implementation: a cascade-free PID on position error, rotated
//! into the heading frame, with a proportional heading loop. Waypoints are followed one after
//! another, each considered reached once inside `waypoint_reached_m`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::Params;
pub use state::*;

use nalgebra::{Isometry3, Vector3};

use crate::{blackboard::WaypointList, est::Estimate};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything the controller needs to know about the current cycle.
#[derive(Debug, Copy, Clone)]
pub struct CtrlInput {
    pub est: Estimate,

    /// Time since the previous accepted estimate, zero after a stale clock
    pub dt_s: f64,

    pub batt_voltage_v: f64,
}

/// Attitude and throttle demands.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct ActDems {
    pub pitch: f64,
    pub roll: f64,
    pub throttle: f64,
    pub yaw: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CtrlOutput {
    pub dems: ActDems,

    /// Whether the end of the waypoint list has been reached. `None` when the request was not
    /// a waypoint request and the controller has no new verdict.
    pub achieved: Option<bool>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the controller is asked to do this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandRequest {
    /// Hold the last commanded target.
    Hover,

    /// Hold the given point at the given heading.
    HoverWithOverride { point_m: Vector3<f64>, yaw_rad: f64 },

    /// Follow waypoints, starting on the given list if one is supplied, otherwise continuing
    /// the current one.
    WaypointFollow(Option<WaypointList>),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trajectory control law.
pub trait TrajCtrl {
    /// Tell the controller whether the vehicle is airborne.
    fn set_flying(&mut self, flying: bool);

    /// The reference frame moved by `shift`. Every stored position must be re-expressed in the
    /// new frame.
    fn reframe(&mut self, shift: &Isometry3<f64>);

    /// Compute demands for one cycle.
    fn proc(&mut self, input: &CtrlInput, request: CommandRequest) -> CtrlOutput;
}
