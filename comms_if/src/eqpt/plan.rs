//! # Path plan messages

use serde::{Deserialize, Serialize};

/// A single pose of a planned path, in the planner's north-west-up frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlannerPose {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
}

/// An ordered path produced by the planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Plan {
    pub poses: Vec<PlannerPose>,
}

/// The simplified waypoint list derived from a plan, in the controller frame.
///
/// Published for inspection only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SparsePath {
    pub points_m: Vec<[f64; 3]>,
}

impl Plan {
    /// Build a plan from `(x, y)` planner coordinates at zero altitude.
    pub fn from_xy(points: &[(f64, f64)]) -> Self {
        Self {
            poses: points
                .iter()
                .map(|&(x_m, y_m)| PlannerPose { x_m, y_m, z_m: 0.0 })
                .collect(),
        }
    }
}
