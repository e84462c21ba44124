//! # Path ingestion
//!
//! Converts planner output into controller-frame waypoints, thins out near-duplicate points and
//! swaps the result into the blackboard.
//!
//! The planner works in a north-west-up frame with its own notion of altitude. The controller is
//! north-east-down relative to the current reference node, and every waypoint of a plan flies at
//! the same altitude above that node: `desired_global_z - node_global_z`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::plan::{Plan, PlannerPose, SparsePath};
use log::debug;
use nalgebra::Vector3;

use crate::blackboard::{Blackboard, WaypointList};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PathIngestor {
    /// Altitude to fly at, in the global frame
    desired_global_z_m: f64,

    /// Minimum distance between consecutive kept waypoints
    min_spacing_m: f64,
}

/// Outcome of ingesting one plan.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Number of poses in the plan
    pub raw_len: usize,

    /// The list swapped into the blackboard
    pub waypoints: WaypointList,

    /// The plan completed a pending goal
    pub goal_reset: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("The plan contains no poses")]
    EmptyPlan,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathIngestor {
    pub fn new(desired_global_z_m: f64, min_spacing_m: f64) -> Self {
        Self {
            desired_global_z_m,
            min_spacing_m,
        }
    }

    /// Convert, sparsify and publish a plan to the blackboard.
    ///
    /// Empty plans are rejected and leave the current list in place.
    pub fn ingest(&self, plan: &Plan, board: &Blackboard) -> Result<IngestReport, IngestError> {
        if plan.poses.is_empty() {
            return Err(IngestError::EmptyPlan);
        }

        let rel_z_m = self.desired_global_z_m - board.node_global_z();
        let sparse = sparsify(&to_ctrl_frame(&plan.poses, rel_z_m), self.min_spacing_m);

        debug!(
            "Plan of {} poses sparsified to {} waypoints at {:.2} m",
            plan.poses.len(),
            sparse.len(),
            rel_z_m
        );

        let swap = board.swap_waypoints(sparse);

        Ok(IngestReport {
            raw_len: plan.poses.len(),
            waypoints: swap.waypoints,
            goal_reset: swap.goal_reset,
        })
    }
}

impl IngestReport {
    /// The waypoint list in its published form.
    pub fn to_sparse_path(&self) -> SparsePath {
        SparsePath {
            points_m: self.waypoints.iter().map(|p| [p.x, p.y, p.z]).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Map planner poses into the controller frame at a single relative altitude.
pub fn to_ctrl_frame(poses: &[PlannerPose], rel_z_m: f64) -> Vec<Vector3<f64>> {
    poses
        .iter()
        .map(|p| Vector3::new(p.x_m, -p.y_m, rel_z_m))
        .collect()
}

/// Thin out a list of points.
///
/// The first and last points are always kept. In between, a point is kept only if it lies more
/// than `min_spacing_m` from the last kept point.
pub fn sparsify(points: &[Vector3<f64>], min_spacing_m: f64) -> Vec<Vector3<f64>> {
    let (first, last) = match (points.first(), points.last()) {
        (Some(f), Some(l)) if points.len() > 2 => (f, l),
        _ => return points.to_vec(),
    };

    let mut kept = vec![*first];
    let mut last_kept = *first;

    for p in &points[1..points.len() - 1] {
        if (p - last_kept).norm() > min_spacing_m {
            kept.push(*p);
            last_kept = *p;
        }
    }

    kept.push(*last);
    kept
}
