//! # Reference frame reprojection
//!
//! The estimator periodically starts a new reference node and reports the edge from the old node
//! to the new one. Waypoints are fixed in the world, so when the node moves they have to be
//! re-expressed in the new node's frame before the next control decision.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::reloc;
use log::{debug, warn};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use util::maths::wrap_pi;

use crate::blackboard::{shift_point, Blackboard};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A yaw-only rigid transform between two reference nodes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RelocEdge {
    pub from_node_id: u64,
    pub to_node_id: u64,

    /// Position of the new node in the old node's frame
    pub translation_m: Vector3<f64>,

    /// Heading of the new node in the old node's frame
    pub yaw_rad: f64,
}

/// Applies relocalisation edges to the blackboard.
#[derive(Debug, Default)]
pub struct Reprojector {
    /// Node reached by the last applied edge
    current_node_id: Option<u64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReprojOutcome {
    /// The bootstrap edge carries no motion.
    Bootstrap,

    /// The edge was applied, moving the given number of waypoints.
    Applied { num_waypoints: usize },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<&reloc::RelocEdge> for RelocEdge {
    fn from(msg: &reloc::RelocEdge) -> Self {
        Self {
            from_node_id: msg.from_node_id,
            to_node_id: msg.to_node_id,
            translation_m: Vector3::from(msg.translation_m),
            yaw_rad: msg.yaw_rad,
        }
    }
}

impl RelocEdge {
    /// Edges leaving node 0 set up the first node and move nothing.
    pub fn is_bootstrap(&self) -> bool {
        self.from_node_id == 0
    }

    /// The pose of the new node in the old node's frame.
    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.translation_m),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.yaw_rad),
        )
    }

    /// The single edge equivalent to following `self` and then `next`.
    pub fn compose(&self, next: &RelocEdge) -> RelocEdge {
        let rot = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.yaw_rad);

        RelocEdge {
            from_node_id: self.from_node_id,
            to_node_id: next.to_node_id,
            translation_m: self.translation_m + rot * next.translation_m,
            yaw_rad: wrap_pi(self.yaw_rad + next.yaw_rad),
        }
    }

    /// Express a point of the old node's frame in the new node's frame.
    pub fn reproject(&self, point_m: &Vector3<f64>) -> Vector3<f64> {
        shift_point(&self.isometry(), point_m)
    }
}

impl Reprojector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an edge to every standing position in the blackboard.
    pub fn apply(&mut self, edge: &RelocEdge, board: &Blackboard) -> ReprojOutcome {
        if edge.is_bootstrap() {
            debug!("Bootstrap edge to node {} ignored", edge.to_node_id);
            self.current_node_id = Some(edge.to_node_id);
            return ReprojOutcome::Bootstrap;
        }

        match self.current_node_id {
            Some(id) if id != edge.from_node_id => warn!(
                "Edge {} -> {} does not start from the current node {}, applying anyway",
                edge.from_node_id, edge.to_node_id, id
            ),
            _ => (),
        }
        self.current_node_id = Some(edge.to_node_id);

        let num_waypoints = board.apply_frame_shift(&edge.isometry());

        debug!(
            "Moved {} waypoints onto node {}",
            num_waypoints, edge.to_node_id
        );

        ReprojOutcome::Applied { num_waypoints }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn edge(from: u64, to: u64, t: [f64; 3], yaw_rad: f64) -> RelocEdge {
        RelocEdge {
            from_node_id: from,
            to_node_id: to,
            translation_m: Vector3::from(t),
            yaw_rad,
        }
    }

    #[test]
    fn test_compose_matches_sequence() {
        let edges = [
            edge(1, 2, [0.5, -0.3, 0.0], 0.3),
            edge(2, 3, [1.2, 0.4, 0.05], -2.9),
            edge(3, 4, [-0.7, 2.0, -0.1], 3.1),
            edge(4, 5, [0.0, 0.0, 0.0], -0.01),
        ];
        let points = [
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(3.0, -4.0, -1.5),
            Vector3::new(-10.0, 7.5, 0.0),
        ];

        for t1 in edges.iter() {
            for t2 in edges.iter() {
                let composed = t1.compose(t2);
                assert_eq!(composed.from_node_id, t1.from_node_id);
                assert_eq!(composed.to_node_id, t2.to_node_id);

                for p in points.iter() {
                    let stepwise = t2.reproject(&t1.reproject(p));
                    assert!((composed.reproject(p) - stepwise).norm() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_apply_edges_to_board() {
        let board = Blackboard::new();
        let points = vec![Vector3::new(2.0, 1.0, -1.0), Vector3::new(4.0, -1.0, -1.0)];
        board.swap_waypoints(points.clone());

        let t1 = edge(1, 2, [1.0, 0.0, 0.0], 0.5);
        let t2 = edge(2, 3, [0.0, 2.0, 0.0], -1.2);

        let mut reproj = Reprojector::new();
        assert_eq!(
            reproj.apply(&t1, &board),
            ReprojOutcome::Applied { num_waypoints: 2 }
        );
        reproj.apply(&t2, &board);

        let composed = t1.compose(&t2);
        for (moved, orig) in board.waypoints().iter().zip(points.iter()) {
            assert!((*moved - composed.reproject(orig)).norm() < 1e-9);
        }
    }

    #[test]
    fn test_bootstrap_edge_ignored() {
        let board = Blackboard::new();
        let points = vec![Vector3::new(2.0, 1.0, -1.0)];
        board.swap_waypoints(points.clone());

        let mut reproj = Reprojector::new();
        assert_eq!(
            reproj.apply(&edge(0, 1, [5.0, 5.0, 0.0], 1.0), &board),
            ReprojOutcome::Bootstrap
        );

        assert_eq!(*board.waypoints(), points);
        assert!(board.transact(|txn| txn.take_reframe()).is_none());
    }
}
