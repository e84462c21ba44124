//! # Relocalisation messages
//!
//! The estimator expresses the vehicle state relative to a reference node. When it creates a new
//! node it publishes the edge between the old and new node, followed by the new node's global
//! position.

use serde::{Deserialize, Serialize};

/// Rigid transform from one reference node to the next.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RelocEdge {
    /// Node the edge starts from. Node `0` is the bootstrap edge, carrying no motion.
    pub from_node_id: u64,

    /// Node the edge ends at.
    pub to_node_id: u64,

    /// Translation of the new node in the old node's frame.
    pub translation_m: [f64; 3],

    /// Rotation of the new node about the vertical axis.
    pub yaw_rad: f64,
}

/// Global position of a reference node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NodeGlobalPose {
    pub node_id: u64,

    /// Position of the node in the global frame, north-east-down.
    pub position_m: [f64; 3],
}
