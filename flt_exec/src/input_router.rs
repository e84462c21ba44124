//! # Input router
//!
//! Every input stream gets its own channel. The router takes messages off the subscriber socket
//! and forwards each to its channel, dropping those that belong to the inactive estimate source.
//! Only the estimate channel drives the control loop; the others are drained by their own handler
//! threads.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::mpsc::{channel, Receiver, Sender};

use comms_if::eqpt::{
    est,
    hex::HexStatus,
    plan::Plan,
    reloc::{NodeGlobalPose, RelocEdge},
    InputMsg,
};
use util::log_once;

use crate::est::EstSource;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sending half of the input streams.
pub struct InputRouter {
    source: EstSource,

    est_tx: Sender<est::Estimate>,
    plan_tx: Sender<Plan>,
    edge_tx: Sender<RelocEdge>,
    node_tx: Sender<NodeGlobalPose>,
    hex_tx: Sender<HexStatus>,
}

/// Receiving half of the input streams.
pub struct InputChannels {
    pub est_rx: Receiver<est::Estimate>,
    pub plan_rx: Receiver<Plan>,
    pub edge_rx: Receiver<RelocEdge>,
    pub node_rx: Receiver<NodeGlobalPose>,
    pub hex_rx: Receiver<HexStatus>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Routed,

    /// The message belongs to the estimate source not in use.
    InactiveSource,

    /// The handler of the named stream has stopped.
    HandlerGone(&'static str),

    /// The estimate loop has stopped, nothing more can be done with any input.
    EstimateLoopGone,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl InputRouter {
    pub fn route(&self, msg: InputMsg) -> RouteOutcome {
        let use_estimator = self.source == EstSource::Estimator;

        match msg {
            InputMsg::Estimate(e) if use_estimator => self.send_estimate(e),
            InputMsg::Truth(e) if !use_estimator => self.send_estimate(e),
            InputMsg::Estimate(_) => {
                log_once!(warn, "Estimator output received while flying on ground truth, ignoring it");
                RouteOutcome::InactiveSource
            }
            InputMsg::Truth(_) => {
                log_once!(warn, "Ground truth received while flying on the estimator, ignoring it");
                RouteOutcome::InactiveSource
            }

            // Ground truth has no node graph
            InputMsg::Edge(_) | InputMsg::NodeGlobal(_) if !use_estimator => {
                RouteOutcome::InactiveSource
            }
            InputMsg::Edge(e) => outcome(self.edge_tx.send(e).is_ok(), "edge"),
            InputMsg::NodeGlobal(n) => outcome(self.node_tx.send(n).is_ok(), "node"),

            InputMsg::Plan(p) => outcome(self.plan_tx.send(p).is_ok(), "plan"),
            InputMsg::Hex(h) => outcome(self.hex_tx.send(h).is_ok(), "hex"),
        }
    }

    fn send_estimate(&self, e: est::Estimate) -> RouteOutcome {
        match self.est_tx.send(e) {
            Ok(()) => RouteOutcome::Routed,
            Err(_) => RouteOutcome::EstimateLoopGone,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Create the channels of every input stream.
pub fn input_channels(source: EstSource) -> (InputRouter, InputChannels) {
    let (est_tx, est_rx) = channel();
    let (plan_tx, plan_rx) = channel();
    let (edge_tx, edge_rx) = channel();
    let (node_tx, node_rx) = channel();
    let (hex_tx, hex_rx) = channel();

    (
        InputRouter {
            source,
            est_tx,
            plan_tx,
            edge_tx,
            node_tx,
            hex_tx,
        },
        InputChannels {
            est_rx,
            plan_rx,
            edge_rx,
            node_rx,
            hex_rx,
        },
    )
}

fn outcome(sent: bool, stream: &'static str) -> RouteOutcome {
    if sent {
        RouteOutcome::Routed
    } else {
        RouteOutcome::HandlerGone(stream)
    }
}
