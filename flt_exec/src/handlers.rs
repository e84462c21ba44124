//! # Input handlers
//!
//! One thread per non-estimate input stream. Each drains its channel and applies the message to
//! the blackboard, finishing when the channel closes. None of them ever talk to the trajectory
//! controller or the actuation link.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Receiver,
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use comms_if::{
    eqpt::{
        hex::HexStatus,
        plan::Plan,
        reloc::{self, NodeGlobalPose},
    },
    tc::{Tc, TcResponse},
};
use log::{debug, info, warn};
use nalgebra::Vector3;
use util::session;

use crate::{
    blackboard::Blackboard,
    path_ingest::PathIngestor,
    path_pub::PathPublisher,
    reproj::{RelocEdge, ReprojOutcome, Reprojector},
    tc_client::{TcClient, TcClientError},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Archive path of ingested plans, timestamped on save
const PLAN_ARCHIVE_PATH: &str = "plans/plan.json";

/// Pause after a telecommand socket error before trying again
const TC_ERROR_BACKOFF: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The running handler threads.
#[derive(Default)]
pub struct Handlers {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, handle: JoinHandle<()>) {
        self.handles.push((name, handle));
    }

    /// Wait for every handler to finish.
    pub fn join(self) {
        for (name, handle) in self.handles {
            if handle.join().is_err() {
                warn!("The {} handler panicked", name);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Apply a telecommand to the blackboard.
///
/// Goals and yaw requests are always accepted. A yaw request replaces any request not yet
/// consumed.
pub fn handle_tc(tc: &Tc, board: &Blackboard) -> TcResponse {
    match *tc {
        Tc::NewGoal { x_m, y_m, z_m } => {
            info!("New goal at ({:.2}, {:.2}, {:.2})", x_m, y_m, z_m);
            board.signal_new_goal(Some(Vector3::new(x_m, y_m, z_m)));
        }
        Tc::RequestYaw { yaw_rad } => {
            info!("Yaw override to {:.3} rad requested", yaw_rad);
            board.request_yaw(yaw_rad);
        }
    }

    TcResponse::Ok
}

/// Ingest every plan, archive and optionally re-publish its simplified form.
pub fn spawn_plan_handler(
    rx: Receiver<Plan>,
    ingestor: PathIngestor,
    board: Arc<Blackboard>,
    path_pub: Option<PathPublisher>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("plan_handler".into())
        .spawn(move || {
            for plan in rx.iter() {
                let report = match ingestor.ingest(&plan, &board) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("Plan rejected: {}", e);
                        continue;
                    }
                };

                info!(
                    "New path of {} waypoints ({} poses planned)",
                    report.waypoints.len(),
                    report.raw_len
                );
                if report.goal_reset {
                    info!("Path received for the pending goal");
                }

                let sparse = report.to_sparse_path();
                if let Some(ref pp) = path_pub {
                    if let Err(e) = pp.publish(&sparse) {
                        warn!("Could not publish the simplified path: {}", e);
                    }
                }
                session::save_with_timestamp(PLAN_ARCHIVE_PATH, sparse);
            }
        })
}

/// Apply every relocalisation edge to the blackboard.
pub fn spawn_edge_handler(
    rx: Receiver<reloc::RelocEdge>,
    board: Arc<Blackboard>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("edge_handler".into())
        .spawn(move || {
            let mut reproj = Reprojector::new();

            for msg in rx.iter() {
                let edge = RelocEdge::from(&msg);

                if let ReprojOutcome::Applied { num_waypoints } = reproj.apply(&edge, &board) {
                    info!(
                        "Relocalised onto node {}, {} waypoints moved",
                        edge.to_node_id, num_waypoints
                    );
                    if let Some(goal_m) = board.goal_position() {
                        debug!("Goal now at {:?}", goal_m);
                    }
                    if let Some(hold_m) = board.hold_target() {
                        debug!("Holding at {:?}", hold_m);
                    }
                }
            }
        })
}

/// Track the altitude of the current reference node.
pub fn spawn_node_handler(
    rx: Receiver<NodeGlobalPose>,
    board: Arc<Blackboard>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("node_handler".into())
        .spawn(move || {
            for node in rx.iter() {
                debug!("Node {} at global z {:.3} m", node.node_id, node.position_m[2]);
                board.set_node_global_z(node.position_m[2]);
            }
        })
}

/// Track the battery voltage.
pub fn spawn_hex_handler(
    rx: Receiver<HexStatus>,
    board: Arc<Blackboard>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("hex_handler".into())
        .spawn(move || {
            for status in rx.iter() {
                board.set_batt_voltage(status.batt_voltage_v);
            }
        })
}

/// Serve telecommands until `stop` is raised.
pub fn spawn_tc_handler(
    client: TcClient,
    board: Arc<Blackboard>,
    stop: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("tc_handler".into())
        .spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                match client.receive_tc() {
                    Ok(Some(tc)) => {
                        let response = handle_tc(&tc, &board);
                        if let Err(e) = client.send_response(response) {
                            warn!("Could not respond to {:?}: {}", tc, e);
                        }
                    }
                    Ok(None) => (),
                    Err(e @ TcClientError::TcParseError(_)) => warn!("Invalid TC: {}", e),
                    Err(e) => {
                        warn!("TcClient error: {}", e);
                        thread::sleep(TC_ERROR_BACKOFF);
                    }
                }
            }
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_handle_tc() {
        let board = Blackboard::new();

        assert_eq!(
            handle_tc(
                &Tc::NewGoal {
                    x_m: 3.0,
                    y_m: 1.0,
                    z_m: -1.0
                },
                &board
            ),
            TcResponse::Ok
        );
        assert!(board.goal_status().new_goal_pending);
        assert_eq!(board.goal_position(), Some(Vector3::new(3.0, 1.0, -1.0)));

        assert_eq!(handle_tc(&Tc::RequestYaw { yaw_rad: 0.3 }, &board), TcResponse::Ok);
        assert_eq!(handle_tc(&Tc::RequestYaw { yaw_rad: -0.3 }, &board), TcResponse::Ok);
        assert_eq!(board.yaw_request(), Some(-0.3));
    }

    #[test]
    fn test_channel_handlers() {
        let board = Arc::new(Blackboard::new());
        let mut handlers = Handlers::new();

        let (plan_tx, plan_rx) = channel();
        let (edge_tx, edge_rx) = channel();
        let (node_tx, node_rx) = channel();
        let (hex_tx, hex_rx) = channel();

        handlers.push(
            "plan",
            spawn_plan_handler(plan_rx, PathIngestor::new(-1.0, 0.3), board.clone(), None)
                .unwrap(),
        );
        handlers.push("edge", spawn_edge_handler(edge_rx, board.clone()).unwrap());
        handlers.push("node", spawn_node_handler(node_rx, board.clone()).unwrap());
        handlers.push("hex", spawn_hex_handler(hex_rx, board.clone()).unwrap());

        hex_tx.send(HexStatus { batt_voltage_v: 12.6 }).unwrap();
        node_tx
            .send(NodeGlobalPose {
                node_id: 1,
                position_m: [0.0, 0.0, -0.5],
            })
            .unwrap();
        drop(hex_tx);
        drop(node_tx);

        // Wait for the node altitude to land before planning against it
        while board.node_global_z() != -0.5 {
            thread::yield_now();
        }

        plan_tx
            .send(Plan::from_xy(&[(0.0, 0.0), (0.05, 0.0), (1.0, 0.0)]))
            .unwrap();
        drop(plan_tx);
        while board.waypoint_count() == 0 {
            thread::yield_now();
        }

        edge_tx
            .send(reloc::RelocEdge {
                from_node_id: 1,
                to_node_id: 2,
                translation_m: [1.0, 0.0, 0.0],
                yaw_rad: 0.0,
            })
            .unwrap();
        drop(edge_tx);

        handlers.join();

        assert_eq!(board.batt_voltage(), 12.6);
        assert_eq!(
            *board.waypoints(),
            vec![Vector3::new(-1.0, 0.0, -0.5), Vector3::new(0.0, 0.0, -0.5)]
        );
    }
}
