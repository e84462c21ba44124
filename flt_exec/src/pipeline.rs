//! # Estimate pipeline
//!
//! The real-time path: filter the estimate, dispatch the mode and publish the resulting command.
//! This is the only caller of the trajectory controller and the actuation link.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{mpsc::Receiver, Arc};

use comms_if::eqpt::{act::ActCmd, est as wire};
use log::{trace, warn};
use util::log_once;

use crate::{
    blackboard::Blackboard,
    cmd_pub::{ActTransport, CmdPublisher, PublishError},
    est::{DiscontinuityFilter, EstSource, Estimate, FilterVerdict},
    mode_disp::ModeDispatcher,
    traj_ctrl::TrajCtrl,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// While publishing keeps failing, only one in this many failures is logged
const PUBLISH_FAILURE_LOG_INTERVAL: u64 = 100;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct EstPipeline<C: TrajCtrl, T: ActTransport> {
    source: EstSource,

    filter: DiscontinuityFilter,

    dispatcher: ModeDispatcher<C>,

    publisher: CmdPublisher<T>,

    board: Arc<Blackboard>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C: TrajCtrl, T: ActTransport> EstPipeline<C, T> {
    pub fn new(
        source: EstSource,
        filter: DiscontinuityFilter,
        dispatcher: ModeDispatcher<C>,
        publisher: CmdPublisher<T>,
        board: Arc<Blackboard>,
    ) -> Self {
        Self {
            source,
            filter,
            dispatcher,
            publisher,
            board,
        }
    }

    /// Process one estimate, returning the command if one was sent.
    ///
    /// A discarded estimate changes nothing and sends nothing.
    pub fn on_estimate(&mut self, msg: &wire::Estimate) -> Option<ActCmd> {
        let est = Estimate::from_msg(msg, self.source);

        if let FilterVerdict::Discard { jump_m } = self.filter.check(&est) {
            trace!(
                "Estimate at {:.3} s discarded, jumped {:.3} m",
                est.timestamp_s,
                jump_m
            );
            return None;
        }

        log_once!(info, "Estimates received, in-the-loop control active");

        let dispatch = self.dispatcher.dispatch(&est, &self.board);
        trace!("{:?} at {:.3} s", dispatch.mode, est.timestamp_s);

        match self.publisher.publish(&dispatch.dems, est.timestamp_s) {
            Ok(cmd) => Some(cmd),
            Err(e @ PublishError::SendFailed { .. }) => {
                let n = self.publisher.num_consec_failures();
                if n == 1 || n % PUBLISH_FAILURE_LOG_INTERVAL == 0 {
                    warn!("{}", e);
                }
                None
            }
        }
    }

    /// Process estimates until the channel closes.
    ///
    /// Only the newest queued estimate is processed. Older ones are dropped unseen, so a slow
    /// cycle never builds a backlog of stale commands and tiny time steps.
    pub fn run(&mut self, rx: Receiver<wire::Estimate>) {
        while let Ok(msg) = rx.recv() {
            let (msg, num_skipped) = newest(msg, &rx);
            if num_skipped > 0 {
                trace!("Skipped {} stale estimates", num_skipped);
            }
            self.on_estimate(&msg);
        }
    }

    pub fn publisher(&self) -> &CmdPublisher<T> {
        &self.publisher
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Drain the queue behind `first`, returning the newest message and how many were skipped.
fn newest<T>(first: T, rx: &Receiver<T>) -> (T, usize) {
    rx.try_iter()
        .fold((first, 0), |(_, num_skipped), msg| (msg, num_skipped + 1))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cmd_pub::test::RecordingTransport,
        flight_phase::LiftoffRule,
        mode_disp::{test::FakeCtrl, DispatchParams},
    };
    use std::sync::mpsc::channel;

    fn pipeline(
        board: Arc<Blackboard>,
    ) -> (EstPipeline<FakeCtrl, RecordingTransport>, FakeCtrl, RecordingTransport) {
        let ctrl = FakeCtrl::default();
        let transport = RecordingTransport::default();

        let dispatcher = ModeDispatcher::new(
            ctrl.clone(),
            DispatchParams {
                liftoff: LiftoffRule {
                    source: EstSource::Estimator,
                    threshold_m: 0.1,
                },
                hover_grace_s: 10.0,
                stale_dt_s: 100.0,
            },
        );

        (
            EstPipeline::new(
                EstSource::Estimator,
                DiscontinuityFilter::new(EstSource::Estimator, 0.20),
                dispatcher,
                CmdPublisher::new(transport.clone()),
                board,
            ),
            ctrl,
            transport,
        )
    }

    fn msg(timestamp_s: f64, x: f64) -> wire::Estimate {
        wire::Estimate {
            timestamp_s,
            position_m: [x, 0.0, -1.0],
            attitude_q: [1.0, 0.0, 0.0, 0.0],
            velocity_ms: [0.0; 3],
        }
    }

    #[test]
    fn test_jump_dropped_without_side_effects() {
        let board = Arc::new(Blackboard::new());
        let (mut pipe, ctrl, transport) = pipeline(board.clone());

        assert!(pipe.on_estimate(&msg(1.0, 0.0)).is_some());
        assert!(pipe.on_estimate(&msg(1.1, 0.1)).is_some());

        // Relocalisation glitch
        assert!(pipe.on_estimate(&msg(1.2, 2.1)).is_none());
        assert_eq!(board.last_estimate_time(), Some(1.1));
        assert_eq!(ctrl.calls.lock().unwrap().len(), 2);
        assert_eq!(transport.sent.lock().unwrap().len(), 2);

        let cmd = pipe.on_estimate(&msg(1.3, 2.15)).unwrap();
        assert_eq!(cmd.timestamp_s, 1.3);
        assert_eq!(cmd.throttle, 0.5);

        // The time step spans the dropped sample
        let calls = ctrl.calls.lock().unwrap();
        assert!((calls[2].0.dt_s - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_publish_failure_not_fatal() {
        let board = Arc::new(Blackboard::new());
        let (mut pipe, ctrl, transport) = pipeline(board.clone());

        *transport.fail.lock().unwrap() = true;
        assert!(pipe.on_estimate(&msg(1.0, 0.0)).is_none());
        assert!(pipe.on_estimate(&msg(1.1, 0.0)).is_none());
        assert_eq!(pipe.publisher().num_consec_failures(), 2);

        *transport.fail.lock().unwrap() = false;
        assert!(pipe.on_estimate(&msg(1.2, 0.0)).is_some());

        // Control ran on every sample regardless
        assert_eq!(ctrl.calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_run_skips_to_newest() {
        let board = Arc::new(Blackboard::new());
        let (mut pipe, ctrl, transport) = pipeline(board.clone());

        // The loop fell behind while 5000 estimates arrived
        let (tx, rx) = channel();
        for i in 0..5000 {
            tx.send(msg(i as f64 * 0.01, 0.0)).unwrap();
        }
        drop(tx);

        pipe.run(rx);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let newest_s = 4999.0 * 0.01;
        assert_eq!(sent[0].timestamp_s, newest_s);
        assert_eq!(ctrl.calls.lock().unwrap().len(), 1);
        assert_eq!(board.last_estimate_time(), Some(newest_s));
    }

    #[test]
    fn test_run_keeps_pace() {
        let board = Arc::new(Blackboard::new());
        let (mut pipe, _ctrl, transport) = pipeline(board.clone());

        // Estimates arrive one at a time, each is processed before the next
        let (tx, rx) = channel();
        let producer = std::thread::spawn(move || {
            for i in 0..5 {
                tx.send(msg(i as f64 * 0.01, 0.0)).unwrap();
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
        });

        pipe.run(rx);
        producer.join().unwrap();

        assert_eq!(transport.sent.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_newest() {
        let (tx, rx) = channel();
        assert_eq!(newest(0, &rx), (0, 0));

        for i in 1..=3 {
            tx.send(i).unwrap();
        }
        assert_eq!(newest(0, &rx), (3, 3));
        assert!(rx.try_recv().is_err());
    }
}
