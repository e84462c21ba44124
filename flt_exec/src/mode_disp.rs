//! # Mode dispatcher
//!
//! Decides, for every accepted estimate, whether the vehicle hovers or follows waypoints, and
//! calls the trajectory controller accordingly.
//!
//! The decision is taken in a single blackboard transaction. The controller is called after the
//! lock is released, and its verdict on the goal is written back in a second short transaction
//! which is skipped if a new goal arrived in the meantime.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use nalgebra::Isometry3;
use util::log_once;

use crate::{
    blackboard::Blackboard,
    est::{elapsed_dt, Estimate},
    flight_phase::{FlightPhase, LiftoffRule},
    traj_ctrl::{ActDems, CommandRequest, CtrlInput, TrajCtrl},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone)]
pub struct DispatchParams {
    pub liftoff: LiftoffRule,

    /// Time to hover after liftoff before following waypoints
    pub hover_grace_s: f64,

    /// Gap between estimates beyond which the time step is reset
    pub stale_dt_s: f64,
}

pub struct ModeDispatcher<C: TrajCtrl> {
    ctrl: C,

    params: DispatchParams,

    /// A non-empty list has been handed to the controller
    list_supplied: bool,

    /// The hold issued in place of an undefined waypoint target
    fallback_hold_issued: bool,
}

/// Result of one dispatch.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Dispatch {
    pub mode: FltMode,
    pub dt_s: f64,
    pub dems: ActDems,
}

/// Everything decided under the lock.
struct Decision {
    mode: FltMode,
    dt_s: f64,
    lifted_off: bool,
    request: CommandRequest,
    reframe: Option<Isometry3<f64>>,
    goal_epoch: u64,
    batt_voltage_v: f64,
    undefined_target: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FltMode {
    Hover,
    WaypointFollow,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C: TrajCtrl> ModeDispatcher<C> {
    pub fn new(ctrl: C, params: DispatchParams) -> Self {
        Self {
            ctrl,
            params,
            list_supplied: false,
            fallback_hold_issued: false,
        }
    }

    /// Decide the mode for an accepted estimate and run the controller.
    pub fn dispatch(&mut self, est: &Estimate, board: &Blackboard) -> Dispatch {
        let now_s = est.timestamp_s;
        let params = self.params;

        let decision = board.transact(|txn| {
            let dt_s = elapsed_dt(txn.last_estimate_time(), now_s, params.stale_dt_s);
            txn.set_last_estimate_time(now_s);

            let lifted_off = txn
                .phase_mut()
                .update(est.position_m.z, now_s, &params.liftoff);

            let goal = txn.goal_status();
            let mode = select_mode(txn.phase(), now_s, params.hover_grace_s, goal.achieved);

            let mut undefined_target = false;
            let request = match mode {
                FltMode::Hover => match txn.take_yaw_request() {
                    Some(yaw_rad) => {
                        txn.set_hold_target(est.position_m);
                        CommandRequest::HoverWithOverride {
                            point_m: est.position_m,
                            yaw_rad,
                        }
                    }
                    None => CommandRequest::Hover,
                },
                FltMode::WaypointFollow => match txn.take_new_list() {
                    Some(list) if !list.is_empty() => {
                        self.list_supplied = true;
                        CommandRequest::WaypointFollow(Some(list))
                    }
                    _ if self.list_supplied => CommandRequest::WaypointFollow(None),
                    _ => {
                        undefined_target = true;
                        if self.fallback_hold_issued {
                            CommandRequest::Hover
                        } else {
                            self.fallback_hold_issued = true;
                            txn.set_hold_target(est.position_m);
                            CommandRequest::HoverWithOverride {
                                point_m: est.position_m,
                                yaw_rad: est.heading_rad(),
                            }
                        }
                    }
                },
            };

            Decision {
                mode,
                dt_s,
                lifted_off,
                request,
                reframe: txn.take_reframe(),
                goal_epoch: txn.goal_epoch(),
                batt_voltage_v: txn.batt_voltage(),
                undefined_target,
            }
        });

        if decision.lifted_off {
            info!("Liftoff at {:.3} s", now_s);
            self.ctrl.set_flying(true);
        }
        if decision.undefined_target {
            log_once!(
                warn,
                "Waypoint following selected before any path was received, holding position"
            );
        }
        if decision.mode == FltMode::WaypointFollow {
            log_once!(info, "Waypoint control enabled");
        }

        if let Some(shift) = decision.reframe {
            self.ctrl.reframe(&shift);
        }

        let input = CtrlInput {
            est: *est,
            dt_s: decision.dt_s,
            batt_voltage_v: decision.batt_voltage_v,
        };
        let out = self.ctrl.proc(&input, decision.request);

        if let Some(achieved) = out.achieved {
            board.write_back_achieved(achieved, decision.goal_epoch);
        }

        Dispatch {
            mode: decision.mode,
            dt_s: decision.dt_s,
            dems: out.dems,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Select the flight mode.
///
/// Hover unless the vehicle has been flying for at least `hover_grace_s` and the current goal is
/// not yet achieved.
pub fn select_mode(phase: FlightPhase, now_s: f64, hover_grace_s: f64, achieved: bool) -> FltMode {
    match phase.flying_for(now_s) {
        // Inclusive bound: a sample landing exactly on the end of the grace window already
        // follows waypoints, so the handover happens on that sample and not one period later.
        Some(elapsed_s) if elapsed_s >= hover_grace_s && !achieved => FltMode::WaypointFollow,
        _ => FltMode::Hover,
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::{
        est::{test_estimate, EstSource},
        traj_ctrl::CtrlOutput,
    };
    use nalgebra::Vector3;
    use std::sync::{Arc, Mutex};

    /// Records every call made to it and reports a scripted verdict.
    #[derive(Default, Clone)]
    pub(crate) struct FakeCtrl {
        pub calls: Arc<Mutex<Vec<(CtrlInput, CommandRequest)>>>,
        pub flying: Arc<Mutex<Vec<bool>>>,
        pub reframes: Arc<Mutex<Vec<Isometry3<f64>>>>,
        pub verdict: Arc<Mutex<bool>>,
    }

    impl TrajCtrl for FakeCtrl {
        fn set_flying(&mut self, flying: bool) {
            self.flying.lock().unwrap().push(flying);
        }

        fn reframe(&mut self, shift: &Isometry3<f64>) {
            self.reframes.lock().unwrap().push(*shift);
        }

        fn proc(&mut self, input: &CtrlInput, request: CommandRequest) -> CtrlOutput {
            let achieved = match request {
                CommandRequest::WaypointFollow(_) => Some(*self.verdict.lock().unwrap()),
                _ => None,
            };
            self.calls.lock().unwrap().push((*input, request));

            CtrlOutput {
                dems: ActDems {
                    throttle: 0.5,
                    ..Default::default()
                },
                achieved,
            }
        }
    }

    impl FakeCtrl {
        pub fn last_request(&self) -> CommandRequest {
            self.calls.lock().unwrap().last().unwrap().1.clone()
        }
    }

    fn params(hover_grace_s: f64) -> DispatchParams {
        DispatchParams {
            liftoff: LiftoffRule {
                source: EstSource::Estimator,
                threshold_m: 0.1,
            },
            hover_grace_s,
            stale_dt_s: 100.0,
        }
    }

    fn line() -> Vec<Vector3<f64>> {
        vec![Vector3::new(0.0, 0.0, -1.0), Vector3::new(3.0, 0.0, -1.0)]
    }

    #[test]
    fn test_select_mode() {
        let flying = FlightPhase::Flying { since_s: 10.0 };

        assert_eq!(select_mode(FlightPhase::Grounded, 100.0, 5.0, false), FltMode::Hover);
        assert_eq!(select_mode(flying, 14.99, 5.0, false), FltMode::Hover);
        assert_eq!(select_mode(flying, 15.0, 5.0, false), FltMode::WaypointFollow);
        assert_eq!(select_mode(flying, 10.0, 0.0, false), FltMode::WaypointFollow);
        assert_eq!(select_mode(flying, 15.0, 5.0, true), FltMode::Hover);
    }

    #[test]
    fn test_grace_window() {
        let board = Blackboard::new();
        board.swap_waypoints(line());
        let ctrl = FakeCtrl::default();
        let mut disp = ModeDispatcher::new(ctrl.clone(), params(2.0));

        // Grounded
        let d = disp.dispatch(&test_estimate(0.0, 0.0, 0.0, 0.0), &board);
        assert_eq!(d.mode, FltMode::Hover);
        assert_eq!(d.dt_s, 0.0);
        assert!(ctrl.flying.lock().unwrap().is_empty());

        // Liftoff at t = 1
        let d = disp.dispatch(&test_estimate(1.0, 0.0, 0.0, -0.5), &board);
        assert_eq!(d.mode, FltMode::Hover);
        assert_eq!(d.dt_s, 1.0);
        assert_eq!(*ctrl.flying.lock().unwrap(), vec![true]);
        assert_eq!(board.phase(), FlightPhase::Flying { since_s: 1.0 });

        let d = disp.dispatch(&test_estimate(2.9, 0.0, 0.0, -0.5), &board);
        assert_eq!(d.mode, FltMode::Hover);
        assert_eq!(ctrl.last_request(), CommandRequest::Hover);

        // First sample with elapsed >= grace picks up the list
        let d = disp.dispatch(&test_estimate(3.0, 0.0, 0.0, -0.5), &board);
        assert_eq!(d.mode, FltMode::WaypointFollow);
        assert_eq!(
            ctrl.last_request(),
            CommandRequest::WaypointFollow(Some(Arc::new(line())))
        );

        // And then reuses it
        disp.dispatch(&test_estimate(3.1, 0.0, 0.0, -0.5), &board);
        assert_eq!(ctrl.last_request(), CommandRequest::WaypointFollow(None));

        // Only one liftoff notification
        assert_eq!(ctrl.flying.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_first_sample_dt_zero() {
        let board = Blackboard::new();
        let ctrl = FakeCtrl::default();
        let mut disp = ModeDispatcher::new(ctrl.clone(), params(0.0));

        let d = disp.dispatch(&test_estimate(123456.0, 0.0, 0.0, 0.0), &board);
        assert_eq!(d.dt_s, 0.0);
        assert_eq!(board.last_estimate_time(), Some(123456.0));

        // A long gap resets the time step
        let d = disp.dispatch(&test_estimate(123600.0, 0.0, 0.0, 0.0), &board);
        assert_eq!(d.dt_s, 0.0);
        assert_eq!(ctrl.calls.lock().unwrap()[1].0.dt_s, 0.0);
    }

    #[test]
    fn test_yaw_request_waits_for_hover() {
        let board = Blackboard::new();
        board.swap_waypoints(line());
        let ctrl = FakeCtrl::default();
        let mut disp = ModeDispatcher::new(ctrl.clone(), params(0.0));

        disp.dispatch(&test_estimate(0.0, 0.0, 0.0, -1.0), &board);
        assert_eq!(ctrl.last_request(), CommandRequest::WaypointFollow(Some(Arc::new(line()))));

        board.request_yaw(1.2);
        disp.dispatch(&test_estimate(0.1, 0.0, 0.0, -1.0), &board);
        assert_eq!(ctrl.last_request(), CommandRequest::WaypointFollow(None));
        assert_eq!(board.yaw_request(), Some(1.2));

        // Goal achieved, next decision hovers and consumes the request
        *ctrl.verdict.lock().unwrap() = true;
        disp.dispatch(&test_estimate(0.2, 0.0, 0.0, -1.0), &board);
        assert!(board.goal_status().achieved);

        disp.dispatch(&test_estimate(0.3, 0.5, 0.0, -1.0), &board);
        assert_eq!(
            ctrl.last_request(),
            CommandRequest::HoverWithOverride {
                point_m: Vector3::new(0.5, 0.0, -1.0),
                yaw_rad: 1.2
            }
        );
        assert_eq!(board.yaw_request(), None);
        assert_eq!(board.hold_target(), Some(Vector3::new(0.5, 0.0, -1.0)));

        disp.dispatch(&test_estimate(0.4, 0.5, 0.0, -1.0), &board);
        assert_eq!(ctrl.last_request(), CommandRequest::Hover);
    }

    #[test]
    fn test_undefined_target_holds_position() {
        let board = Blackboard::new();
        let ctrl = FakeCtrl::default();
        let mut disp = ModeDispatcher::new(ctrl.clone(), params(0.0));

        let d = disp.dispatch(&test_estimate(0.0, 1.0, 2.0, -1.0), &board);
        assert_eq!(d.mode, FltMode::WaypointFollow);
        assert_eq!(
            ctrl.last_request(),
            CommandRequest::HoverWithOverride {
                point_m: Vector3::new(1.0, 2.0, -1.0),
                yaw_rad: 0.0
            }
        );

        disp.dispatch(&test_estimate(0.1, 1.1, 2.0, -1.0), &board);
        assert_eq!(ctrl.last_request(), CommandRequest::Hover);

        // An empty list does not count as a target
        board.swap_waypoints(Vec::new());
        disp.dispatch(&test_estimate(0.2, 1.1, 2.0, -1.0), &board);
        assert_eq!(ctrl.last_request(), CommandRequest::Hover);

        board.swap_waypoints(line());
        disp.dispatch(&test_estimate(0.3, 1.1, 2.0, -1.0), &board);
        assert_eq!(
            ctrl.last_request(),
            CommandRequest::WaypointFollow(Some(Arc::new(line())))
        );
    }

    /// Reaches the end of its list while a new goal and path land on the board.
    struct RacingCtrl {
        board: Arc<Blackboard>,
    }

    impl TrajCtrl for RacingCtrl {
        fn set_flying(&mut self, _flying: bool) {}

        fn reframe(&mut self, _shift: &Isometry3<f64>) {}

        fn proc(&mut self, _input: &CtrlInput, _request: CommandRequest) -> CtrlOutput {
            self.board.signal_new_goal(None);
            self.board.swap_waypoints(line());

            CtrlOutput {
                dems: ActDems::default(),
                achieved: Some(true),
            }
        }
    }

    #[test]
    fn test_stale_verdict_not_written_back() {
        let board = Arc::new(Blackboard::new());
        board.swap_waypoints(line());
        let mut disp = ModeDispatcher::new(
            RacingCtrl {
                board: board.clone(),
            },
            params(0.0),
        );

        let d = disp.dispatch(&test_estimate(0.0, 0.0, 0.0, -1.0), &board);
        assert_eq!(d.mode, FltMode::WaypointFollow);
        assert!(!board.goal_status().achieved);

        // Without a racing goal the verdict lands
        assert!(board.write_back_achieved(true, 1));
        assert!(board.goal_status().achieved);
    }

    #[test]
    fn test_reframe_reaches_controller_before_proc() {
        let board = Blackboard::new();
        let ctrl = FakeCtrl::default();
        let mut disp = ModeDispatcher::new(ctrl.clone(), params(0.0));

        let shift = Isometry3::translation(1.0, 0.0, 0.0);
        board.apply_frame_shift(&shift);
        disp.dispatch(&test_estimate(0.0, 0.0, 0.0, 0.0), &board);
        disp.dispatch(&test_estimate(0.1, 0.0, 0.0, 0.0), &board);

        assert_eq!(*ctrl.reframes.lock().unwrap(), vec![shift]);
    }
}
