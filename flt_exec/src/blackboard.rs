//! # Blackboard
//!
//! The state shared between the estimate loop and the input handlers. Everything lives behind a
//! single mutex, and every operation here is one acquisition of that mutex. Nothing is ever
//! called out of the board while it is locked.
//!
//! The estimate loop takes its whole per-sample decision inside [`Blackboard::transact`], so it
//! always sees a consistent snapshot. Handlers use the narrow mutators.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nalgebra::{Isometry3, Point3, Vector3};

use crate::flight_phase::FlightPhase;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Battery voltage assumed until the vehicle reports one.
pub const DEFAULT_BATT_VOLTAGE_V: f64 = 14.8;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An ordered list of waypoints in the controller frame.
///
/// Lists are immutable once built. Replacing one swaps the `Arc`, so a holder of the old list
/// keeps iterating a complete list.
pub type WaypointList = Arc<Vec<Vector3<f64>>>;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct GoalStatus {
    /// The controller reached the end of the current list.
    pub achieved: bool,

    /// A goal was announced and its path has not arrived yet.
    pub new_goal_pending: bool,
}

/// Result of swapping a new list into the board.
#[derive(Debug, Clone)]
pub struct SwapReport {
    /// The list as swapped in
    pub waypoints: WaypointList,

    /// The swap completed a goal and path pair, clearing `achieved`.
    pub goal_reset: bool,
}

/// Shared vehicle state.
#[derive(Debug, Default)]
pub struct Blackboard {
    state: Mutex<BoardState>,
}

/// Scoped access to the board for the duration of one [`Blackboard::transact`] call.
pub struct BoardTxn<'a> {
    state: &'a mut BoardState,
}

#[derive(Debug)]
struct BoardState {
    waypoints: WaypointList,
    new_list_available: bool,

    goal: GoalStatus,
    goal_position_m: Option<Vector3<f64>>,

    /// Incremented every time a goal and path pair clears `achieved`
    goal_epoch: u64,

    yaw_request_rad: Option<f64>,

    phase: FlightPhase,
    last_estimate_time_s: Option<f64>,

    batt_voltage_v: f64,
    node_global_z_m: f64,

    /// Position the vehicle was last told to hold at
    hold_target_m: Option<Vector3<f64>>,

    /// Frame shifts applied to the board but not yet handed to the controller, composed in order
    pending_reframe: Option<Isometry3<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for BoardState {
    fn default() -> Self {
        Self {
            waypoints: Arc::new(Vec::new()),
            new_list_available: false,
            goal: GoalStatus::default(),
            goal_position_m: None,
            goal_epoch: 0,
            yaw_request_rad: None,
            phase: FlightPhase::Grounded,
            last_estimate_time_s: None,
            batt_voltage_v: DEFAULT_BATT_VOLTAGE_V,
            node_global_z_m: 0.0,
            hold_target_m: None,
            pending_reframe: None,
        }
    }
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock. A handler that panicked while holding it cannot leave a half-written
    /// list behind, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the board.
    ///
    /// `f` must only read and write fields. It must not perform I/O or call the trajectory
    /// controller.
    pub fn transact<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut BoardTxn<'_>) -> R,
    {
        let mut guard = self.lock();
        let mut txn = BoardTxn { state: &mut guard };
        f(&mut txn)
    }

    /// Replace the waypoint list and raise the new list flag.
    ///
    /// If a new goal is pending this list is its path: `achieved` is cleared and the goal epoch
    /// advances.
    pub fn swap_waypoints(&self, waypoints: Vec<Vector3<f64>>) -> SwapReport {
        let waypoints = Arc::new(waypoints);
        let mut state = self.lock();

        state.waypoints = waypoints.clone();
        state.new_list_available = true;

        let goal_reset = state.goal.new_goal_pending;
        if goal_reset {
            state.goal = GoalStatus {
                achieved: false,
                new_goal_pending: false,
            };
            state.goal_epoch += 1;
        }

        SwapReport {
            waypoints,
            goal_reset,
        }
    }

    /// Record that a new goal was chosen, optionally with its position.
    pub fn signal_new_goal(&self, position_m: Option<Vector3<f64>>) {
        let mut state = self.lock();
        state.goal.new_goal_pending = true;
        state.goal_position_m = position_m;
    }

    /// Request a yaw override, replacing any request not yet consumed.
    pub fn request_yaw(&self, yaw_rad: f64) {
        self.lock().yaw_request_rad = Some(yaw_rad);
    }

    pub fn set_batt_voltage(&self, voltage_v: f64) {
        self.lock().batt_voltage_v = voltage_v;
    }

    pub fn set_node_global_z(&self, z_m: f64) {
        self.lock().node_global_z_m = z_m;
    }

    pub fn node_global_z(&self) -> f64 {
        self.lock().node_global_z_m
    }

    /// Move every standing position (waypoints, goal, hold target) into a new reference frame.
    ///
    /// `shift` is the pose of the new frame in the old one, so points are mapped through its
    /// inverse. The list is rebuilt and swapped rather than edited in place. The shift is also
    /// queued for the controller, composed after any shift it has not yet received.
    ///
    /// Returns the number of waypoints moved.
    pub fn apply_frame_shift(&self, shift: &Isometry3<f64>) -> usize {
        let mut state = self.lock();

        let moved: Vec<_> = state
            .waypoints
            .iter()
            .map(|p| shift_point(shift, p))
            .collect();
        let num_moved = moved.len();
        state.waypoints = Arc::new(moved);

        state.hold_target_m = state.hold_target_m.map(|p| shift_point(shift, &p));
        state.goal_position_m = state.goal_position_m.map(|p| shift_point(shift, &p));

        state.pending_reframe = Some(match state.pending_reframe {
            Some(prev) => prev * shift,
            None => *shift,
        });

        num_moved
    }

    /// Write the controller's verdict on the current goal back to the board.
    ///
    /// Ignored if a new goal and path pair arrived since `epoch` was read, so a fresh goal is
    /// never marked achieved by a decision made about the old one. Returns whether the write
    /// happened.
    pub fn write_back_achieved(&self, achieved: bool, epoch: u64) -> bool {
        let mut state = self.lock();

        if state.goal_epoch == epoch {
            state.goal.achieved = achieved;
            true
        } else {
            false
        }
    }

    pub fn waypoints(&self) -> WaypointList {
        self.lock().waypoints.clone()
    }

    pub fn waypoint_count(&self) -> usize {
        self.lock().waypoints.len()
    }

    pub fn goal_status(&self) -> GoalStatus {
        self.lock().goal
    }

    pub fn goal_position(&self) -> Option<Vector3<f64>> {
        self.lock().goal_position_m
    }

    pub fn yaw_request(&self) -> Option<f64> {
        self.lock().yaw_request_rad
    }

    pub fn phase(&self) -> FlightPhase {
        self.lock().phase
    }

    pub fn last_estimate_time(&self) -> Option<f64> {
        self.lock().last_estimate_time_s
    }

    pub fn batt_voltage(&self) -> f64 {
        self.lock().batt_voltage_v
    }

    pub fn hold_target(&self) -> Option<Vector3<f64>> {
        self.lock().hold_target_m
    }
}

impl<'a> BoardTxn<'a> {
    pub fn last_estimate_time(&self) -> Option<f64> {
        self.state.last_estimate_time_s
    }

    pub fn set_last_estimate_time(&mut self, time_s: f64) {
        self.state.last_estimate_time_s = Some(time_s);
    }

    pub fn phase(&self) -> FlightPhase {
        self.state.phase
    }

    pub fn phase_mut(&mut self) -> &mut FlightPhase {
        &mut self.state.phase
    }

    pub fn goal_status(&self) -> GoalStatus {
        self.state.goal
    }

    pub fn goal_epoch(&self) -> u64 {
        self.state.goal_epoch
    }

    /// Consume the pending yaw request, if any.
    pub fn take_yaw_request(&mut self) -> Option<f64> {
        self.state.yaw_request_rad.take()
    }

    /// Take the current list if it has not been handed out yet, clearing the new list flag.
    pub fn take_new_list(&mut self) -> Option<WaypointList> {
        if self.state.new_list_available {
            self.state.new_list_available = false;
            Some(self.state.waypoints.clone())
        } else {
            None
        }
    }

    /// Take the composed frame shift not yet handed to the controller.
    pub fn take_reframe(&mut self) -> Option<Isometry3<f64>> {
        self.state.pending_reframe.take()
    }

    pub fn batt_voltage(&self) -> f64 {
        self.state.batt_voltage_v
    }

    pub fn set_hold_target(&mut self, position_m: Vector3<f64>) {
        self.state.hold_target_m = Some(position_m);
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Express a point of the old frame in the frame reached by `shift`.
pub fn shift_point(shift: &Isometry3<f64>, point_m: &Vector3<f64>) -> Vector3<f64> {
    shift
        .inverse_transform_point(&Point3::from(*point_m))
        .coords
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::{Translation3, UnitQuaternion};
    use std::thread;

    fn line(len: usize) -> Vec<Vector3<f64>> {
        (0..len).map(|i| Vector3::new(i as f64, 0.0, -1.0)).collect()
    }

    #[test]
    fn test_defaults() {
        let board = Blackboard::new();

        assert_eq!(board.waypoint_count(), 0);
        assert_eq!(board.goal_status(), GoalStatus::default());
        assert_eq!(board.phase(), FlightPhase::Grounded);
        assert_eq!(board.last_estimate_time(), None);
        assert_eq!(board.yaw_request(), None);
        assert_eq!(board.batt_voltage(), DEFAULT_BATT_VOLTAGE_V);
    }

    #[test]
    fn test_swap_resets_goal_only_when_pending() {
        let board = Blackboard::new();

        // Achieve something
        board.swap_waypoints(line(2));
        assert!(board.write_back_achieved(true, 0));

        // A path with no goal announced leaves achieved alone
        let report = board.swap_waypoints(line(3));
        assert!(!report.goal_reset);
        assert!(board.goal_status().achieved);

        // Goal then path clears it and advances the epoch
        board.signal_new_goal(Some(Vector3::new(5.0, 0.0, -1.0)));
        assert!(board.goal_status().new_goal_pending);
        let report = board.swap_waypoints(line(4));
        assert!(report.goal_reset);
        assert_eq!(report.waypoints.len(), 4);
        assert_eq!(board.goal_status(), GoalStatus::default());
        assert_eq!(board.goal_position(), Some(Vector3::new(5.0, 0.0, -1.0)));

        // A verdict computed before the new goal is dropped
        assert!(!board.write_back_achieved(true, 0));
        assert!(!board.goal_status().achieved);
        assert!(board.write_back_achieved(true, 1));
    }

    #[test]
    fn test_take_new_list_once() {
        let board = Blackboard::new();
        board.swap_waypoints(line(3));

        let first = board.transact(|txn| txn.take_new_list());
        let second = board.transact(|txn| txn.take_new_list());

        assert_eq!(first.map(|l| l.len()), Some(3));
        assert!(second.is_none());
    }

    #[test]
    fn test_yaw_request_overwritten_then_consumed() {
        let board = Blackboard::new();
        board.request_yaw(0.5);
        board.request_yaw(-1.0);

        assert_eq!(board.transact(|txn| txn.take_yaw_request()), Some(-1.0));
        assert_eq!(board.yaw_request(), None);
    }

    #[test]
    fn test_frame_shift_moves_list_goal_and_hold() {
        let board = Blackboard::new();
        board.swap_waypoints(vec![Vector3::new(2.0, 0.0, -1.0)]);
        board.transact(|txn| txn.set_hold_target(Vector3::new(1.0, 1.0, -1.0)));
        board.signal_new_goal(Some(Vector3::new(3.0, 0.0, -1.0)));

        let shift = Isometry3::from_parts(
            Translation3::new(1.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2),
        );
        assert_eq!(board.apply_frame_shift(&shift), 1);

        assert!((board.waypoints()[0] - Vector3::new(0.0, -1.0, -1.0)).norm() < 1e-12);
        assert!((board.hold_target().unwrap() - Vector3::new(1.0, 0.0, -1.0)).norm() < 1e-12);
        assert!((board.goal_position().unwrap() - Vector3::new(0.0, -2.0, -1.0)).norm() < 1e-12);

        // Two shifts queue as one
        board.apply_frame_shift(&shift);
        let pending = board.transact(|txn| txn.take_reframe()).unwrap();
        assert!((pending.to_homogeneous() - (shift * shift).to_homogeneous()).norm() < 1e-12);
        assert!(board.transact(|txn| txn.take_reframe()).is_none());
    }

    #[test]
    fn test_concurrent_swap_is_atomic() {
        let board = Arc::new(Blackboard::new());
        board.swap_waypoints(line(3));

        let writer = {
            let board = board.clone();
            thread::spawn(move || {
                for i in 0..2000 {
                    board.swap_waypoints(line(if i % 2 == 0 { 10 } else { 3 }));
                }
            })
        };

        for _ in 0..2000 {
            let list = board.waypoints();
            assert!(list.len() == 3 || list.len() == 10);
            // Elements of a held list never change underneath the reader
            assert!(list.iter().enumerate().all(|(i, p)| p[0] == i as f64));

            let count = board.waypoint_count();
            assert!(count == 3 || count == 10);
        }

        writer.join().unwrap();
    }
}
