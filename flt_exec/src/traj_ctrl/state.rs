//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::*;
use crate::blackboard::shift_point;
use log::debug;
use std::sync::Arc;
use util::{
    maths::{clamp, wrap_pi},
    params,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Reference position controller.
pub struct PosCtrl {
    params: Params,

    flying: bool,

    /// Forward axis of the heading frame
    fwd_ctrl: PidController,

    /// Right axis of the heading frame
    right_ctrl: PidController,

    alt_ctrl: PidController,

    head_ctrl: PidController,

    /// The position currently being flown to or held
    target_m: Option<Vector3<f64>>,

    target_yaw_rad: Option<f64>,

    /// The list being followed
    waypoints: Option<WaypointList>,

    /// Index of the current target point within the list
    target_index: usize,

    achieved: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during initialisation of the module.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(params::LoadError),

    #[error("Invalid parameter: {0}")]
    InvalidParam(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PosCtrl {
    /// Intiailise the controller from a parameter file.
    pub fn init(params_path: &str) -> Result<Self, TrajCtrlError> {
        let params: Params = params::load(params_path).map_err(TrajCtrlError::ParamLoadError)?;

        Self::new(params)
    }

    pub fn new(params: Params) -> Result<Self, TrajCtrlError> {
        if !(params.nominal_batt_voltage_v > 0.0) {
            return Err(TrajCtrlError::InvalidParam("nominal_batt_voltage_v"));
        }
        if !(params.min_throttle <= params.max_throttle) {
            return Err(TrajCtrlError::InvalidParam("min_throttle"));
        }
        if !(params.waypoint_reached_m > 0.0) {
            return Err(TrajCtrlError::InvalidParam("waypoint_reached_m"));
        }

        Ok(Self {
            fwd_ctrl: PidController::new(params.horiz_k_p, params.horiz_k_i, params.horiz_k_d),
            right_ctrl: PidController::new(params.horiz_k_p, params.horiz_k_i, params.horiz_k_d),
            alt_ctrl: PidController::new(params.alt_k_p, params.alt_k_i, params.alt_k_d),
            head_ctrl: PidController::new(params.head_k_p, 0.0, 0.0),
            params,
            flying: false,
            target_m: None,
            target_yaw_rad: None,
            waypoints: None,
            target_index: 0,
            achieved: false,
        })
    }

    /// The position currently being flown to or held.
    pub fn target(&self) -> Option<Vector3<f64>> {
        self.target_m
    }

    fn start_list(&mut self, list: WaypointList) {
        debug!("Following a new list of {} waypoints", list.len());

        self.achieved = list.is_empty();
        self.target_index = 0;
        self.waypoints = Some(list);
    }

    /// Move the target along the list, skipping every waypoint already reached.
    fn advance(&mut self, position_m: &Vector3<f64>) -> bool {
        let list = match &self.waypoints {
            Some(l) => l.clone(),
            None => return self.achieved,
        };

        while self.target_index < list.len()
            && (list[self.target_index] - position_m).norm() < self.params.waypoint_reached_m
        {
            self.target_index += 1;
        }

        if self.target_index < list.len() {
            self.target_m = Some(list[self.target_index]);
        } else {
            if !self.achieved {
                debug!("End of waypoint list reached");
            }
            self.achieved = true;
            if let Some(last) = list.last() {
                self.target_m = Some(*last);
            }
        }

        self.achieved
    }

    fn demands(&mut self, input: &CtrlInput) -> ActDems {
        let position_m = input.est.position_m;
        let heading_rad = input.est.heading_rad();

        let target_m = *self.target_m.get_or_insert(position_m);
        let target_yaw_rad = *self.target_yaw_rad.get_or_insert(heading_rad);

        // Nothing accumulates on the ground
        let dt_s = if self.flying { input.dt_s } else { 0.0 };

        // Position error in the heading frame
        let err_m = target_m - position_m;
        let (sin_h, cos_h) = heading_rad.sin_cos();
        let err_fwd_m = cos_h * err_m.x + sin_h * err_m.y;
        let err_right_m = -sin_h * err_m.x + cos_h * err_m.y;

        let max_tilt = self.params.max_tilt_rad;

        // Nose down flies forward
        let pitch = -clamp(self.fwd_ctrl.get(err_fwd_m, dt_s), -max_tilt, max_tilt);
        let roll = clamp(self.right_ctrl.get(err_right_m, dt_s), -max_tilt, max_tilt);

        // Down is positive, so climbing is a negative error
        let batt_scale = if input.batt_voltage_v > 0.0 {
            self.params.nominal_batt_voltage_v / input.batt_voltage_v
        } else {
            1.0
        };
        let throttle = clamp(
            self.params.hover_throttle * batt_scale + self.alt_ctrl.get(-err_m.z, dt_s),
            self.params.min_throttle,
            self.params.max_throttle,
        );

        let max_yaw = self.params.max_yaw_rate_rads;
        let yaw = clamp(
            self.head_ctrl
                .get(wrap_pi(target_yaw_rad - heading_rad), dt_s),
            -max_yaw,
            max_yaw,
        );

        ActDems {
            pitch,
            roll,
            throttle,
            yaw,
        }
    }
}

impl TrajCtrl for PosCtrl {
    fn set_flying(&mut self, flying: bool) {
        if flying && !self.flying {
            self.fwd_ctrl.reset();
            self.right_ctrl.reset();
            self.alt_ctrl.reset();
            self.head_ctrl.reset();
        }
        self.flying = flying;
    }

    fn reframe(&mut self, shift: &Isometry3<f64>) {
        self.waypoints = self
            .waypoints
            .as_ref()
            .map(|l| Arc::new(l.iter().map(|p| shift_point(shift, p)).collect()));

        self.target_m = self.target_m.map(|p| shift_point(shift, &p));

        let shift_yaw_rad = shift.rotation.euler_angles().2;
        self.target_yaw_rad = self
            .target_yaw_rad
            .map(|y| wrap_pi(y - shift_yaw_rad));
    }

    fn proc(&mut self, input: &CtrlInput, request: CommandRequest) -> CtrlOutput {
        let achieved = match request {
            CommandRequest::Hover => None,
            CommandRequest::HoverWithOverride { point_m, yaw_rad } => {
                self.target_m = Some(point_m);
                self.target_yaw_rad = Some(yaw_rad);
                None
            }
            CommandRequest::WaypointFollow(list) => {
                if let Some(l) = list {
                    self.start_list(l);
                }
                Some(self.advance(&input.est.position_m))
            }
        };

        CtrlOutput {
            dems: self.demands(input),
            achieved,
        }
    }
}
