//! # Flight Executable Parameters
//!
//! This module provide parameters for the flight executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{est::EstSource, flight_phase::LiftoffRule, mode_disp::DispatchParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FltExecParams {
    /// The producer of estimates for this flight. Required.
    pub est_source: EstSource,

    /// Time to hover after liftoff before following waypoints
    #[serde(default = "default_hover_grace_s")]
    pub hover_grace_s: f64,

    /// Altitude to fly paths at, in the global north-east-down frame
    #[serde(default = "default_desired_global_z_m")]
    pub desired_global_z_m: f64,

    /// Minimum spacing of kept waypoints
    #[serde(default = "default_min_waypoint_spacing_m")]
    pub min_waypoint_spacing_m: f64,

    /// Estimator position jump above which a sample is discarded
    #[serde(default = "default_discontinuity_threshold_m")]
    pub discontinuity_threshold_m: f64,

    /// Altitude magnitude above which the estimator source counts as airborne
    #[serde(default = "default_liftoff_est_m")]
    pub liftoff_est_m: f64,

    /// Altitude below which the ground truth source counts as airborne
    #[serde(default = "default_liftoff_truth_m")]
    pub liftoff_truth_m: f64,

    /// Estimate gap beyond which the time step is reset
    #[serde(default = "default_stale_dt_s")]
    pub stale_dt_s: f64,

    /// Re-publish the simplified path of every plan
    #[serde(default = "default_republish_sparse_path")]
    pub republish_sparse_path: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamsError {
    #[error("{0} must be finite")]
    NotFinite(&'static str),

    #[error("{0} must be positive, found {1}")]
    NotPositive(&'static str, f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FltExecParams {
    /// Check every value is usable.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let finite = [
            ("hover_grace_s", self.hover_grace_s),
            ("desired_global_z_m", self.desired_global_z_m),
            ("min_waypoint_spacing_m", self.min_waypoint_spacing_m),
            ("discontinuity_threshold_m", self.discontinuity_threshold_m),
            ("liftoff_est_m", self.liftoff_est_m),
            ("liftoff_truth_m", self.liftoff_truth_m),
            ("stale_dt_s", self.stale_dt_s),
        ];
        for (name, value) in finite.iter() {
            if !value.is_finite() {
                return Err(ParamsError::NotFinite(*name));
            }
        }

        let positive = [
            ("min_waypoint_spacing_m", self.min_waypoint_spacing_m),
            ("discontinuity_threshold_m", self.discontinuity_threshold_m),
            ("liftoff_est_m", self.liftoff_est_m),
            ("stale_dt_s", self.stale_dt_s),
        ];
        for (name, value) in positive.iter() {
            if *value <= 0.0 {
                return Err(ParamsError::NotPositive(*name, *value));
            }
        }

        // A zero grace period is allowed
        if self.hover_grace_s < 0.0 {
            return Err(ParamsError::NotPositive("hover_grace_s", self.hover_grace_s));
        }

        Ok(())
    }

    /// The liftoff rule of the active source.
    pub fn liftoff_rule(&self) -> LiftoffRule {
        LiftoffRule {
            source: self.est_source,
            threshold_m: match self.est_source {
                EstSource::Estimator => self.liftoff_est_m,
                EstSource::GroundTruth => self.liftoff_truth_m,
            },
        }
    }

    pub fn dispatch_params(&self) -> DispatchParams {
        DispatchParams {
            liftoff: self.liftoff_rule(),
            hover_grace_s: self.hover_grace_s,
            stale_dt_s: self.stale_dt_s,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// DEFAULTS
// ------------------------------------------------------------------------------------------------

fn default_hover_grace_s() -> f64 {
    10.0
}

fn default_desired_global_z_m() -> f64 {
    -1.0
}

fn default_min_waypoint_spacing_m() -> f64 {
    0.3
}

fn default_discontinuity_threshold_m() -> f64 {
    0.20
}

fn default_liftoff_est_m() -> f64 {
    0.1
}

fn default_liftoff_truth_m() -> f64 {
    -0.29
}

fn default_stale_dt_s() -> f64 {
    100.0
}

fn default_republish_sparse_path() -> bool {
    true
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let p: FltExecParams = util::params::parse("est_source = \"estimator\"").unwrap();

        assert_eq!(p.est_source, EstSource::Estimator);
        assert_eq!(p.hover_grace_s, 10.0);
        assert_eq!(p.desired_global_z_m, -1.0);
        assert_eq!(p.discontinuity_threshold_m, 0.20);
        assert_eq!(p.stale_dt_s, 100.0);
        assert!(p.republish_sparse_path);
        assert_eq!(p.validate(), Ok(()));
        assert_eq!(p.liftoff_rule().threshold_m, 0.1);
    }

    #[test]
    fn test_source_required() {
        assert!(util::params::parse::<FltExecParams>("hover_grace_s = 5.0").is_err());
    }

    #[test]
    fn test_validate() {
        let mut p: FltExecParams = util::params::parse(
            "est_source = \"ground_truth\"\nmin_waypoint_spacing_m = 0.0",
        )
        .unwrap();
        assert_eq!(p.liftoff_rule().threshold_m, -0.29);
        assert_eq!(
            p.validate(),
            Err(ParamsError::NotPositive("min_waypoint_spacing_m", 0.0))
        );

        p.min_waypoint_spacing_m = 0.3;
        p.stale_dt_s = std::f64::NAN;
        assert_eq!(p.validate(), Err(ParamsError::NotFinite("stale_dt_s")));

        p.stale_dt_s = 100.0;
        p.hover_grace_s = 0.0;
        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn test_shipped_files() {
        let p: FltExecParams = util::params::parse(include_str!("../../params/flt_exec.toml")).unwrap();
        assert_eq!(p.validate(), Ok(()));

        let _: comms_if::net::NetParams =
            util::params::parse(include_str!("../../params/net.toml")).unwrap();

        let t: crate::traj_ctrl::Params =
            util::params::parse(include_str!("../../params/traj_ctrl.toml")).unwrap();
        assert!(crate::traj_ctrl::PosCtrl::new(t).is_ok());
    }
}
