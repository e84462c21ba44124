//! # Trajectory controllers module
//!
//! This module provides the PID controllers used for TrajCtrl.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral: 0f64,
            prev_error: None,
        }
    }

    /// Get the value of the controller for the given error.
    ///
    /// `dt_s` is the time since the previous call. A zero time step contributes nothing to the
    /// integral or derivative terms, so the first call after a stale clock is purely
    /// proportional.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        let deriv = match self.prev_error {
            Some(e) if dt_s > 0.0 => (error - e) / dt_s,
            _ => 0f64,
        };

        self.integral += error * dt_s;

        // Remember the previous error
        self.prev_error = Some(error);

        self.k_p * error + self.k_i * self.integral + self.k_d * deriv
    }

    /// Forget the accumulated integral and the previous error.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pid_terms() {
        let mut pid = PidController::new(2.0, 0.5, 0.1);

        // No history and no time step, so only P
        assert!((pid.get(1.0, 0.0) - 2.0).abs() < 1e-12);

        // P = 2 * 0.5, I = 0.5 * (0.5 * 0.1), D = 0.1 * (0.5 - 1.0) / 0.1
        assert!((pid.get(0.5, 0.1) - (1.0 + 0.025 - 0.5)).abs() < 1e-12);

        pid.reset();
        assert!((pid.get(-1.0, 0.1) - (-2.0 - 0.05)).abs() < 1e-12);
    }
}
