//! Discontinuity filtering and time step computation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

use super::{EstSource, Estimate};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Rejects samples whose position jumps too far from the previous one.
///
/// When the estimator relocalises it can deliver a pose in the new reference node before the
/// matching edge has reached the waypoints. Such samples show up as a position jump and must not
/// reach the controller.
#[derive(Debug, Clone)]
pub struct DiscontinuityFilter {
    source: EstSource,

    threshold_m: f64,

    /// Position of the previously received sample, accepted or not
    prev_position_m: Option<Vector3<f64>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FilterVerdict {
    Accept,

    /// The sample moved `jump_m` from its predecessor.
    Discard { jump_m: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DiscontinuityFilter {
    pub fn new(source: EstSource, threshold_m: f64) -> Self {
        Self {
            source,
            threshold_m,
            prev_position_m: None,
        }
    }

    /// Check a sample against its predecessor.
    ///
    /// Only the estimator source is filtered, motion capture has no reference node to switch.
    /// The first sample is always accepted.
    pub fn check(&mut self, est: &Estimate) -> FilterVerdict {
        let prev = self.prev_position_m.replace(est.position_m);

        if self.source != EstSource::Estimator {
            return FilterVerdict::Accept;
        }

        match prev {
            Some(p) => {
                let jump_m = (est.position_m - p).norm();
                if jump_m >= self.threshold_m {
                    FilterVerdict::Discard { jump_m }
                } else {
                    FilterVerdict::Accept
                }
            }
            None => FilterVerdict::Accept,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Time since the last accepted estimate.
///
/// Zero if there was no previous estimate, if the gap is longer than `stale_s`, or if the clock
/// went backwards.
pub fn elapsed_dt(last_s: Option<f64>, now_s: f64, stale_s: f64) -> f64 {
    match last_s {
        Some(t) => {
            let dt = now_s - t;
            if dt.is_finite() && dt >= 0.0 && dt <= stale_s {
                dt
            } else {
                0.0
            }
        }
        None => 0.0,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::est::test_estimate;

    #[test]
    fn test_small_steps_never_dropped() {
        let mut filter = DiscontinuityFilter::new(EstSource::Estimator, 0.20);

        let mut pos = 0.0;
        for i in 0..100 {
            pos += 0.199;
            let est = test_estimate(i as f64 * 0.01, pos, 0.0, -1.0);
            assert_eq!(filter.check(&est), FilterVerdict::Accept);
        }
    }

    #[test]
    fn test_single_step_dropped_once() {
        let mut filter = DiscontinuityFilter::new(EstSource::Estimator, 0.20);

        let samples = [
            test_estimate(0.0, 0.0, 0.0, -1.0),
            test_estimate(0.1, 0.05, 0.0, -1.0),
            test_estimate(0.2, 1.05, 0.0, -1.0),
            test_estimate(0.3, 1.10, 0.0, -1.0),
            test_estimate(0.4, 1.15, 0.0, -1.0),
        ];

        let verdicts: Vec<_> = samples.iter().map(|e| filter.check(e)).collect();

        assert_eq!(verdicts[0], FilterVerdict::Accept);
        assert_eq!(verdicts[1], FilterVerdict::Accept);
        assert!(matches!(verdicts[2], FilterVerdict::Discard { jump_m } if (jump_m - 1.0).abs() < 1e-9));
        assert_eq!(verdicts[3], FilterVerdict::Accept);
        assert_eq!(verdicts[4], FilterVerdict::Accept);
    }

    #[test]
    fn test_first_sample_and_truth_accepted() {
        let mut filter = DiscontinuityFilter::new(EstSource::Estimator, 0.20);
        assert_eq!(
            filter.check(&test_estimate(5.0, 100.0, 100.0, -100.0)),
            FilterVerdict::Accept
        );

        let mut filter = DiscontinuityFilter::new(EstSource::GroundTruth, 0.20);
        filter.check(&test_estimate(0.0, 0.0, 0.0, 0.0));
        assert_eq!(
            filter.check(&test_estimate(0.1, 3.0, 0.0, 0.0)),
            FilterVerdict::Accept
        );
    }

    #[test]
    fn test_elapsed_dt() {
        assert_eq!(elapsed_dt(None, 1234.5, 100.0), 0.0);
        assert_eq!(elapsed_dt(Some(10.0), 10.5, 100.0), 0.5);
        assert_eq!(elapsed_dt(Some(10.0), 110.0, 100.0), 100.0);
        assert_eq!(elapsed_dt(Some(10.0), 110.5, 100.0), 0.0);
        assert_eq!(elapsed_dt(Some(10.0), 9.0, 100.0), 0.0);
    }
}
