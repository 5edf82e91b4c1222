use serde::{Deserialize, Serialize};

use crate::observation::RawTimePoint;

/// One step of a Kaplan-Meier survival curve.
///
/// Every curve starts with a synthetic point at time zero (`prob = 1`,
/// `cumul = 1`, no events or censorings), followed by one point per
/// distinct observed time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurvivalPoint {
    /// Time of this step. `0` for the synthetic starting point.
    pub time_point: u64,
    /// Subjects at risk at this time point (`remaining` of the previous step).
    pub at_risk: u64,
    /// Subjects experiencing the event of interest at this time point.
    pub nof_events: u64,
    /// Subjects censored at this time point.
    pub nof_censorings: u64,
    /// Subjects still at risk right after this time point.
    pub remaining: u64,
    /// Conditional survival probability of this step, `1 - nof_events / at_risk`.
    pub prob: f64,
    /// Cumulative survival probability up to and including this step.
    pub cumul: f64,
    /// Events up to and including this step.
    pub cumul_events: u64,
    /// Censorings up to and including this step.
    pub cumul_censorings: u64,
    /// Greenwood estimate of the variance of `cumul`.
    pub variance: f64,
}

impl SurvivalPoint {
    /// Creates the synthetic time-zero point of a group with `initial_count` subjects.
    #[must_use]
    pub const fn zero(initial_count: u64) -> Self {
        Self {
            time_point: 0,
            at_risk: initial_count,
            nof_events: 0,
            nof_censorings: 0,
            remaining: initial_count,
            prob: 1.0,
            cumul: 1.0,
            cumul_events: 0,
            cumul_censorings: 0,
            variance: 0.0,
        }
    }

    /// Standard error of the cumulative survival probability.
    #[must_use]
    pub fn std_error(&self) -> f64 {
        self.variance.sqrt()
    }
}

impl From<&SurvivalPoint> for RawTimePoint {
    fn from(point: &SurvivalPoint) -> Self {
        Self {
            time_point: point.time_point,
            at_risk: point.at_risk,
            events: point.nof_events,
            censorings: point.nof_censorings,
        }
    }
}
