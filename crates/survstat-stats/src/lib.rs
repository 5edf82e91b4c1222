//! Non-parametric survival statistics over aggregated time-to-event counts.
//!
//! This crate turns per-time-point event and censoring counts into
//! Kaplan-Meier survival curves and compares two groups with the
//! Mantel-Haenszel log-rank test:
//!
//! - **Observations**: Raw per-time-point counts as delivered by data sources
//! - **Survival points**: One immutable step of a Kaplan-Meier curve
//! - **Survival state**: The estimator that produces the steps of one group
//! - **Survival curves**: Labeled curves built for every group of a result set
//! - **Log-rank test**: Two-group comparison returning a p-value
//! - **Chi-squared distribution**: CDF via the regularized incomplete gamma function
//!
//! # Modules
//!
//! - [`observation`]: Input records and duplicate time point aggregation
//! - [`point`]: The [`SurvivalPoint`](point::SurvivalPoint) record
//! - [`state`]: The [`SurvivalState`](state::SurvivalState) estimator
//! - [`curve`]: Curve building, median survival and step lookups
//! - [`log_rank`]: Risk-set merging and the log-rank statistic
//! - [`chi_squared`]: Chi-squared CDF and the incomplete gamma routines behind it
//!
//! # Examples
//!
//! ## Building survival curves
//!
//! ```
//! use survstat_stats::{
//!     curve::build_curves,
//!     observation::{GroupRawResult, RawTimePoint},
//! };
//!
//! let groups = vec![GroupRawResult::new(
//!     "treatment",
//!     vec![
//!         RawTimePoint::new(5, 10, 2, 0),
//!         RawTimePoint::new(9, 8, 1, 1),
//!     ],
//! )];
//!
//! let curves = build_curves(&groups).unwrap();
//! let points = &curves.curves[0].points;
//! assert_eq!(points.len(), 3);
//! assert_eq!(points[0].cumul, 1.0);
//! assert!((points[1].cumul - 0.8).abs() < 1e-12);
//! ```
//!
//! ## Comparing two groups
//!
//! ```
//! use survstat_stats::{log_rank::log_rank_test, observation::RawTimePoint};
//!
//! let group1 = [RawTimePoint::new(1, 2, 1, 0), RawTimePoint::new(2, 1, 1, 0)];
//! let group2 = [RawTimePoint::new(3, 2, 1, 0), RawTimePoint::new(4, 1, 1, 0)];
//!
//! let test = log_rank_test(&group1, &group2).unwrap();
//! assert!((test.chi_squared - 2.8824).abs() < 1e-4);
//! assert!((test.p_value - 0.08956).abs() < 1e-4);
//! ```
//!
//! ## Chi-squared tail probabilities
//!
//! ```
//! use survstat_stats::chi_squared::chi_squared_cdf;
//!
//! assert_eq!(chi_squared_cdf(0.0, 1.0), 0.0);
//! assert!((chi_squared_cdf(3.841_458_820_694_124, 1.0) - 0.95).abs() < 1e-9);
//! ```

pub mod chi_squared;
pub mod curve;
pub mod log_rank;
pub mod observation;
pub mod point;
pub mod state;

/// A time point sequence that cannot describe a shrinking risk set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum InvalidSequence {
    #[display("time point {time_point} does not follow previous time point {previous}")]
    NonIncreasingTime { time_point: u64, previous: u64 },
    #[display(
        "removing {removed} subjects at time point {time_point} exceeds the {remaining} still at risk"
    )]
    NegativeRemaining {
        time_point: u64,
        removed: u64,
        remaining: u64,
    },
}
