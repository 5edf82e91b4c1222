//! Kaplan-Meier survival curves for groups of aggregated observations
//!
//! Each group of a result set is turned into a [`SurvivalCurve`]: the raw
//! observations are merged per time point, sorted, and fed through a fresh
//! [`SurvivalState`] seeded with the group's initial at-risk count. Groups
//! never interact here; comparing them is the job of the
//! [`log_rank`](crate::log_rank) module.
//!
//! # Examples
//!
//! ```
//! use survstat_stats::{
//!     curve::SurvivalCurves,
//!     observation::{GroupRawResult, RawTimePoint},
//! };
//!
//! let groups = vec![
//!     GroupRawResult::new("placebo", vec![RawTimePoint::new(10, 4, 2, 0)]),
//!     GroupRawResult::new("drug", vec![RawTimePoint::new(10, 4, 1, 0)]),
//! ];
//!
//! let curves = SurvivalCurves::build(&groups).unwrap();
//! assert_eq!(curves.group_ids().collect::<Vec<_>>(), vec!["placebo", "drug"]);
//!
//! let placebo = curves.find("placebo").unwrap();
//! assert_eq!(placebo.survival_at(9), 1.0);
//! assert_eq!(placebo.survival_at(10), 0.5);
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    InvalidSequence,
    observation::{GroupRawResult, RawTimePoint, aggregate_time_points},
    point::SurvivalPoint,
    state::SurvivalState,
};

/// A group's observations do not form a valid survival sequence.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid survival data in group '{group_id}'")]
pub struct BuildCurveError {
    pub group_id: String,
    pub source: InvalidSequence,
}

/// Kaplan-Meier survival curve of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalCurve {
    pub group_id: String,
    /// Steps of the curve, starting with the synthetic time-zero point.
    pub points: Vec<SurvivalPoint>,
}

impl SurvivalCurve {
    /// Computes the Kaplan-Meier curve of a single group.
    ///
    /// Observations sharing a time point are merged first, so the resulting
    /// curve has one point per distinct time plus the starting point.
    pub fn from_group(group: &GroupRawResult) -> Result<Self, BuildCurveError> {
        let observations = aggregate_time_points(&group.time_points);
        let initial_count = group
            .initial_count
            .or_else(|| observations.first().map(|p| p.at_risk))
            .unwrap_or(0);

        let mut state = SurvivalState::new(initial_count);
        let mut points = Vec::with_capacity(observations.len() + 1);
        points.push(state.current());

        for observation in &observations {
            let point = state
                .next(
                    observation.time_point,
                    observation.events,
                    observation.censorings,
                )
                .map_err(|source| BuildCurveError {
                    group_id: group.group_id.clone(),
                    source,
                })?;
            points.push(point);
        }

        log::debug!(
            "built survival curve for group '{}': {} subjects, {} time points",
            group.group_id,
            initial_count,
            observations.len()
        );

        Ok(Self {
            group_id: group.group_id.clone(),
            points,
        })
    }

    /// Subjects at risk at time zero.
    #[must_use]
    pub fn initial_count(&self) -> u64 {
        self.points.first().map_or(0, |p| p.at_risk)
    }

    /// The last step of the curve.
    #[must_use]
    pub fn last_point(&self) -> Option<&SurvivalPoint> {
        self.points.last()
    }

    /// Cumulative survival probability after the last observed time point.
    #[must_use]
    pub fn final_survival(&self) -> f64 {
        self.last_point().map_or(1.0, |p| p.cumul)
    }

    /// Returns the median survival time.
    ///
    /// The median survival time is the time at which the cumulative survival
    /// probability drops to or below 50%, linearly interpolated between the
    /// step before and the step reaching it. Returns `None` if the survival
    /// probability never reaches 50%.
    ///
    /// # Examples
    ///
    /// ```
    /// # use survstat_stats::{curve::SurvivalCurve, observation::{GroupRawResult, RawTimePoint}};
    /// let group = GroupRawResult::new(
    ///     "g",
    ///     vec![RawTimePoint::new(10, 4, 1, 0), RawTimePoint::new(20, 3, 2, 0)],
    /// );
    /// let curve = SurvivalCurve::from_group(&group).unwrap();
    /// // S(10) = 0.75, S(20) = 0.25
    /// let median = curve.median_survival().unwrap();
    /// assert!((median - 15.0).abs() < 1e-9);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn median_survival(&self) -> Option<f64> {
        let i = self.points.iter().position(|p| p.cumul <= 0.5)?;
        let current = &self.points[i];
        if i == 0 {
            return Some(current.time_point as f64);
        }

        let previous = &self.points[i - 1];
        let t0 = previous.time_point as f64;
        let t1 = current.time_point as f64;
        let s0 = previous.cumul;
        let s1 = current.cumul;
        Some(t0 + (0.5 - s0) / (s1 - s0) * (t1 - t0))
    }

    /// Returns the survival probability at a specific time.
    ///
    /// The curve is a step function: the probability stays constant between
    /// observed time points. Times before the first step give `1.0`, times
    /// after the last one give the last known probability.
    #[must_use]
    pub fn survival_at(&self, time: u64) -> f64 {
        self.points
            .iter()
            .skip(1)
            .take_while(|p| p.time_point <= time)
            .last()
            .map_or(1.0, |p| p.cumul)
    }

    /// Converts the observed steps back into raw observations.
    ///
    /// The synthetic starting point is skipped, so the result can be passed
    /// to the [`log_rank`](crate::log_rank) test.
    #[must_use]
    pub fn observations(&self) -> Vec<RawTimePoint> {
        self.points.iter().skip(1).map(RawTimePoint::from).collect()
    }
}

/// Survival curves of every group of a result set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SurvivalCurves {
    pub curves: Vec<SurvivalCurve>,
}

impl SurvivalCurves {
    /// Builds one curve per group, preserving the group order.
    pub fn build(groups: &[GroupRawResult]) -> Result<Self, BuildCurveError> {
        let curves = groups
            .iter()
            .map(SurvivalCurve::from_group)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { curves })
    }

    /// Returns the group identifiers in curve order.
    pub fn group_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.curves.iter().map(|c| c.group_id.as_str())
    }

    #[must_use]
    pub fn find(&self, group_id: &str) -> Option<&SurvivalCurve> {
        self.curves.iter().find(|c| c.group_id == group_id)
    }
}

/// Builds the survival curves of all groups.
///
/// Shorthand for [`SurvivalCurves::build`].
pub fn build_curves(groups: &[GroupRawResult]) -> Result<SurvivalCurves, BuildCurveError> {
    SurvivalCurves::build(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group() -> GroupRawResult {
        GroupRawResult::new(
            "sample",
            vec![
                RawTimePoint::new(6, 7, 1, 1),
                RawTimePoint::new(2, 10, 2, 0),
                RawTimePoint::new(4, 8, 0, 1),
                RawTimePoint::new(9, 5, 3, 0),
            ],
        )
    }

    #[test]
    fn test_empty_group_with_initial_count() {
        let group = GroupRawResult::new("empty", vec![]).with_initial_count(12);
        let curve = SurvivalCurve::from_group(&group).unwrap();
        assert_eq!(curve.points, vec![SurvivalPoint::zero(12)]);
        assert_eq!(curve.initial_count(), 12);
        assert_eq!(curve.final_survival(), 1.0);
        assert_eq!(curve.median_survival(), None);
        assert!(curve.observations().is_empty());
    }

    #[test]
    fn test_empty_group_without_initial_count() {
        let curve = SurvivalCurve::from_group(&GroupRawResult::new("empty", vec![])).unwrap();
        assert_eq!(curve.points, vec![SurvivalPoint::zero(0)]);
    }

    #[test]
    fn test_points_are_sorted_and_seeded_from_first_time_point() {
        let curve = SurvivalCurve::from_group(&sample_group()).unwrap();
        let times = curve.points.iter().map(|p| p.time_point).collect::<Vec<_>>();
        assert_eq!(times, vec![0, 2, 4, 6, 9]);
        assert_eq!(curve.initial_count(), 10);

        let at_risk = curve.points.iter().map(|p| p.at_risk).collect::<Vec<_>>();
        assert_eq!(at_risk, vec![10, 10, 8, 7, 5]);
        assert_eq!(curve.last_point().unwrap().remaining, 2);
    }

    #[test]
    fn test_explicit_initial_count_takes_precedence() {
        let group = sample_group().with_initial_count(20);
        let curve = SurvivalCurve::from_group(&group).unwrap();
        assert_eq!(curve.points[1].at_risk, 20);
        assert!((curve.points[1].prob - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_time_points_are_merged() {
        let group = GroupRawResult::new(
            "dup",
            vec![
                RawTimePoint::new(3, 4, 1, 0),
                RawTimePoint::new(3, 4, 1, 1),
                RawTimePoint::new(5, 5, 2, 0),
            ],
        );
        let curve = SurvivalCurve::from_group(&group).unwrap();
        assert_eq!(curve.points.len(), 3);
        assert_eq!(curve.initial_count(), 8);
        assert_eq!(curve.points[1].nof_events, 2);
        assert_eq!(curve.points[1].nof_censorings, 1);
        assert_eq!(curve.points[2].at_risk, 5);
    }

    #[test]
    fn test_over_removal_reports_group() {
        let group = GroupRawResult::new(
            "broken",
            vec![RawTimePoint::new(1, 2, 1, 0), RawTimePoint::new(2, 1, 3, 0)],
        );
        let err = SurvivalCurve::from_group(&group).unwrap_err();
        assert_eq!(err.group_id, "broken");
        assert_eq!(
            err.source,
            InvalidSequence::NegativeRemaining {
                time_point: 2,
                removed: 3,
                remaining: 1
            }
        );
        assert_eq!(err.to_string(), "invalid survival data in group 'broken'");
    }

    #[test]
    fn test_observation_at_time_zero_is_rejected() {
        let group = GroupRawResult::new(
            "early",
            vec![RawTimePoint::new(0, 5, 1, 0), RawTimePoint::new(3, 4, 1, 0)],
        );
        let err = SurvivalCurve::from_group(&group).unwrap_err();
        assert_eq!(err.group_id, "early");
        assert_eq!(
            err.source,
            InvalidSequence::NonIncreasingTime {
                time_point: 0,
                previous: 0
            }
        );
    }

    #[test]
    fn test_build_is_deterministic_under_permutation() {
        let group = sample_group();
        let mut shuffled = group.clone();
        shuffled.time_points.rotate_left(2);

        let a = build_curves(std::slice::from_ref(&group)).unwrap();
        let b = build_curves(std::slice::from_ref(&group)).unwrap();
        let c = build_curves(&[shuffled]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_groups_are_independent() {
        let groups = vec![
            sample_group(),
            GroupRawResult::new("other", vec![RawTimePoint::new(1, 3, 3, 0)]),
        ];
        let curves = build_curves(&groups).unwrap();
        assert_eq!(curves.curves.len(), 2);
        assert_eq!(
            curves.curves[0],
            SurvivalCurve::from_group(&groups[0]).unwrap()
        );
        assert_eq!(curves.find("other").unwrap().final_survival(), 0.0);
        assert!(curves.find("missing").is_none());
    }

    #[test]
    fn test_survival_at_step_function() {
        let curve = SurvivalCurve::from_group(&sample_group()).unwrap();
        assert_eq!(curve.survival_at(0), 1.0);
        assert_eq!(curve.survival_at(1), 1.0);
        assert!((curve.survival_at(2) - 0.8).abs() < 1e-12);
        assert!((curve.survival_at(3) - 0.8).abs() < 1e-12);
        assert_eq!(curve.survival_at(100), curve.final_survival());
    }

    #[test]
    fn test_median_survival_first_step() {
        let group = GroupRawResult::new("g", vec![RawTimePoint::new(8, 2, 1, 0)]);
        let curve = SurvivalCurve::from_group(&group).unwrap();
        // S drops from 1.0 at t=0 to 0.5 at t=8
        assert_eq!(curve.median_survival(), Some(8.0));
    }

    #[test]
    fn test_observations_round_trip() {
        let curve = SurvivalCurve::from_group(&sample_group()).unwrap();
        let rebuilt = SurvivalCurve::from_group(&GroupRawResult::new(
            "sample",
            curve.observations(),
        ))
        .unwrap();
        assert_eq!(curve, rebuilt);
    }
}
