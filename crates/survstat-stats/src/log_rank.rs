//! Mantel-Haenszel log-rank test for two groups
//!
//! The test compares the events observed in group 1 with the events expected
//! if both groups shared the same survival distribution. It works in two
//! passes:
//!
//! 1. **Risk-set merge**: each group's observations are aggregated per time
//!    point and sorted, then both lists are scanned together in ascending
//!    time order. The combined risk set starts with the sum of both groups'
//!    initial at-risk counts and shrinks after every distinct time point by
//!    the events and censorings of both groups at that time. Events and
//!    censorings sharing a time are treated as simultaneous.
//! 2. **Accumulation**: every time point with at least one event adds its
//!    observed-minus-expected difference and hypergeometric variance.
//!
//! The statistic `(O - E)^2 / V` follows a chi-squared distribution with one
//! degree of freedom under the null hypothesis.
//!
//! # Examples
//!
//! ```
//! use survstat_stats::{log_rank::log_rank_p_value, observation::RawTimePoint};
//!
//! let group = [RawTimePoint::new(2, 10, 3, 1), RawTimePoint::new(5, 6, 2, 0)];
//!
//! // A group compared with itself shows no difference.
//! assert_eq!(log_rank_p_value(&group, &group).unwrap(), 1.0);
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    InvalidSequence,
    chi_squared::chi_squared_cdf,
    observation::{RawTimePoint, aggregate_time_points},
};

/// One distinct time point of the combined risk set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskSetEntry {
    pub time_point: u64,
    /// Subjects of both groups at risk at this time point.
    pub at_risk: u64,
    /// Events of both groups at this time point.
    pub events: u64,
    /// Censorings of both groups at this time point.
    pub censorings: u64,
    /// Aggregated observation of group 1, if it reported this time point.
    pub group1: Option<RawTimePoint>,
    /// Aggregated observation of group 2, if it reported this time point.
    pub group2: Option<RawTimePoint>,
}

impl RiskSetEntry {
    /// Subjects of group 1 at risk at this time point.
    ///
    /// When group 1 did not report this time point, its share is inferred
    /// as the combined risk set minus group 2's at-risk count.
    #[must_use]
    pub fn group1_at_risk(&self) -> i128 {
        match (self.group1, self.group2) {
            (Some(g1), _) => i128::from(g1.at_risk),
            (None, g2) => i128::from(self.at_risk) - i128::from(g2.map_or(0, |p| p.at_risk)),
        }
    }

    /// Events of group 1 at this time point.
    #[must_use]
    pub fn group1_events(&self) -> u64 {
        self.group1.map_or(0, |p| p.events)
    }
}

/// Builds the combined risk set of two groups.
///
/// Returns one entry per distinct time point of either group, in ascending
/// time order. Fails when the events and censorings at some time point
/// exceed the combined subjects still at risk.
///
/// # Examples
///
/// ```
/// use survstat_stats::{log_rank::merge_risk_sets, observation::RawTimePoint};
///
/// let group1 = [RawTimePoint::new(1, 2, 1, 0), RawTimePoint::new(3, 1, 1, 0)];
/// let group2 = [RawTimePoint::new(2, 3, 0, 1), RawTimePoint::new(3, 2, 1, 0)];
///
/// let risk_set = merge_risk_sets(&group1, &group2).unwrap();
/// let summary = risk_set
///     .iter()
///     .map(|e| (e.time_point, e.at_risk, e.events))
///     .collect::<Vec<_>>();
/// assert_eq!(summary, vec![(1, 5, 1), (2, 4, 0), (3, 3, 2)]);
/// ```
pub fn merge_risk_sets(
    group1: &[RawTimePoint],
    group2: &[RawTimePoint],
) -> Result<Vec<RiskSetEntry>, InvalidSequence> {
    let group1 = aggregate_time_points(group1);
    let group2 = aggregate_time_points(group2);

    let initial_at_risk = |group: &[RawTimePoint]| group.first().map_or(0, |p| p.at_risk);
    let mut at_risk = initial_at_risk(&group1).saturating_add(initial_at_risk(&group2));

    let mut entries = Vec::with_capacity(group1.len() + group2.len());
    let mut rest1 = group1.as_slice();
    let mut rest2 = group2.as_slice();

    loop {
        let (time_point, g1, g2) = match (rest1.split_first(), rest2.split_first()) {
            (None, None) => break,
            (Some((p1, tail1)), None) => {
                rest1 = tail1;
                (p1.time_point, Some(*p1), None)
            }
            (None, Some((p2, tail2))) => {
                rest2 = tail2;
                (p2.time_point, None, Some(*p2))
            }
            (Some((p1, tail1)), Some((p2, tail2))) => match p1.time_point.cmp(&p2.time_point) {
                Ordering::Less => {
                    rest1 = tail1;
                    (p1.time_point, Some(*p1), None)
                }
                Ordering::Greater => {
                    rest2 = tail2;
                    (p2.time_point, None, Some(*p2))
                }
                Ordering::Equal => {
                    rest1 = tail1;
                    rest2 = tail2;
                    (p1.time_point, Some(*p1), Some(*p2))
                }
            },
        };

        // A removal count that does not fit in u64 exceeds any pool.
        let overflow = InvalidSequence::NegativeRemaining {
            time_point,
            removed: u64::MAX,
            remaining: at_risk,
        };
        let sum = |count: fn(&RawTimePoint) -> u64| {
            g1.as_ref()
                .map_or(0, count)
                .checked_add(g2.as_ref().map_or(0, count))
        };
        let events = sum(|p| p.events).ok_or(overflow)?;
        let censorings = sum(|p| p.censorings).ok_or(overflow)?;
        let removed = events.checked_add(censorings).ok_or(overflow)?;
        let remaining = at_risk
            .checked_sub(removed)
            .ok_or(InvalidSequence::NegativeRemaining {
                time_point,
                removed,
                remaining: at_risk,
            })?;

        entries.push(RiskSetEntry {
            time_point,
            at_risk,
            events,
            censorings,
            group1: g1,
            group2: g2,
        });
        at_risk = remaining;
    }

    Ok(entries)
}

/// Outcome of a log-rank test between two groups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRankTest {
    /// Events observed in group 1 at contributing time points.
    pub observed: f64,
    /// Events expected in group 1 under the null hypothesis.
    pub expected: f64,
    /// Sum of the per-time-point `observed - expected` differences.
    pub observed_minus_expected: f64,
    /// Hypergeometric variance of `observed - expected`.
    pub variance: f64,
    /// The log-rank statistic `(O - E)^2 / V`.
    pub chi_squared: f64,
    /// Probability of a statistic at least as extreme under the null hypothesis.
    pub p_value: f64,
    /// Number of time points with at least one event.
    pub event_time_points: usize,
}

impl LogRankTest {
    /// Degrees of freedom of the two-group statistic.
    pub const DEGREES_OF_FREEDOM: f64 = 1.0;

    /// Runs the test on the raw observations of two groups.
    pub fn compute(
        group1: &[RawTimePoint],
        group2: &[RawTimePoint],
    ) -> Result<Self, InvalidSequence> {
        let risk_set = merge_risk_sets(group1, group2)?;
        Ok(Self::from_risk_set(&risk_set))
    }

    /// Accumulates the statistic over an already merged risk set.
    ///
    /// Time points without events do not contribute. The variance term of a
    /// time point is zero when at most one subject is at risk or when every
    /// subject at risk belongs to group 1. The statistic is zero whenever
    /// `observed - expected` is exactly zero, even with a zero variance.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_risk_set(risk_set: &[RiskSetEntry]) -> Self {
        let mut observed = 0.0;
        let mut expected = 0.0;
        let mut observed_minus_expected = 0.0;
        let mut variance = 0.0;
        let mut event_time_points = 0;

        for entry in risk_set.iter().filter(|e| e.events > 0) {
            let n1_count = entry.group1_at_risk();
            let n = entry.at_risk as f64;
            let d = entry.events as f64;
            let n1 = n1_count as f64;
            let e1 = entry.group1_events() as f64;

            let expected_here = n1 * d / n;
            observed += e1;
            expected += expected_here;
            observed_minus_expected += e1 - expected_here;

            if entry.at_risk > 1 && n1_count != i128::from(entry.at_risk) {
                variance += n1 * (d / n) * (n - d) * (n - n1) / (n * (n - 1.0));
            }
            event_time_points += 1;
        }

        let chi_squared = if observed_minus_expected == 0.0 {
            0.0
        } else {
            observed_minus_expected * observed_minus_expected / variance
        };
        let p_value = 1.0 - chi_squared_cdf(chi_squared, Self::DEGREES_OF_FREEDOM);

        log::debug!(
            "log-rank: O - E = {observed_minus_expected}, variance = {variance}, chi-squared = {chi_squared}, p = {p_value}"
        );

        Self {
            observed,
            expected,
            observed_minus_expected,
            variance,
            chi_squared,
            p_value,
            event_time_points,
        }
    }
}

/// Runs the log-rank test on the raw observations of two groups.
///
/// Shorthand for [`LogRankTest::compute`].
pub fn log_rank_test(
    group1: &[RawTimePoint],
    group2: &[RawTimePoint],
) -> Result<LogRankTest, InvalidSequence> {
    LogRankTest::compute(group1, group2)
}

/// Returns only the p-value of the log-rank test between two groups.
pub fn log_rank_p_value(
    group1: &[RawTimePoint],
    group2: &[RawTimePoint],
) -> Result<f64, InvalidSequence> {
    LogRankTest::compute(group1, group2).map(|test| test.p_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {expected}, got {actual}"
        );
    }

    fn disjoint_groups() -> ([RawTimePoint; 2], [RawTimePoint; 2]) {
        (
            [RawTimePoint::new(1, 2, 1, 0), RawTimePoint::new(2, 1, 1, 0)],
            [RawTimePoint::new(3, 2, 1, 0), RawTimePoint::new(4, 1, 1, 0)],
        )
    }

    #[test]
    fn test_disjoint_reference_scenario() {
        let (group1, group2) = disjoint_groups();
        let test = log_rank_test(&group1, &group2).unwrap();

        // O - E = 0.5 + 2/3, V = 1/4 + 2/9
        assert_close(test.observed_minus_expected, 7.0 / 6.0, 1e-12);
        assert_close(test.variance, 17.0 / 36.0, 1e-12);
        assert_close(test.chi_squared, 2.882_352_941_176_470_6, 1e-4);
        assert_close(test.p_value, 0.089_555_074_413_642_56, 1e-4);
        assert_close(test.p_value, 0.0896, 1e-4);
        assert_eq!(test.event_time_points, 4);
        assert_close(test.observed, 2.0, 1e-12);
    }

    #[test]
    fn test_swapping_groups_keeps_statistic() {
        let (group1, group2) = disjoint_groups();
        let forward = log_rank_test(&group1, &group2).unwrap();
        let backward = log_rank_test(&group2, &group1).unwrap();
        assert_close(
            forward.observed_minus_expected,
            -backward.observed_minus_expected,
            1e-12,
        );
        assert_close(forward.chi_squared, backward.chi_squared, 1e-12);
        assert_close(forward.p_value, backward.p_value, 1e-12);
    }

    #[test]
    fn test_merge_disjoint_risk_set() {
        let (group1, group2) = disjoint_groups();
        let risk_set = merge_risk_sets(&group1, &group2).unwrap();
        let at_risk = risk_set
            .iter()
            .map(|e| (e.time_point, e.at_risk))
            .collect::<Vec<_>>();
        assert_eq!(at_risk, vec![(1, 4), (2, 3), (3, 2), (4, 1)]);

        // Group 1 is absent at t=3: its share is inferred from group 2.
        assert_eq!(risk_set[2].group1, None);
        assert_eq!(risk_set[2].group1_at_risk(), 0);
        assert_eq!(risk_set[0].group1_at_risk(), 2);
    }

    #[test]
    fn test_merge_shared_time_points_and_duplicates() {
        let group1 = [
            RawTimePoint::new(5, 3, 1, 0),
            RawTimePoint::new(2, 4, 0, 1),
            RawTimePoint::new(5, 1, 0, 1),
        ];
        let group2 = [RawTimePoint::new(5, 6, 2, 0), RawTimePoint::new(1, 6, 0, 0)];
        let risk_set = merge_risk_sets(&group1, &group2).unwrap();

        assert_eq!(risk_set.len(), 3);
        assert_eq!(risk_set[0].time_point, 1);
        assert_eq!(risk_set[0].at_risk, 10);
        assert_eq!(risk_set[1].time_point, 2);
        assert_eq!(risk_set[1].at_risk, 10);
        assert_eq!(
            risk_set[2],
            RiskSetEntry {
                time_point: 5,
                at_risk: 9,
                events: 3,
                censorings: 1,
                group1: Some(RawTimePoint::new(5, 4, 1, 1)),
                group2: Some(RawTimePoint::new(5, 6, 2, 0)),
            }
        );
    }

    #[test]
    fn test_merge_rejects_over_removal() {
        let group1 = [RawTimePoint::new(1, 1, 1, 0)];
        let group2 = [RawTimePoint::new(1, 1, 1, 1)];
        assert_eq!(
            merge_risk_sets(&group1, &group2),
            Err(InvalidSequence::NegativeRemaining {
                time_point: 1,
                removed: 3,
                remaining: 2
            })
        );
        assert!(log_rank_p_value(&group1, &group2).is_err());
    }

    #[test]
    fn test_merge_rejects_overflowing_counts() {
        let group1 = [RawTimePoint::new(1, u64::MAX, u64::MAX, 0)];
        let group2 = [RawTimePoint::new(1, 0, 1, 0)];
        assert_eq!(
            merge_risk_sets(&group1, &group2),
            Err(InvalidSequence::NegativeRemaining {
                time_point: 1,
                removed: u64::MAX,
                remaining: u64::MAX
            })
        );
        assert!(log_rank_test(&group1, &group2).is_err());

        let group2 = [RawTimePoint::new(1, 0, 0, 1)];
        assert!(merge_risk_sets(&group1, &group2).is_err());
    }

    #[test]
    fn test_identical_groups() {
        let group = [
            RawTimePoint::new(1, 20, 2, 1),
            RawTimePoint::new(4, 17, 3, 0),
            RawTimePoint::new(7, 14, 0, 2),
            RawTimePoint::new(9, 12, 5, 1),
            RawTimePoint::new(15, 6, 1, 0),
        ];
        let test = log_rank_test(&group, &group).unwrap();
        assert_eq!(test.observed_minus_expected, 0.0);
        assert_eq!(test.chi_squared, 0.0);
        assert_eq!(test.p_value, 1.0);
        assert!(test.variance > 0.0);
    }

    #[test]
    fn test_empty_groups() {
        let test = log_rank_test(&[], &[]).unwrap();
        assert_eq!(test.chi_squared, 0.0);
        assert_eq!(test.p_value, 1.0);
        assert_eq!(test.event_time_points, 0);
        assert!(merge_risk_sets(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_one_empty_group() {
        let group = [RawTimePoint::new(3, 5, 2, 0), RawTimePoint::new(6, 3, 1, 1)];

        // Every subject at risk belongs to the only group: no variation.
        let test = log_rank_test(&group, &[]).unwrap();
        assert_eq!(test.observed_minus_expected, 0.0);
        assert_eq!(test.variance, 0.0);
        assert_eq!(test.p_value, 1.0);

        let test = log_rank_test(&[], &group).unwrap();
        assert_eq!(test.chi_squared, 0.0);
        assert_eq!(test.p_value, 1.0);
    }

    #[test]
    fn test_no_events() {
        let group1 = [RawTimePoint::new(2, 4, 0, 1), RawTimePoint::new(5, 3, 0, 3)];
        let group2 = [RawTimePoint::new(3, 2, 0, 2)];
        let test = log_rank_test(&group1, &group2).unwrap();
        assert_eq!(test.event_time_points, 0);
        assert_eq!(test.chi_squared, 0.0);
        assert_eq!(test.p_value, 1.0);
    }

    #[test]
    fn test_small_hand_computed_scenario() {
        // t=1: n=2, d=1, n1=1 → E = 0.5, V = 1 * 0.5 * 1 * 1 / 2 = 0.25
        let group1 = [RawTimePoint::new(1, 1, 1, 0)];
        let group2 = [RawTimePoint::new(2, 1, 0, 1)];
        let test = log_rank_test(&group1, &group2).unwrap();
        assert_close(test.observed_minus_expected, 0.5, 1e-12);
        assert_close(test.variance, 0.25, 1e-12);
        assert_close(test.chi_squared, 1.0, 1e-12);
        assert_close(test.p_value, 0.317_310_507_862_914, 1e-9);
    }

    #[test]
    fn test_single_subject_at_risk_has_no_variance() {
        let lone = [RawTimePoint::new(1, 1, 1, 0)];
        let absent = [RawTimePoint::new(1, 0, 0, 0)];
        let test = log_rank_test(&lone, &absent).unwrap();
        assert_eq!(test.variance, 0.0);
        assert_eq!(test.chi_squared, 0.0);
        assert_eq!(test.p_value, 1.0);
    }

    #[test]
    fn test_zero_variance_with_difference_rejects_null() {
        // Group 1 holds the whole risk set yet only half of the events.
        let group1 = [RawTimePoint::new(1, 2, 1, 0)];
        let group2 = [RawTimePoint::new(1, 0, 1, 0)];
        let test = log_rank_test(&group1, &group2).unwrap();
        assert_eq!(test.variance, 0.0);
        assert_close(test.observed_minus_expected, -1.0, 1e-12);
        assert!(test.chi_squared.is_infinite());
        assert_eq!(test.p_value, 0.0);
    }

    #[test]
    fn test_unbalanced_groups() {
        let group1 = [
            RawTimePoint::new(2, 30, 6, 1),
            RawTimePoint::new(4, 23, 5, 2),
            RawTimePoint::new(8, 16, 4, 0),
        ];
        let group2 = [
            RawTimePoint::new(3, 30, 1, 2),
            RawTimePoint::new(6, 27, 1, 0),
            RawTimePoint::new(8, 26, 2, 1),
        ];
        let test = log_rank_test(&group1, &group2).unwrap();
        assert!(test.observed_minus_expected > 0.0);
        assert!(test.chi_squared > 0.0);
        assert_close(test.chi_squared, 10.310_941_461_546, 1e-9);
        assert_close(test.p_value, 0.001_322_438_016_254, 1e-9);
    }
}
