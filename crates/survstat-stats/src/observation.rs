//! Raw per-time-point observations
//!
//! Survival data arrives already aggregated: for every time point a data
//! source reports how many subjects were at risk, how many experienced the
//! event of interest and how many were censored. A group may be reported by
//! several sources, so the same time point can appear more than once.
//!
//! # Serialization
//!
//! ```json
//! {
//!   "results": [
//!     {
//!       "group_id": "treatment",
//!       "initial_count": 120,
//!       "time_points": [
//!         { "time_point": 14, "at_risk": 120, "events": 3, "censorings": 1 }
//!       ]
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Counts observed at a single time point for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct RawTimePoint {
    /// Time at which the counts were observed.
    pub time_point: u64,
    /// Subjects at risk at this time point.
    pub at_risk: u64,
    /// Subjects experiencing the event of interest at this time point.
    #[serde(default)]
    pub events: u64,
    /// Subjects censored at this time point.
    #[serde(default)]
    pub censorings: u64,
}

impl RawTimePoint {
    #[must_use]
    pub const fn new(time_point: u64, at_risk: u64, events: u64, censorings: u64) -> Self {
        Self {
            time_point,
            at_risk,
            events,
            censorings,
        }
    }

    /// Number of subjects leaving the risk set at this time point.
    #[must_use]
    pub const fn removed(&self) -> u64 {
        self.events.saturating_add(self.censorings)
    }
}

/// Raw results of one comparison group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRawResult {
    /// Identifier of the group (cohort name, subgroup label, ...).
    pub group_id: String,
    /// Subjects at risk at time zero.
    ///
    /// When absent, the at-risk count of the earliest time point is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_count: Option<u64>,
    /// Observations in any order, possibly with repeated time points.
    #[serde(default)]
    pub time_points: Vec<RawTimePoint>,
}

impl GroupRawResult {
    #[must_use]
    pub fn new(group_id: impl Into<String>, time_points: Vec<RawTimePoint>) -> Self {
        Self {
            group_id: group_id.into(),
            initial_count: None,
            time_points,
        }
    }

    #[must_use]
    pub fn with_initial_count(mut self, initial_count: u64) -> Self {
        self.initial_count = Some(initial_count);
        self
    }
}

/// Collection of group results, as produced by one survival query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupResultCollection {
    pub results: Vec<GroupRawResult>,
}

impl GroupResultCollection {
    /// Returns the group identifiers in input order.
    pub fn group_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.results.iter().map(|r| r.group_id.as_str())
    }

    #[must_use]
    pub fn find(&self, group_id: &str) -> Option<&GroupRawResult> {
        self.results.iter().find(|r| r.group_id == group_id)
    }
}

/// Merges observations sharing a time point and sorts them by time.
///
/// All counts of records with the same time point are summed, at-risk
/// included: each record stands for a disjoint part of the group.
///
/// # Examples
///
/// ```
/// use survstat_stats::observation::{RawTimePoint, aggregate_time_points};
///
/// let records = [
///     RawTimePoint::new(7, 4, 1, 0),
///     RawTimePoint::new(3, 10, 2, 1),
///     RawTimePoint::new(7, 3, 0, 1),
/// ];
/// let merged = aggregate_time_points(&records);
/// assert_eq!(
///     merged,
///     vec![RawTimePoint::new(3, 10, 2, 1), RawTimePoint::new(7, 7, 1, 1)]
/// );
/// ```
#[must_use]
pub fn aggregate_time_points(records: &[RawTimePoint]) -> Vec<RawTimePoint> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|p| p.time_point);

    sorted
        .chunk_by(|a, b| a.time_point == b.time_point)
        .map(|same_time| {
            same_time
                .iter()
                .fold(RawTimePoint::default(), |acc, p| RawTimePoint {
                    time_point: p.time_point,
                    at_risk: acc.at_risk.saturating_add(p.at_risk),
                    events: acc.events.saturating_add(p.events),
                    censorings: acc.censorings.saturating_add(p.censorings),
                })
        })
        .collect()
}
