use crate::{InvalidSequence, point::SurvivalPoint};

/// Kaplan-Meier estimator for a single group.
///
/// The state is seeded with the number of subjects at risk at time zero and
/// advanced one time point at a time with [`SurvivalState::next`]. It keeps
/// the running totals between steps, so one instance must only ever be fed
/// the observations of one group.
///
/// # Examples
///
/// ```
/// use survstat_stats::state::SurvivalState;
///
/// let mut state = SurvivalState::new(10);
/// let start = state.current();
/// assert_eq!(start.cumul, 1.0);
///
/// let first = state.next(3, 2, 0).unwrap();
/// assert_eq!(first.at_risk, 10);
/// assert_eq!(first.remaining, 8);
/// assert!((first.cumul - 0.8).abs() < 1e-12);
///
/// // Time must move forward
/// assert!(state.next(3, 1, 0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalState {
    initial_count: u64,
    remaining: u64,
    cumul_events: u64,
    cumul_censorings: u64,
    cumul: f64,
    /// Running `Σ d / (n (n - d))` of the Greenwood formula.
    greenwood_sum: f64,
    /// Time of the last step, starting at the synthetic time-zero point.
    last_time_point: u64,
}

impl SurvivalState {
    #[must_use]
    pub const fn new(initial_count: u64) -> Self {
        Self {
            initial_count,
            remaining: initial_count,
            cumul_events: 0,
            cumul_censorings: 0,
            cumul: 1.0,
            greenwood_sum: 0.0,
            last_time_point: 0,
        }
    }

    /// Returns the synthetic time-zero point that starts every curve.
    ///
    /// This does not advance the state.
    #[must_use]
    pub const fn current(&self) -> SurvivalPoint {
        SurvivalPoint::zero(self.initial_count)
    }

    #[must_use]
    pub const fn initial_count(&self) -> u64 {
        self.initial_count
    }

    /// Subjects still at risk after the last processed time point.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Cumulative survival probability after the last processed time point.
    #[must_use]
    pub const fn cumul(&self) -> f64 {
        self.cumul
    }

    /// Advances the estimator by one time point.
    ///
    /// `time_point` must be strictly greater than the one passed to the
    /// previous call (or than zero on the first call), and the subjects removed (`events + censorings`) must
    /// not exceed those still at risk. On error the state is left unchanged.
    #[expect(clippy::cast_precision_loss)]
    pub fn next(
        &mut self,
        time_point: u64,
        events: u64,
        censorings: u64,
    ) -> Result<SurvivalPoint, InvalidSequence> {
        if time_point <= self.last_time_point {
            return Err(InvalidSequence::NonIncreasingTime {
                time_point,
                previous: self.last_time_point,
            });
        }

        let at_risk = self.remaining;
        let removed = events.saturating_add(censorings);
        let remaining = at_risk
            .checked_sub(removed)
            .ok_or(InvalidSequence::NegativeRemaining {
                time_point,
                removed,
                remaining: at_risk,
            })?;

        let prob = if at_risk == 0 {
            1.0
        } else {
            1.0 - events as f64 / at_risk as f64
        };
        if events > 0 && events < at_risk {
            let n = at_risk as f64;
            let d = events as f64;
            self.greenwood_sum += d / (n * (n - d));
        }

        self.cumul *= prob;
        self.remaining = remaining;
        self.cumul_events += events;
        self.cumul_censorings += censorings;
        self.last_time_point = time_point;

        Ok(SurvivalPoint {
            time_point,
            at_risk,
            nof_events: events,
            nof_censorings: censorings,
            remaining,
            prob,
            cumul: self.cumul,
            cumul_events: self.cumul_events,
            cumul_censorings: self.cumul_censorings,
            variance: self.cumul * self.cumul * self.greenwood_sum,
        })
    }
}
