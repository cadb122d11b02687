use std::collections::BTreeMap;

use super::StoppingRule;
use crate::ledger::{ResultsLedger, Row};
use crate::trial::Trial;
use crate::types::Direction;

/// Stop trials whose best objective so far is worse than the median of the
/// other trials' best objectives (Golovin et al., "Google Vizier").
///
/// - A trial below `min_iterations` is never stopped.
/// - A trial whose objectives are all NaN is stopped.
/// - Other trials count as comparators once they reached `min_iterations`;
///   with fewer than `min_trials` comparators nothing is stopped.
///
/// # Examples
///
/// ```
/// use hpsweep::stopping::MedianStoppingRule;
///
/// let rule = MedianStoppingRule::new().min_iterations(5).min_trials(3);
/// ```
#[derive(Clone, Debug)]
pub struct MedianStoppingRule {
    min_iterations: u64,
    min_trials: usize,
}

impl MedianStoppingRule {
    /// Creates a rule with `min_iterations = 0` and `min_trials = 1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_iterations: 0,
            min_trials: 1,
        }
    }

    /// Set the number of iterations a trial runs before it can be stopped.
    #[must_use]
    pub fn min_iterations(mut self, n: u64) -> Self {
        self.min_iterations = n;
        self
    }

    /// Set the minimum number of comparison trials required before stopping.
    #[must_use]
    pub fn min_trials(mut self, n: usize) -> Self {
        self.min_trials = n;
        self
    }
}

impl Default for MedianStoppingRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Highest iteration and NaN-skipping best objective of a group of rows.
fn summarize<'a>(rows: impl IntoIterator<Item = &'a Row>, direction: Direction) -> (u64, f64) {
    let mut max_iteration = 0;
    let mut objectives = Vec::new();
    for row in rows {
        max_iteration = max_iteration.max(row.iteration);
        objectives.push(row.objective);
    }
    (max_iteration, direction.best_of(objectives))
}

impl StoppingRule for MedianStoppingRule {
    fn should_trial_stop(&self, trial: &Trial, results: &ResultsLedger, direction: Direction) -> bool {
        results.with_rows(|rows| {
            let mut by_trial: BTreeMap<u64, Vec<&Row>> = BTreeMap::new();
            for row in rows {
                by_trial.entry(row.trial_id).or_default().push(row);
            }

            let Some(own) = by_trial.remove(&trial.id()) else {
                return false;
            };
            let (max_iteration, best) = summarize(own, direction);
            if max_iteration < self.min_iterations {
                return false;
            }
            if best.is_nan() {
                trace_debug!(trial_id = trial.id(), "all objectives are NaN, stopping");
                return true;
            }

            let mut comparison: Vec<f64> = by_trial
                .into_values()
                .map(|rows| summarize(rows, direction))
                .filter(|(iteration, _)| *iteration >= self.min_iterations)
                .map(|(_, best)| best)
                .collect();
            if comparison.len() < self.min_trials {
                return false;
            }

            comparison.retain(|v| !v.is_nan());
            if comparison.is_empty() {
                return false;
            }
            let median = compute_median(&mut comparison);
            direction.is_better(median, best)
        })
    }
}

/// Compute the median of a non-empty slice (sorts in place).
fn compute_median(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    let len = values.len();
    if len % 2 == 1 {
        values[len / 2]
    } else {
        f64::midpoint(values[len / 2 - 1], values[len / 2])
    }
}
