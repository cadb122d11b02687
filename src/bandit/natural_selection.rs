//! Natural selection: halving slots, doubling epochs.
//!
//! Generation `k` in `0..factor` has `2^(factor-1-k)` slots and trains each
//! for `2^k` epochs. From generation 1 on, the best `min(survivors, slots)`
//! trials of the previous generation are promoted: their `Run` cell moves to
//! the new generation, the algorithm's distribution grows around them by
//! half the generation's epochs, and they resume training. Fresh
//! configurations fill the remaining slots.

use std::collections::BTreeMap;
use std::time::Instant;

use super::{RunSummary, Submission, TrialBackend, estimate_duration};
use crate::algorithm::{Algorithm, GrowingSearch};
use crate::error::Result;
use crate::ledger::{ResultsLedger, columns};
use crate::parameter::{self, Parameter};
use crate::trial::Trial;
use crate::types::Direction;
use crate::value::Value;

/// The natural selection driver.
///
/// # Examples
///
/// ```
/// use hpsweep::algorithm::GrowingSearch;
/// use hpsweep::bandit::NaturalSelection;
///
/// let driver = NaturalSelection::new(GrowingSearch::new()).factor(4).survivors(2);
/// assert_eq!(driver.slots(), vec![(8, 1), (4, 2), (2, 4), (1, 8)]);
/// assert_eq!(driver.total_epochs(), 32);
/// ```
pub struct NaturalSelection<A = GrowingSearch> {
    algorithm: A,
    factor: u32,
    survivors: usize,
}

impl<A: Algorithm> NaturalSelection<A> {
    /// Creates the driver with `factor = 6` and `survivors = 4`.
    pub fn new(algorithm: A) -> Self {
        Self {
            algorithm,
            factor: 6,
            survivors: 4,
        }
    }

    /// Sets the number of generations.
    ///
    /// # Panics
    ///
    /// Panics if `factor` is 0 or larger than 32.
    #[must_use]
    pub fn factor(mut self, factor: u32) -> Self {
        assert!((1..=32).contains(&factor), "factor must be in 1..=32, got {factor}");
        self.factor = factor;
        self
    }

    /// Sets how many trials each generation promotes.
    #[must_use]
    pub fn survivors(mut self, survivors: usize) -> Self {
        self.survivors = survivors;
        self
    }

    /// `(slots, epochs)` per generation.
    #[must_use]
    pub fn slots(&self) -> Vec<(usize, u64)> {
        (0..self.factor)
            .map(|k| (1_usize << (self.factor - 1 - k), 1_u64 << k))
            .collect()
    }

    /// Epochs the whole run trains.
    #[must_use]
    pub fn total_epochs(&self) -> u64 {
        self.slots().iter().map(|&(n, r)| n as u64 * r).sum()
    }

    /// Runs every generation.
    ///
    /// # Errors
    ///
    /// Fails with the validation error of a malformed space before
    /// anything is submitted; otherwise propagates algorithm, backend and
    /// ledger errors.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    pub fn run(
        &mut self,
        parameters: &[Parameter],
        ledger: &ResultsLedger,
        direction: Direction,
        backend: &mut impl TrialBackend,
    ) -> Result<RunSummary> {
        parameter::validate_space(parameters)?;
        let mut summary = RunSummary {
            total_epochs: self.total_epochs(),
            ..RunSummary::default()
        };
        let mut trials: BTreeMap<u64, Trial> = BTreeMap::new();
        let mut exhausted = false;

        for (generation, (slots, epochs)) in self.slots().into_iter().enumerate() {
            let run = generation as i64;
            let promoted = if generation == 0 {
                Vec::new()
            } else {
                backend.wait_all()?;
                ledger.k_best_from_run(self.survivors.min(slots), run - 1, direction)
            };
            trace_info!(run, slots, epochs, promoted = promoted.len(), "starting generation");

            for &id in &promoted {
                let Some(previous) = trials.get(&id) else {
                    continue;
                };
                let mut params = previous.parameters().clone();
                params.insert(columns::RUN.to_owned(), Value::Int(run));
                ledger.update_cell(id, columns::RUN, run)?;
                self.algorithm.grow(&params, epochs as f64 / 2.0);
                let trial = Trial::new(id, params);
                trials.insert(id, trial.clone());
                backend.submit(Submission {
                    trial,
                    epochs,
                    resumed: true,
                })?;
                summary.submissions += 1;
            }

            if exhausted {
                continue;
            }
            for _ in promoted.len()..slots {
                let Some(mut config) = self.algorithm.get_suggestion(parameters, ledger, direction)? else {
                    trace_info!(run, "algorithm exhausted, no more fresh trials");
                    exhausted = true;
                    break;
                };
                config.insert(columns::RUN.to_owned(), Value::Int(run));
                let trial = Trial::new(ledger.next_trial_id(), config);
                trials.insert(trial.id(), trial.clone());
                let submission = Submission {
                    trial,
                    epochs,
                    resumed: false,
                };
                if summary.submissions == 0 {
                    let start = Instant::now();
                    backend.submit(submission)?;
                    backend.wait_all()?;
                    summary.estimated_duration =
                        Some(estimate_duration(start.elapsed(), summary.total_epochs, epochs));
                } else {
                    backend.submit(submission)?;
                }
                summary.submissions += 1;
            }
        }
        backend.wait_all()?;

        summary.trials = trials.len();
        summary.best = ledger.best_row(direction);
        Ok(summary)
    }
}

impl Default for NaturalSelection<GrowingSearch> {
    fn default() -> Self {
        Self::new(GrowingSearch::new())
    }
}
