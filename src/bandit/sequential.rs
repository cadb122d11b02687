//! A fixed number of trials with a fixed epoch budget.

use super::{RunSummary, Submission, TrialBackend};
use crate::algorithm::Algorithm;
use crate::error::Result;
use crate::ledger::{ResultsLedger, columns};
use crate::parameter::{self, Parameter};
use crate::trial::Trial;
use crate::types::Direction;
use crate::value::Value;

/// Submits `num_experiments` trials of `num_epochs` each, all under run 1.
///
/// By default the driver waits for each trial before asking for the next
/// suggestion, so model-based algorithms see every earlier result. Turn
/// that off with [`SequentialDriver::wait_each`] to let the backend run
/// trials concurrently.
pub struct SequentialDriver<A> {
    algorithm: A,
    num_experiments: usize,
    num_epochs: u64,
    wait_each: bool,
}

impl<A: Algorithm> SequentialDriver<A> {
    /// Creates the driver.
    ///
    /// # Panics
    ///
    /// Panics if `num_epochs` is 0.
    pub fn new(algorithm: A, num_experiments: usize, num_epochs: u64) -> Self {
        assert!(num_epochs > 0, "num_epochs must be > 0, got {num_epochs}");
        Self {
            algorithm,
            num_experiments,
            num_epochs,
            wait_each: true,
        }
    }

    /// Whether to wait for each trial before the next suggestion.
    #[must_use]
    pub fn wait_each(mut self, wait: bool) -> Self {
        self.wait_each = wait;
        self
    }

    /// Runs the experiments. Stops early if the algorithm is exhausted.
    ///
    /// # Errors
    ///
    /// Fails with the validation error of a malformed space before
    /// anything is submitted; otherwise propagates algorithm, backend and
    /// ledger errors.
    pub fn run(
        &mut self,
        parameters: &[Parameter],
        ledger: &ResultsLedger,
        direction: Direction,
        backend: &mut impl TrialBackend,
    ) -> Result<RunSummary> {
        parameter::validate_space(parameters)?;
        let mut summary = RunSummary {
            total_epochs: self.num_experiments as u64 * self.num_epochs,
            ..RunSummary::default()
        };
        for _ in 0..self.num_experiments {
            let Some(mut config) = self.algorithm.get_suggestion(parameters, ledger, direction)? else {
                break;
            };
            config.insert(columns::RUN.to_owned(), Value::Int(1));
            let trial = Trial::new(ledger.next_trial_id(), config);
            backend.submit(Submission {
                trial,
                epochs: self.num_epochs,
                resumed: false,
            })?;
            summary.submissions += 1;
            summary.trials += 1;
            if self.wait_each {
                backend.wait_all()?;
            }
        }
        backend.wait_all()?;
        summary.best = ledger.best_row(direction);
        Ok(summary)
    }
}
