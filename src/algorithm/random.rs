//! Random search.

use crate::algorithm::Algorithm;
use crate::error::Result;
use crate::ledger::ResultsLedger;
use crate::parameter::{self, Parameter};
use crate::types::Direction;
use crate::value::Configuration;

/// Samples every parameter independently and uniformly at random.
///
/// With `max_num_trials` set, exactly that many suggestions are made
/// before the search returns `None`; otherwise it never ends.
///
/// # Examples
///
/// ```
/// use hpsweep::algorithm::RandomSearch;
///
/// // Unlimited, random seed
/// let search = RandomSearch::new();
///
/// // Reproducible and limited to 20 trials
/// let search = RandomSearch::with_seed(42).max_num_trials(20);
/// ```
pub struct RandomSearch {
    rng: fastrand::Rng,
    max_num_trials: Option<usize>,
    count: usize,
}

impl RandomSearch {
    /// Creates an unlimited random search with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
            max_num_trials: None,
            count: 0,
        }
    }

    /// Creates an unlimited random search with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            ..Self::new()
        }
    }

    /// Stops after `n` suggestions.
    #[must_use]
    pub fn max_num_trials(mut self, n: usize) -> Self {
        self.max_num_trials = Some(n);
        self
    }

    /// Number of suggestions made so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Default for RandomSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for RandomSearch {
    fn get_suggestion(
        &mut self,
        parameters: &[Parameter],
        _results: &ResultsLedger,
        _direction: Direction,
    ) -> Result<Option<Configuration>> {
        parameter::validate_space(parameters)?;
        if self.max_num_trials.is_some_and(|max| self.count >= max) {
            return Ok(None);
        }
        self.count += 1;
        Ok(Some(parameter::sample_configuration(parameters, &mut self.rng)))
    }

    fn load(&mut self, num_trials: usize) {
        self.count = num_trials;
    }
}
