//! The study facade.
//!
//! A [`Study`] owns the search space, an [`Algorithm`], an optional
//! [`StoppingRule`], the [`ResultsLedger`] and the optimization direction.
//! It is the surface an execution backend talks to: ask for a trial, report
//! observations, ask whether to stop, finalize.

mod builder;

use std::collections::BTreeMap;

pub use builder::StudyBuilder;
use parking_lot::Mutex;

use crate::algorithm::Algorithm;
use crate::error::{Error, Result};
use crate::ledger::{ResultsLedger, Row};
use crate::parameter::Parameter;
use crate::stopping::StoppingRule;
use crate::trial::Trial;
use crate::types::{Direction, Status};
use crate::value::Configuration;

/// Coordinates an algorithm, a stopping rule and the ledger.
///
/// `Study` is `Send + Sync`; several workers may share it by reference and
/// call [`get_suggestion`](Self::get_suggestion) concurrently. Suggestions
/// are serialized through an internal lock.
///
/// # Examples
///
/// ```
/// use hpsweep::algorithm::RandomSearch;
/// use hpsweep::parameter::Parameter;
/// use hpsweep::stopping::MedianStoppingRule;
/// use hpsweep::{Status, Study};
///
/// let study = Study::builder(vec![Parameter::continuous("lr", 1e-4, 1e-1).log_scale()])
///     .minimize()
///     .algorithm(RandomSearch::with_seed(1).max_num_trials(3))
///     .stopping_rule(MedianStoppingRule::new())
///     .build()
///     .unwrap();
///
/// while let Some(trial) = study.get_suggestion().unwrap() {
///     let lr = trial.get_f64("lr").unwrap();
///     for epoch in 1..=3 {
///         study.add_observation(&trial, epoch, lr / epoch as f64).unwrap();
///         if study.should_trial_stop(&trial) {
///             break;
///         }
///     }
///     study.finalize(&trial, Status::Completed).unwrap();
/// }
///
/// assert_eq!(study.ledger().num_trials(), 3);
/// assert!(study.best().is_some());
/// ```
pub struct Study {
    parameters: Vec<Parameter>,
    direction: Direction,
    algorithm: Mutex<Box<dyn Algorithm>>,
    stopping_rule: Option<Box<dyn StoppingRule>>,
    ledger: ResultsLedger,
    active: Mutex<BTreeMap<u64, Trial>>,
}

impl Study {
    /// Starts a builder over `parameters`.
    #[must_use]
    pub fn builder(parameters: Vec<Parameter>) -> StudyBuilder {
        StudyBuilder::new(parameters)
    }

    /// Creates a study with an in-memory ledger and no stopping rule.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the search space is invalid.
    pub fn new(parameters: Vec<Parameter>, algorithm: impl Algorithm + 'static, direction: Direction) -> Result<Self> {
        Self::builder(parameters)
            .direction(direction)
            .algorithm(algorithm)
            .build()
    }

    /// The search space.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// The optimization direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The shared results ledger.
    #[must_use]
    pub fn ledger(&self) -> &ResultsLedger {
        &self.ledger
    }

    /// Asks the algorithm for the next configuration and wraps it in a
    /// [`Trial`] with a fresh Trial-ID. Returns `None` once the algorithm
    /// is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates the algorithm's configuration errors.
    pub fn get_suggestion(&self) -> Result<Option<Trial>> {
        let config = self
            .algorithm
            .lock()
            .get_suggestion(&self.parameters, &self.ledger, self.direction)?;
        let Some(config) = config else {
            trace_info!("algorithm exhausted");
            return Ok(None);
        };
        let trial = Trial::new(self.ledger.next_trial_id(), config);
        trace_info!(trial_id = trial.id(), "trial created");
        self.active.lock().insert(trial.id(), trial.clone());
        Ok(Some(trial))
    }

    /// Records an intermediate observation.
    ///
    /// # Errors
    ///
    /// [`Error::NonMonotonicIteration`] if `iteration` is lower than one
    /// already reported, or a storage error.
    pub fn add_observation(&self, trial: &Trial, iteration: u64, objective: f64) -> Result<()> {
        self.add_observation_with_context(trial, iteration, objective, Configuration::new())
    }

    /// Records an intermediate observation with extra user columns.
    ///
    /// # Errors
    ///
    /// See [`add_observation`](Self::add_observation).
    pub fn add_observation_with_context(
        &self,
        trial: &Trial,
        iteration: u64,
        objective: f64,
        context: Configuration,
    ) -> Result<()> {
        trace_debug!(trial_id = trial.id(), iteration, objective, "observation");
        self.ledger
            .record_with_context(trial, iteration, objective, Status::Intermediate, context)
    }

    /// Asks the stopping rule whether `trial` should stop. Always `false`
    /// without a rule.
    #[must_use]
    pub fn should_trial_stop(&self, trial: &Trial) -> bool {
        self.stopping_rule
            .as_ref()
            .is_some_and(|rule| rule.should_trial_stop(trial, &self.ledger, self.direction))
    }

    /// Closes `trial` by appending its final row.
    ///
    /// The final row carries the best objective the trial reported (NaN if
    /// every observation was NaN) and the context columns of that
    /// observation, at the trial's highest iteration.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownTrial`] if the trial never reported.
    ///
    /// # Panics
    ///
    /// Panics if `status` is [`Status::Intermediate`].
    pub fn finalize(&self, trial: &Trial, status: Status) -> Result<()> {
        assert!(status.is_final(), "finalize needs a final status, got {status}");
        let rows = self.ledger.trial_rows(trial.id());
        let last = rows.iter().map(|r| r.iteration).max().ok_or(Error::UnknownTrial(trial.id()))?;
        let best = rows
            .iter()
            .filter(|r| !r.objective.is_nan())
            .min_by(|a, b| self.direction.compare(a.objective, b.objective))
            .or_else(|| rows.last())
            .ok_or(Error::UnknownTrial(trial.id()))?;

        let row = Row {
            trial_id: trial.id(),
            status,
            iteration: last,
            objective: best.objective,
            columns: best.columns.clone(),
        };
        self.ledger.append(row)?;
        self.active.lock().remove(&trial.id());
        trace_info!(trial_id = trial.id(), %status, "trial finalized");
        Ok(())
    }

    /// Trials handed out by [`get_suggestion`](Self::get_suggestion) and
    /// not yet finalized.
    #[must_use]
    pub fn active_trials(&self) -> Vec<Trial> {
        self.active.lock().values().cloned().collect()
    }

    /// Reloads the ledger and fast-forwards the algorithm to the number of
    /// trials it holds. Returns that number.
    pub fn resume(&self) -> usize {
        self.ledger.refresh();
        let num_trials = self.ledger.num_trials();
        self.algorithm.lock().load(num_trials);
        trace_info!(num_trials, "study resumed");
        num_trials
    }

    /// The best completed observation.
    #[must_use]
    pub fn best(&self) -> Option<Row> {
        self.ledger.best_row(self.direction)
    }
}

impl core::fmt::Debug for Study {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Study")
            .field("parameters", &self.parameters)
            .field("direction", &self.direction)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}
