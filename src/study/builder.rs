use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::Study;
use crate::algorithm::{Algorithm, RandomSearch};
use crate::error::Result;
use crate::ledger::{LedgerStorage, ResultsLedger};
use crate::parameter::{self, Parameter};
use crate::stopping::StoppingRule;
use crate::types::Direction;

/// A builder for constructing [`Study`] instances with a fluent API.
///
/// Created via [`Study::builder()`].
///
/// # Defaults
///
/// - Direction: [`Minimize`](Direction::Minimize)
/// - Algorithm: [`RandomSearch`]
/// - Stopping rule: none
/// - Ledger: in-memory
///
/// # Examples
///
/// ```
/// use hpsweep::algorithm::BayesianOptimization;
/// use hpsweep::parameter::Parameter;
/// use hpsweep::{Direction, Study};
///
/// let study = Study::builder(vec![Parameter::discrete("layers", 1, 4)])
///     .maximize()
///     .algorithm(BayesianOptimization::with_seed(0))
///     .build()
///     .unwrap();
///
/// assert_eq!(study.direction(), Direction::Maximize);
/// ```
pub struct StudyBuilder {
    parameters: Vec<Parameter>,
    direction: Direction,
    algorithm: Option<Box<dyn Algorithm>>,
    stopping_rule: Option<Box<dyn StoppingRule>>,
    ledger: Option<ResultsLedger>,
}

impl StudyBuilder {
    pub(super) fn new(parameters: Vec<Parameter>) -> Self {
        Self {
            parameters,
            direction: Direction::Minimize,
            algorithm: None,
            stopping_rule: None,
            ledger: None,
        }
    }

    /// Set the optimization direction to minimize (the default).
    #[must_use]
    pub fn minimize(mut self) -> Self {
        self.direction = Direction::Minimize;
        self
    }

    /// Set the optimization direction to maximize.
    #[must_use]
    pub fn maximize(mut self) -> Self {
        self.direction = Direction::Maximize;
        self
    }

    /// Set the optimization direction explicitly.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the search algorithm.
    #[must_use]
    pub fn algorithm(mut self, algorithm: impl Algorithm + 'static) -> Self {
        self.algorithm = Some(Box::new(algorithm));
        self
    }

    /// Set the early-stopping rule.
    #[must_use]
    pub fn stopping_rule(mut self, rule: impl StoppingRule + 'static) -> Self {
        self.stopping_rule = Some(Box::new(rule));
        self
    }

    /// Share an existing ledger.
    #[must_use]
    pub fn ledger(mut self, ledger: ResultsLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Use a custom ledger backend.
    #[must_use]
    pub fn storage(mut self, storage: impl LedgerStorage + 'static) -> Self {
        self.ledger = Some(ResultsLedger::with_storage(storage));
        self
    }

    /// Build the [`Study`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the search space is invalid.
    pub fn build(self) -> Result<Study> {
        parameter::validate_space(&self.parameters)?;
        Ok(Study {
            parameters: self.parameters,
            direction: self.direction,
            algorithm: Mutex::new(self.algorithm.unwrap_or_else(|| Box::new(RandomSearch::new()))),
            stopping_rule: self.stopping_rule,
            ledger: self.ledger.unwrap_or_default(),
            active: Mutex::new(BTreeMap::new()),
        })
    }
}
