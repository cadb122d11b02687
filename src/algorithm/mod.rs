//! Search algorithms.
//!
//! An [`Algorithm`] proposes the next configuration given the search space
//! and the [`ResultsLedger`]. It owns its state (counters, seeds, RNG) and
//! signals exhaustion by returning `Ok(None)`.
//!
//! # Available algorithms
//!
//! | Algorithm | Strategy | Parameter types |
//! |-----------|----------|-----------------|
//! | [`RandomSearch`] | Independent uniform draws | all |
//! | [`GridSearch`] | Every combination once | Choice, Ordinal |
//! | [`LocalSearch`] | One-parameter moves around the best configuration | Ordinal, Discrete, Continuous |
//! | [`BayesianOptimization`] | Gaussian process + expected improvement | all |
//! | [`PopulationBasedTraining`] | Generational exploit/explore | all (Choice is never perturbed) |
//! | [`GrowingSearch`] | Random draws from reshapeable histograms | all |
//!
//! # Example
//!
//! ```
//! use hpsweep::algorithm::{Algorithm, RandomSearch};
//! use hpsweep::ledger::ResultsLedger;
//! use hpsweep::parameter::Parameter;
//! use hpsweep::Direction;
//!
//! let space = vec![Parameter::continuous("dropout", 0.0, 0.5)];
//! let ledger = ResultsLedger::new();
//! let mut algorithm = RandomSearch::with_seed(3).max_num_trials(2);
//!
//! assert!(algorithm.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().is_some());
//! assert!(algorithm.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().is_some());
//! assert!(algorithm.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().is_none());
//! ```

pub mod bayesian;
pub mod grid;
pub mod growing;
pub mod local;
pub mod pbt;
pub mod random;

pub use bayesian::BayesianOptimization;
pub use grid::GridSearch;
pub use growing::GrowingSearch;
pub use local::LocalSearch;
pub use pbt::PopulationBasedTraining;
pub use random::RandomSearch;

use crate::error::Result;
use crate::ledger::ResultsLedger;
use crate::parameter::Parameter;
use crate::types::Direction;
use crate::value::{Configuration, Value};

/// A stateful strategy producing configurations to evaluate.
pub trait Algorithm: Send {
    /// Returns the next configuration, or `None` once the algorithm is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the search space is malformed
    /// (see [`validate_space`](crate::parameter::validate_space)) or contains
    /// a parameter type the algorithm cannot handle.
    fn get_suggestion(
        &mut self,
        parameters: &[Parameter],
        results: &ResultsLedger,
        direction: Direction,
    ) -> Result<Option<Configuration>>;

    /// Fast-forwards internal counters as if `num_trials` suggestions had
    /// been made. The default does nothing.
    fn load(&mut self, num_trials: usize) {
        let _ = num_trials;
    }

    /// Reshapes the sampling distribution around `config` by `amount`.
    /// Only [`GrowingSearch`] reacts; the default does nothing.
    fn grow(&mut self, config: &Configuration, amount: f64) {
        let _ = (config, amount);
    }
}

impl<A: Algorithm + ?Sized> Algorithm for Box<A> {
    fn get_suggestion(
        &mut self,
        parameters: &[Parameter],
        results: &ResultsLedger,
        direction: Direction,
    ) -> Result<Option<Configuration>> {
        (**self).get_suggestion(parameters, results, direction)
    }

    fn load(&mut self, num_trials: usize) {
        (**self).load(num_trials);
    }

    fn grow(&mut self, config: &Configuration, amount: f64) {
        (**self).grow(config, amount);
    }
}

/// Multiplies a numeric value by `factor`, clamps it into the parameter's
/// bounds and rounds Discrete values. Choice and Ordinal values pass through.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn scale_value(parameter: &Parameter, value: &Value, factor: f64) -> Value {
    match parameter {
        Parameter::Continuous { low, high, .. } => match value.as_f64() {
            Some(v) => Value::Float((v * factor).clamp(*low, *high)),
            None => value.clone(),
        },
        Parameter::Discrete { low, high, .. } => match value.as_f64() {
            Some(v) => Value::Int(((v * factor).round() as i64).clamp(*low, *high)),
            None => value.clone(),
        },
        Parameter::Choice { .. } | Parameter::Ordinal { .. } => value.clone(),
    }
}

/// Moves an Ordinal value `shift` positions, clamped to the range ends.
/// Values outside the range are returned unchanged.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub(crate) fn shift_ordinal(parameter: &Parameter, value: &Value, shift: isize) -> Value {
    let (Some(range), Some(idx)) = (parameter.values(), parameter.index_of(value)) else {
        return value.clone();
    };
    let last = range.len() as isize - 1;
    let target = (idx as isize + shift).clamp(0, last);
    range[target as usize].clone()
}
