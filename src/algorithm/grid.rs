//! Exhaustive grid search over categorical parameters.
//!
//! Combinations are enumerated with parameters ordered by name and the last
//! name varying fastest, so `{a: [1, 2], b: [x, y]}` yields
//! `(1, x), (1, y), (2, x), (2, y)`.

use crate::algorithm::Algorithm;
use crate::error::{Error, Result};
use crate::ledger::ResultsLedger;
use crate::parameter::{self, Parameter};
use crate::types::Direction;
use crate::value::Configuration;

/// Visits every combination of Choice and Ordinal values exactly once.
///
/// # Examples
///
/// ```
/// use hpsweep::algorithm::{Algorithm, GridSearch};
/// use hpsweep::ledger::ResultsLedger;
/// use hpsweep::parameter::Parameter;
/// use hpsweep::Direction;
///
/// let space = Parameter::grid([
///     ("act", vec!["tanh".into(), "relu".into()]),
///     ("units", vec![16.into(), 32.into(), 64.into()]),
/// ]);
/// let ledger = ResultsLedger::new();
/// let mut grid = GridSearch::new();
/// let mut n = 0;
/// while grid.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().is_some() {
///     n += 1;
/// }
/// assert_eq!(n, 6);
/// ```
#[derive(Debug, Default)]
pub struct GridSearch {
    index: usize,
}

impl GridSearch {
    /// Creates a grid search positioned at the first combination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Number of combinations of `parameters` (1 for an empty space).
pub(crate) fn grid_size(parameters: &[&Parameter]) -> usize {
    parameters
        .iter()
        .map(|p| p.values().map_or(1, <[_]>::len))
        .product()
}

/// The `index`-th combination, parameters sorted by name, last name fastest.
pub(crate) fn grid_point(parameters: &[&Parameter], mut index: usize) -> Configuration {
    let mut sorted: Vec<&Parameter> = parameters.to_vec();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));
    let mut config = Configuration::new();
    for p in sorted.iter().rev() {
        let Some(range) = p.values() else { continue };
        config.insert(p.name().to_owned(), range[index % range.len()].clone());
        index /= range.len();
    }
    config
}

impl Algorithm for GridSearch {
    fn get_suggestion(
        &mut self,
        parameters: &[Parameter],
        _results: &ResultsLedger,
        _direction: Direction,
    ) -> Result<Option<Configuration>> {
        parameter::validate_space(parameters)?;
        for p in parameters {
            if matches!(p, Parameter::Discrete { .. } | Parameter::Continuous { .. }) {
                return Err(Error::UnsupportedParameter {
                    algorithm: "GridSearch",
                    parameter: p.name().to_owned(),
                    kind: p.kind(),
                });
            }
        }
        let refs: Vec<&Parameter> = parameters.iter().collect();
        if self.index >= grid_size(&refs) {
            return Ok(None);
        }
        let config = grid_point(&refs, self.index);
        self.index += 1;
        Ok(Some(config))
    }

    fn load(&mut self, num_trials: usize) {
        self.index = num_trials;
    }
}
