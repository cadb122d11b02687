//! Local search around a known-good configuration.
//!
//! The search starts from a seed configuration and changes one parameter at
//! a time. After the seed has been evaluated, every call re-centres on the
//! best configuration observed so far and proposes a neighbour that has not
//! been submitted before:
//!
//! - **Ordinal**: one step up or down the value list, clamped at the ends.
//! - **Discrete / Continuous**: multiplied by the lower or upper
//!   perturbation factor, clamped to the bounds (Discrete rounded).
//!
//! Parameter names and the increase/decrease direction are tried in random
//! order. When every neighbour has been submitted the search returns `None`.

use crate::algorithm::{Algorithm, scale_value, shift_ordinal};
use crate::error::{Error, Result};
use crate::ledger::ResultsLedger;
use crate::parameter::{self, Parameter};
use crate::types::Direction;
use crate::value::Configuration;

/// One-parameter-at-a-time hill climbing.
///
/// # Examples
///
/// ```
/// use hpsweep::algorithm::{Algorithm, LocalSearch};
/// use hpsweep::ledger::ResultsLedger;
/// use hpsweep::parameter::Parameter;
/// use hpsweep::value::{Configuration, Value};
/// use hpsweep::Direction;
///
/// let space = vec![Parameter::continuous("lr", 1e-4, 1.0)];
/// let mut seed = Configuration::new();
/// seed.insert("lr".into(), Value::Float(0.1));
///
/// let mut search = LocalSearch::new(seed.clone()).repeat_trials(2);
/// let ledger = ResultsLedger::new();
/// for _ in 0..2 {
///     let s = search.get_suggestion(&space, &ledger, Direction::Minimize).unwrap();
///     assert_eq!(s, Some(seed.clone()));
/// }
/// ```
pub struct LocalSearch {
    seed_configuration: Configuration,
    perturbation_factors: (f64, f64),
    repeat_trials: usize,
    rng: fastrand::Rng,
    count: usize,
    submitted: Vec<Configuration>,
    pending: Vec<Configuration>,
}

impl LocalSearch {
    /// Creates a local search starting from `seed_configuration`.
    ///
    /// Defaults: perturbation factors `(0.9, 1.1)`, one repeat per
    /// configuration.
    #[must_use]
    pub fn new(seed_configuration: Configuration) -> Self {
        Self {
            seed_configuration,
            perturbation_factors: (0.9, 1.1),
            repeat_trials: 1,
            rng: fastrand::Rng::new(),
            count: 0,
            submitted: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Sets the factors used to decrease and increase numeric parameters.
    #[must_use]
    pub fn perturbation_factors(mut self, decrease: f64, increase: f64) -> Self {
        self.perturbation_factors = (decrease, increase);
        self
    }

    /// Sets how many times each configuration is emitted, to average out
    /// noisy training runs.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    #[must_use]
    pub fn repeat_trials(mut self, n: usize) -> Self {
        assert!(n >= 1, "repeat_trials must be >= 1, got {n}");
        self.repeat_trials = n;
        self
    }

    /// Fixes the RNG seed used to order the neighbourhood.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// The configuration the search is currently centred on.
    #[must_use]
    pub fn center(&self) -> &Configuration {
        &self.seed_configuration
    }

    fn check_space(&self, parameters: &[Parameter]) -> Result<()> {
        parameter::validate_space(parameters)?;
        for p in parameters {
            if matches!(p, Parameter::Choice { .. }) {
                return Err(Error::UnsupportedParameter {
                    algorithm: "LocalSearch",
                    parameter: p.name().to_owned(),
                    kind: p.kind(),
                });
            }
            if !self.seed_configuration.contains_key(p.name()) {
                return Err(Error::MissingParameter(p.name().to_owned()));
            }
        }
        Ok(())
    }

    fn perturb(&self, parameter: &Parameter, increase: bool) -> Configuration {
        let mut candidate = self.seed_configuration.clone();
        if let Some(value) = candidate.get_mut(parameter.name()) {
            *value = match parameter {
                Parameter::Ordinal { .. } => {
                    shift_ordinal(parameter, value, if increase { 1 } else { -1 })
                }
                _ => {
                    let (dec, inc) = self.perturbation_factors;
                    scale_value(parameter, value, if increase { inc } else { dec })
                }
            };
        }
        candidate
    }

    fn next_candidate(
        &mut self,
        parameters: &[Parameter],
        results: &ResultsLedger,
        direction: Direction,
    ) -> Result<Option<Configuration>> {
        self.count += 1;
        if self.count == 1 {
            self.submitted.push(self.seed_configuration.clone());
            return Ok(Some(self.seed_configuration.clone()));
        }

        let best = results
            .query()
            .sorted(direction)
            .fetch()
            .into_iter()
            .find(|r| !r.objective.is_nan());
        if let Some(best) = best {
            self.seed_configuration = best.configuration(parameters)?;
        }

        let mut order: Vec<usize> = (0..parameters.len()).collect();
        self.rng.shuffle(&mut order);
        for idx in order {
            let mut moves = [true, false];
            self.rng.shuffle(&mut moves);
            for increase in moves {
                let candidate = self.perturb(&parameters[idx], increase);
                if !self.submitted.contains(&candidate) {
                    self.submitted.push(candidate.clone());
                    return Ok(Some(candidate));
                }
            }
        }

        trace_debug!(
            submitted = self.submitted.len(),
            "all local perturbations exhausted"
        );
        Ok(None)
    }
}

impl Algorithm for LocalSearch {
    fn get_suggestion(
        &mut self,
        parameters: &[Parameter],
        results: &ResultsLedger,
        direction: Direction,
    ) -> Result<Option<Configuration>> {
        self.check_space(parameters)?;
        if let Some(next) = self.pending.pop() {
            return Ok(Some(next));
        }
        let Some(candidate) = self.next_candidate(parameters, results, direction)? else {
            return Ok(None);
        };
        self.pending = vec![candidate.clone(); self.repeat_trials - 1];
        Ok(Some(candidate))
    }

    fn load(&mut self, num_trials: usize) {
        self.count = num_trials.div_ceil(self.repeat_trials);
    }
}
