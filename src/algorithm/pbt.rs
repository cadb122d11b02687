//! Population based training.
//!
//! Trials are grouped into generations of `population_size` consecutive
//! Trial-IDs. The first generation is sampled at random. Every later trial
//! picks an ancestor uniformly from the top third of the previous
//! generation's completed trials, perturbs its hyperparameters and resumes
//! from the ancestor's checkpoint.
//!
//! Each suggestion carries three bookkeeping keys:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `save_to` | checkpoint written by this trial (its running count) |
//! | `load_from` | checkpoint to resume from (`""` in generation 1) |
//! | `lineage` | comma-terminated chain of ancestor checkpoints |
//!
//! The running count equals the Trial-ID when the
//! [`Study`](crate::Study) assigns ids, so generation `g` covers
//! Trial-IDs `(g-1)*P + 1 ..= g*P`.

use std::collections::BTreeMap;

use crate::algorithm::{Algorithm, RandomSearch, scale_value, shift_ordinal};
use crate::error::{Error, Result};
use crate::ledger::{ResultsLedger, columns};
use crate::parameter::{self, Parameter};
use crate::types::Direction;
use crate::value::{Configuration, Value};

/// Population based training (Jaderberg et al., 2017).
///
/// # Examples
///
/// ```
/// use hpsweep::algorithm::PopulationBasedTraining;
/// use hpsweep::parameter::Parameter;
///
/// let pbt = PopulationBasedTraining::new(10)
///     .perturbation_factors(vec![0.5, 1.0, 2.0])
///     .parameter_range(Parameter::continuous("lr", 1e-5, 1.0))
///     .seed(7);
/// assert_eq!(pbt.generation(), 0);
/// ```
pub struct PopulationBasedTraining {
    population_size: usize,
    parameter_range: BTreeMap<String, Parameter>,
    perturbation_factors: Vec<f64>,
    rng: fastrand::Rng,
    random: RandomSearch,
    generation: usize,
    count: usize,
}

impl PopulationBasedTraining {
    /// Creates PBT with generations of `population_size` trials.
    ///
    /// Defaults: perturbation factors `{0.8, 1.0, 1.2}`, no range overrides.
    ///
    /// # Panics
    ///
    /// Panics if `population_size` is 0.
    #[must_use]
    pub fn new(population_size: usize) -> Self {
        assert!(population_size >= 1, "population_size must be >= 1, got {population_size}");
        Self {
            population_size,
            parameter_range: BTreeMap::new(),
            perturbation_factors: vec![0.8, 1.0, 1.2],
            rng: fastrand::Rng::new(),
            random: RandomSearch::new(),
            generation: 0,
            count: 0,
        }
    }

    /// Sets the factors numeric parameters are multiplied by; one is drawn
    /// per parameter and perturbation.
    ///
    /// # Panics
    ///
    /// Panics if `factors` is empty.
    #[must_use]
    pub fn perturbation_factors(mut self, factors: Vec<f64>) -> Self {
        assert!(!factors.is_empty(), "perturbation_factors cannot be empty");
        self.perturbation_factors = factors;
        self
    }

    /// Overrides the bounds (or value list) a parameter may be perturbed
    /// within. The override is matched to the search space by name and only
    /// supplies bounds: a Discrete parameter stays integer even under a
    /// Continuous override.
    #[must_use]
    pub fn parameter_range(mut self, range: Parameter) -> Self {
        self.parameter_range.insert(range.name().to_owned(), range);
        self
    }

    /// Fixes the RNG seed for sampling and perturbation.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self.random = RandomSearch::with_seed(seed.wrapping_add(1));
        self
    }

    /// The generation of the most recent suggestion (0 before the first).
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// The population size.
    #[must_use]
    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// Draws an ancestor from the top third of the previous generation.
    fn ancestor(
        &mut self,
        results: &ResultsLedger,
        direction: Direction,
    ) -> Result<crate::ledger::Row> {
        let pop = self.population_size as u64;
        let generation = self.generation as u64;
        let from = (generation - 2) * pop + 1;
        let to = (generation - 1) * pop;
        let population: Vec<_> = results
            .query()
            .final_only()
            .completed()
            .sorted(direction)
            .fetch()
            .into_iter()
            .filter(|r| (from..=to).contains(&r.trial_id))
            .collect();
        if population.is_empty() {
            return Err(Error::EmptyGeneration {
                generation: self.generation - 1,
            });
        }
        let top = (self.population_size / 3).max(1).min(population.len());
        let idx = self.rng.usize(0..top);
        Ok(population[idx].clone())
    }

    fn perturb(&mut self, parameters: &[Parameter], candidate: &mut Configuration) {
        for p in parameters {
            let range = match self.parameter_range.get(p.name()) {
                Some(range) => perturbation_range(p, range),
                None => p.clone(),
            };
            let range = &range;
            let Some(value) = candidate.get_mut(p.name()) else {
                continue;
            };
            match p {
                Parameter::Continuous { .. } | Parameter::Discrete { .. } => {
                    let factor = self.perturbation_factors[self.rng.usize(0..self.perturbation_factors.len())];
                    *value = scale_value(range, value, factor);
                }
                Parameter::Ordinal { .. } => {
                    let shift = self.rng.isize(-1..=1);
                    *value = shift_ordinal(range, value, shift);
                }
                Parameter::Choice { .. } => {
                    trace_warn!(
                        parameter = p.name(),
                        "choice parameters are not perturbed by population based training"
                    );
                }
            }
        }
    }
}

/// The space parameter `p` narrowed to the bounds or values of `range`,
/// keeping the variant and scale of `p` so perturbed values keep their type.
/// Falls back to `p` when `range` has no usable bounds for it.
#[allow(clippy::cast_possible_truncation)]
fn perturbation_range(p: &Parameter, range: &Parameter) -> Parameter {
    match (p, range.bounds(), range.values()) {
        (Parameter::Continuous { name, scale, .. }, Some((low, high)), _) => Parameter::Continuous {
            name: name.clone(),
            low,
            high,
            scale: *scale,
        },
        (Parameter::Discrete { name, scale, .. }, Some((low, high)), _)
            if low.ceil() <= high.floor() =>
        {
            Parameter::Discrete {
                name: name.clone(),
                low: low.ceil() as i64,
                high: high.floor() as i64,
                scale: *scale,
            }
        }
        (Parameter::Ordinal { name, .. }, _, Some(values)) if !values.is_empty() => {
            Parameter::Ordinal {
                name: name.clone(),
                range: values.to_vec(),
            }
        }
        _ => {
            trace_warn!(
                parameter = p.name(),
                "perturbation range does not fit the parameter, using its own range"
            );
            p.clone()
        }
    }
}

impl Default for PopulationBasedTraining {
    fn default() -> Self {
        Self::new(20)
    }
}

fn text(row: &crate::ledger::Row, column: &str) -> Result<String> {
    row.columns
        .get(column)
        .map(ToString::to_string)
        .ok_or_else(|| Error::MissingParameter(column.to_owned()))
}

impl Algorithm for PopulationBasedTraining {
    fn get_suggestion(
        &mut self,
        parameters: &[Parameter],
        results: &ResultsLedger,
        direction: Direction,
    ) -> Result<Option<Configuration>> {
        parameter::validate_space(parameters)?;
        for range in self.parameter_range.values() {
            range.validate()?;
        }
        self.count += 1;
        if (self.count - 1) % self.population_size == 0 {
            self.generation += 1;
        }

        if self.generation == 1 {
            let Some(mut config) = self.random.get_suggestion(parameters, results, direction)?
            else {
                return Ok(None);
            };
            config.insert(columns::LINEAGE.into(), Value::from(""));
            config.insert(columns::LOAD_FROM.into(), Value::from(""));
            config.insert(columns::SAVE_TO.into(), Value::from(self.count.to_string()));
            return Ok(Some(config));
        }

        let ancestor = self.ancestor(results, direction)?;
        let mut config = ancestor.configuration(parameters)?;
        self.perturb(parameters, &mut config);

        let load_from = text(&ancestor, columns::SAVE_TO)?;
        let lineage = format!("{}{load_from},", text(&ancestor, columns::LINEAGE)?);
        trace_debug!(
            generation = self.generation,
            load_from = %load_from,
            "population based training exploit"
        );
        config.insert(columns::LINEAGE.into(), Value::from(lineage));
        config.insert(columns::LOAD_FROM.into(), Value::from(load_from));
        config.insert(columns::SAVE_TO.into(), Value::from(self.count.to_string()));
        Ok(Some(config))
    }

    fn load(&mut self, num_trials: usize) {
        self.count = num_trials;
        self.generation = num_trials.div_ceil(self.population_size);
    }
}
