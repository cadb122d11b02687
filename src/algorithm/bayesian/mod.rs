//! Bayesian optimization with a Gaussian process surrogate.
//!
//! # Algorithm overview
//!
//! 1. **Seeding**: On the first call a seed list is built: every
//!    combination of the Choice parameters (with the remaining parameters
//!    drawn at random per combination), padded with purely random
//!    configurations up to `num_random_seeds`. The first suggestions replay
//!    this list in order, whatever the results.
//! 2. **Random fallback**: While the ledger holds no completed observation
//!    with a finite objective, suggestions are uniform random draws.
//! 3. **Model fit**: Completed rows are encoded into a design matrix (see
//!    [`DesignLayout`]) and a Gaussian process with a Matérn 5/2 kernel is
//!    fitted to their objectives.
//! 4. **Acquisition**: `num_candidates` random configurations are scored
//!    by [`expected_improvement`]. The best `num_refine` are refined with
//!    Nelder-Mead over their Continuous columns (everything else stays
//!    fixed) and the configuration with the highest refined score wins.
//!
//! If the Gaussian process cannot be fitted the suggestion falls back to a
//! random draw.
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `num_random_seeds` | 10 | Minimum length of the seed list |
//! | `max_num_trials` | unlimited | Suggestions before returning `None` |
//! | `acquisition_function` | `"ei"` | Only expected improvement is available |
//! | `n_restarts` | 10 | Extra random starts when fitting the length scale |
//! | `num_candidates` | 10 000 | Random candidates scored per suggestion |
//! | `num_refine` | 50 | Top candidates refined numerically |
//! | `noise` | 1e-4 | Value added to the kernel diagonal |
//! | `seed` | random | RNG seed |
//!
//! # Examples
//!
//! ```
//! use hpsweep::algorithm::BayesianOptimization;
//!
//! let bo = BayesianOptimization::builder()
//!     .num_random_seeds(5)
//!     .max_num_trials(40)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! let err = BayesianOptimization::builder().acquisition_function("ucb").build();
//! assert!(err.is_err());
//! ```

mod acquisition;
mod gp;
mod nelder_mead;

pub use acquisition::expected_improvement;

use self::gp::GaussianProcess;
use crate::algorithm::Algorithm;
use crate::algorithm::grid::{grid_point, grid_size};
use crate::error::{Error, Result};
use crate::ledger::{DesignLayout, ResultsLedger};
use crate::parameter::{self, Parameter};
use crate::types::Direction;
use crate::value::Configuration;

const DEFAULT_NUM_RANDOM_SEEDS: usize = 10;
const DEFAULT_N_RESTARTS: usize = 10;
const DEFAULT_NUM_CANDIDATES: usize = 10_000;
const DEFAULT_NUM_REFINE: usize = 50;
const DEFAULT_NOISE: f64 = 1e-4;
const EPSILON: f64 = 1e-5;

/// Gaussian-process Bayesian optimization with expected improvement.
pub struct BayesianOptimization {
    num_random_seeds: usize,
    max_num_trials: Option<usize>,
    n_restarts: usize,
    num_candidates: usize,
    num_refine: usize,
    noise: f64,
    rng: fastrand::Rng,
    seeds: Vec<Configuration>,
    count: usize,
}

impl BayesianOptimization {
    /// Creates an optimizer with default settings and a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            num_random_seeds: DEFAULT_NUM_RANDOM_SEEDS,
            max_num_trials: None,
            n_restarts: DEFAULT_N_RESTARTS,
            num_candidates: DEFAULT_NUM_CANDIDATES,
            num_refine: DEFAULT_NUM_REFINE,
            noise: DEFAULT_NOISE,
            rng: fastrand::Rng::new(),
            seeds: Vec::new(),
            count: 0,
        }
    }

    /// Creates an optimizer with default settings and a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            ..Self::new()
        }
    }

    /// Creates a builder for configuring a `BayesianOptimization`.
    #[must_use]
    pub fn builder() -> BayesianOptimizationBuilder {
        BayesianOptimizationBuilder::new()
    }

    /// The seed configurations, empty until the first suggestion.
    #[must_use]
    pub fn seed_configurations(&self) -> &[Configuration] {
        &self.seeds
    }

    fn generate_seeds(&mut self, parameters: &[Parameter]) {
        let (choice, other): (Vec<&Parameter>, Vec<&Parameter>) = parameters
            .iter()
            .partition(|p| matches!(p, Parameter::Choice { .. }));
        let other: Vec<Parameter> = other.into_iter().cloned().collect();

        if !choice.is_empty() {
            for i in 0..grid_size(&choice) {
                let mut config = grid_point(&choice, i);
                config.extend(parameter::sample_configuration(&other, &mut self.rng));
                self.seeds.push(config);
            }
        }
        while self.seeds.len() < self.num_random_seeds {
            self.seeds
                .push(parameter::sample_configuration(parameters, &mut self.rng));
        }
        trace_debug!(seeds = self.seeds.len(), "bayesian optimization seeds generated");
    }

    fn random(&mut self, parameters: &[Parameter]) -> Configuration {
        parameter::sample_configuration(parameters, &mut self.rng)
    }

    /// Fits the surrogate and maximizes expected improvement. Returns `None`
    /// when the surrogate cannot be fitted.
    fn model_suggestion(
        &mut self,
        parameters: &[Parameter],
        layout: &DesignLayout,
        x: &[Vec<f64>],
        y: &[f64],
        direction: Direction,
    ) -> Result<Option<Configuration>> {
        let best_y = direction.best_of(y.iter().copied());
        let Some(gp) = GaussianProcess::fit(x, y, self.noise, self.n_restarts, &mut self.rng)
        else {
            return Ok(None);
        };
        trace_debug!(
            observations = y.len(),
            length_scale = gp.length_scale(),
            "gaussian process fitted"
        );
        let acquisition = |row: &[f64]| {
            let (mean, std) = gp.predict(row);
            expected_improvement(mean, std, best_y, EPSILON, direction)
        };

        let mut candidates: Vec<Configuration> = (0..self.num_candidates.max(1))
            .map(|_| parameter::sample_configuration(parameters, &mut self.rng))
            .collect();
        let encoded = candidates
            .iter()
            .map(|c| layout.encode(parameters, c))
            .collect::<Result<Vec<_>>>()?;
        let utility: Vec<f64> = encoded
            .iter()
            .map(|row| {
                let u = acquisition(row);
                if u.is_nan() { f64::NEG_INFINITY } else { u }
            })
            .collect();

        let mut order: Vec<usize> = (0..utility.len()).collect();
        order.sort_by(|&a, &b| utility[b].total_cmp(&utility[a]));
        order.truncate(self.num_refine.max(1));

        let continuous = layout.continuous_columns();
        let bounds: Vec<(f64, f64)> = continuous
            .iter()
            .map(|&c| layout.columns()[c].bounds.unwrap_or((f64::MIN, f64::MAX)))
            .collect();

        let mut best: Option<(usize, Vec<f64>, f64)> = None;
        for idx in order {
            let row = &encoded[idx];
            let x0: Vec<f64> = continuous.iter().map(|&c| row[c]).collect();
            let (mut refined, mut value) = if continuous.is_empty() {
                (x0.clone(), utility[idx])
            } else {
                let (z, neg) = nelder_mead::minimize(
                    |z| {
                        let mut design = row.clone();
                        for (&c, v) in continuous.iter().zip(z) {
                            design[c] = *v;
                        }
                        -acquisition(&design)
                    },
                    &x0,
                    &bounds,
                );
                (z, -neg)
            };
            if value.is_nan() || value < utility[idx] {
                refined = x0;
                value = utility[idx];
            }
            if best.as_ref().is_none_or(|(_, _, v)| value > *v) {
                best = Some((idx, refined, value));
            }
        }

        let Some((idx, refined, value)) = best else {
            return Err(Error::Internal("no acquisition candidates"));
        };
        trace_debug!(expected_improvement = value, "acquisition maximized");
        let mut config = candidates.swap_remove(idx);
        for (&c, z) in continuous.iter().zip(&refined) {
            let name = parameters[layout.columns()[c].parameter].name();
            config.insert(name.to_owned(), layout.decode_continuous(c, *z));
        }
        Ok(Some(config))
    }
}

impl Default for BayesianOptimization {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for BayesianOptimization {
    fn get_suggestion(
        &mut self,
        parameters: &[Parameter],
        results: &ResultsLedger,
        direction: Direction,
    ) -> Result<Option<Configuration>> {
        parameter::validate_space(parameters)?;
        self.count += 1;
        if self.max_num_trials.is_some_and(|max| self.count > max) {
            return Ok(None);
        }

        if self.seeds.is_empty() {
            self.generate_seeds(parameters);
        }
        if let Some(seed) = self.seeds.get(self.count - 1) {
            return Ok(Some(seed.clone()));
        }

        let (design, y) = results.design_matrix(parameters)?;
        if y.is_empty() || design.layout.is_empty() {
            trace_info!("no completed observations yet, suggesting at random");
            return Ok(Some(self.random(parameters)));
        }

        match self.model_suggestion(parameters, &design.layout, &design.rows, &y, direction)? {
            Some(config) => Ok(Some(config)),
            None => {
                trace_warn!("gaussian process fit failed, suggesting at random");
                Ok(Some(self.random(parameters)))
            }
        }
    }

    fn load(&mut self, num_trials: usize) {
        self.count = num_trials;
    }
}

/// Builder for [`BayesianOptimization`].
///
/// All options have the defaults listed in the [module docs](self).
#[derive(Debug, Clone, Default)]
pub struct BayesianOptimizationBuilder {
    num_random_seeds: Option<usize>,
    max_num_trials: Option<usize>,
    acquisition_function: Option<String>,
    n_restarts: Option<usize>,
    num_candidates: Option<usize>,
    num_refine: Option<usize>,
    noise: Option<f64>,
    seed: Option<u64>,
}

impl BayesianOptimizationBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum number of seed configurations.
    ///
    /// Default: 10.
    #[must_use]
    pub fn num_random_seeds(mut self, n: usize) -> Self {
        self.num_random_seeds = Some(n);
        self
    }

    /// Ends suggestions with `None` after `n` calls, seeds included.
    #[must_use]
    pub fn max_num_trials(mut self, n: usize) -> Self {
        self.max_num_trials = Some(n);
        self
    }

    /// Selects the acquisition function. Only `"ei"` is implemented.
    #[must_use]
    pub fn acquisition_function(mut self, name: impl Into<String>) -> Self {
        self.acquisition_function = Some(name.into());
        self
    }

    /// Sets the number of random restarts of the length-scale fit.
    ///
    /// Default: 10.
    #[must_use]
    pub fn n_restarts(mut self, n: usize) -> Self {
        self.n_restarts = Some(n);
        self
    }

    /// Sets the number of random candidates scored per suggestion.
    ///
    /// Default: 10 000.
    #[must_use]
    pub fn num_candidates(mut self, n: usize) -> Self {
        self.num_candidates = Some(n);
        self
    }

    /// Sets how many of the best candidates are refined numerically.
    ///
    /// Default: 50.
    #[must_use]
    pub fn num_refine(mut self, n: usize) -> Self {
        self.num_refine = Some(n);
        self
    }

    /// Sets the value added to the kernel diagonal.
    ///
    /// Default: 1e-4.
    #[must_use]
    pub fn noise(mut self, noise: f64) -> Self {
        self.noise = Some(noise);
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the configured optimizer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAcquisition`] for any acquisition function
    /// other than `"ei"`.
    pub fn build(self) -> Result<BayesianOptimization> {
        if let Some(name) = self.acquisition_function
            && name != "ei"
        {
            return Err(Error::UnsupportedAcquisition(name));
        }
        let rng = self.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        Ok(BayesianOptimization {
            num_random_seeds: self.num_random_seeds.unwrap_or(DEFAULT_NUM_RANDOM_SEEDS),
            max_num_trials: self.max_num_trials,
            n_restarts: self.n_restarts.unwrap_or(DEFAULT_N_RESTARTS),
            num_candidates: self.num_candidates.unwrap_or(DEFAULT_NUM_CANDIDATES),
            num_refine: self.num_refine.unwrap_or(DEFAULT_NUM_REFINE),
            noise: self.noise.unwrap_or(DEFAULT_NOISE),
            rng,
            seeds: Vec::new(),
            count: 0,
        })
    }
}
