//! Hyperband driver and its variants.
//!
//! Hyperband runs every bracket of a [`BanditSchedule`] in turn. The fresh
//! rung of a bracket asks the algorithm for `n_0` configurations and trains
//! each for `r_0` epochs; every later rung keeps the `n_i` best trials of
//! the same run and trains them further.
//!
//! The same driver covers several variants:
//!
//! | Variant | Algorithm | Survivors | Growth |
//! |---------|-----------|-----------|--------|
//! | Hyperband | [`RandomSearch`](crate::algorithm::RandomSearch) | [`SurvivorPolicy::TopK`] | off |
//! | Temperature Hyperband | any | [`SurvivorPolicy::Temperature`] | off |
//! | [`Hyperbayes`] | [`BayesianOptimization`] | [`SurvivorPolicy::TopK`] | off |
//! | [`Legoband`] | [`GrowingSearch`] | [`SurvivorPolicy::TopK`] | on |
//!
//! With growth on, the driver waits for each submission to report and then
//! grows the algorithm's distribution by `+r_i` around the trial's
//! configuration if it is the best of its run, or by `-r_i` otherwise.
//!
//! # Example
//!
//! ```
//! use hpsweep::algorithm::RandomSearch;
//! use hpsweep::bandit::{Hyperband, Submission, TrialBackend};
//! use hpsweep::ledger::ResultsLedger;
//! use hpsweep::parameter::Parameter;
//! use hpsweep::{Direction, Status};
//!
//! struct Quadratic(ResultsLedger);
//!
//! impl TrialBackend for Quadratic {
//!     fn submit(&mut self, s: Submission) -> hpsweep::Result<()> {
//!         let x = s.trial.get_f64("x").unwrap();
//!         let iteration = self.0.final_row(s.trial.id()).map_or(0, |r| r.iteration);
//!         self.0.record(&s.trial, iteration + s.epochs, x * x, Status::Completed)
//!     }
//!
//!     fn wait_all(&mut self) -> hpsweep::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let space = vec![Parameter::continuous("x", -1.0, 1.0)];
//! let ledger = ResultsLedger::new();
//! let mut backend = Quadratic(ledger.clone());
//!
//! let mut hyperband = Hyperband::builder(RandomSearch::with_seed(5))
//!     .max_epochs(9)
//!     .eta(3)
//!     .build();
//! let summary = hyperband.run(&space, &ledger, Direction::Minimize, &mut backend).unwrap();
//!
//! assert_eq!(summary.total_epochs, hyperband.schedule().total_epochs());
//! assert!(summary.best.is_some());
//! ```

use std::collections::BTreeMap;
use std::time::Instant;

use super::schedule::{BanditSchedule, Bracket, Rung};
use super::{RunSummary, Submission, TrialBackend, estimate_duration};
use crate::algorithm::{Algorithm, BayesianOptimization, GrowingSearch};
use crate::error::Result;
use crate::ledger::{ResultsLedger, columns};
use crate::parameter::{self, Parameter};
use crate::rng_util;
use crate::trial::Trial;
use crate::types::Direction;
use crate::value::Value;

/// How the survivors of a rung are chosen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurvivorPolicy {
    /// Keep the `n_i` best trials of the run (NaN last, ties to the earliest
    /// Trial-ID).
    TopK,
    /// Sample `n_i` trials without replacement, weighted by a softmax over
    /// the objectives divided by the temperature. NaN objectives get zero
    /// weight.
    Temperature(f64),
}

/// Hyperband with Bayesian optimization proposing the fresh configurations.
pub type Hyperbayes = Hyperband<BayesianOptimization>;

/// Hyperband over a [`GrowingSearch`], built with distribution growth on.
pub type Legoband = Hyperband<GrowingSearch>;

/// Runs the Hyperband schedule over an [`Algorithm`].
pub struct Hyperband<A> {
    algorithm: A,
    schedule: BanditSchedule,
    policy: SurvivorPolicy,
    grow_distributions: bool,
    rng: fastrand::Rng,
}

impl<A: Algorithm> Hyperband<A> {
    /// Starts a builder around `algorithm`.
    pub fn builder(algorithm: A) -> HyperbandBuilder<A> {
        HyperbandBuilder::new(algorithm)
    }

    /// The bracket schedule this driver runs.
    #[must_use]
    pub fn schedule(&self) -> &BanditSchedule {
        &self.schedule
    }

    /// The wrapped algorithm.
    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    /// Runs every bracket, submitting work to `backend`.
    ///
    /// The backend must record each submission's observations in `ledger`
    /// before [`TrialBackend::wait_all`] returns. Once the algorithm returns
    /// `None`, no more fresh configurations are submitted but surviving
    /// trials are still promoted.
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
        let total_epochs = self.schedule.total_epochs();
        let brackets = self.schedule.brackets().to_vec();
        let mut summary = RunSummary {
            total_epochs,
            ..RunSummary::default()
        };
        let mut trials: BTreeMap<u64, Trial> = BTreeMap::new();
        let mut exhausted = false;

        for bracket in &brackets {
            trace_info!(
                run = bracket.run,
                s = bracket.s,
                n = bracket.n,
                "starting bracket"
            );
            for rung in &bracket.rungs {
                trace_debug!(
                    run = bracket.run,
                    rung = rung.index,
                    trials = rung.trials,
                    epochs = rung.epochs,
                    "starting rung"
                );
                if rung.index == 0 {
                    if exhausted {
                        continue;
                    }
                    exhausted = self.fresh_rung(
                        bracket,
                        rung,
                        parameters,
                        ledger,
                        direction,
                        backend,
                        &mut trials,
                        &mut summary,
                    )?;
                } else {
                    backend.wait_all()?;
                    let survivors = self.select_survivors(ledger, rung.trials, bracket.run, direction);
                    for id in survivors {
                        let Some(trial) = trials.get(&id).cloned() else {
                            continue;
                        };
                        self.submit(backend, trial, rung.epochs, true, &mut summary)?;
                        self.grow_after(ledger, bracket.run, id, &trials, rung.epochs, direction, backend)?;
                    }
                }
            }
        }
        backend.wait_all()?;

        summary.trials = trials.len();
        summary.best = ledger.best_row(direction);
        Ok(summary)
    }

    /// Submits the fresh configurations of a bracket. Returns `true` once
    /// the algorithm is exhausted.
    #[allow(clippy::too_many_arguments)]
    fn fresh_rung(
        &mut self,
        bracket: &Bracket,
        rung: &Rung,
        parameters: &[Parameter],
        ledger: &ResultsLedger,
        direction: Direction,
        backend: &mut impl TrialBackend,
        trials: &mut BTreeMap<u64, Trial>,
        summary: &mut RunSummary,
    ) -> Result<bool> {
        for _ in 0..rung.trials {
            let Some(mut config) = self.algorithm.get_suggestion(parameters, ledger, direction)? else {
                trace_info!(run = bracket.run, "algorithm exhausted, no more fresh trials");
                return Ok(true);
            };
            config.insert(columns::RUN.to_owned(), Value::Int(bracket.run));
            let trial = Trial::new(ledger.next_trial_id(), config);
            let id = trial.id();
            trials.insert(id, trial.clone());

            if summary.submissions == 0 {
                let start = Instant::now();
                self.submit(backend, trial, rung.epochs, false, summary)?;
                backend.wait_all()?;
                summary.estimated_duration =
                    Some(estimate_duration(start.elapsed(), summary.total_epochs, rung.epochs));
            } else {
                self.submit(backend, trial, rung.epochs, false, summary)?;
            }
            self.grow_after(ledger, bracket.run, id, trials, rung.epochs, direction, backend)?;
        }
        Ok(false)
    }

    fn submit(
        &self,
        backend: &mut impl TrialBackend,
        trial: Trial,
        epochs: u64,
        resumed: bool,
        summary: &mut RunSummary,
    ) -> Result<()> {
        trace_debug!(trial_id = trial.id(), epochs, resumed, "submitting trial");
        backend.submit(Submission {
            trial,
            epochs,
            resumed,
        })?;
        summary.submissions += 1;
        Ok(())
    }

    #[allow(clippy::too_many_arguments, clippy::cast_precision_loss)]
    fn grow_after(
        &mut self,
        ledger: &ResultsLedger,
        run: i64,
        trial_id: u64,
        trials: &BTreeMap<u64, Trial>,
        epochs: u64,
        direction: Direction,
        backend: &mut impl TrialBackend,
    ) -> Result<()> {
        if !self.grow_distributions {
            return Ok(());
        }
        let Some(trial) = trials.get(&trial_id) else {
            return Ok(());
        };
        backend.wait_all()?;
        let best = ledger.k_best_from_run(1, run, direction).first().copied();
        let amount = if best == Some(trial_id) {
            epochs as f64
        } else {
            -(epochs as f64)
        };
        self.algorithm.grow(trial.parameters(), amount);
        Ok(())
    }

    fn select_survivors(&mut self, ledger: &ResultsLedger, k: usize, run: i64, direction: Direction) -> Vec<u64> {
        match self.policy {
            SurvivorPolicy::TopK => ledger.k_best_from_run(k, run, direction),
            SurvivorPolicy::Temperature(temperature) => {
                let rows = ledger.query().final_only().run(run).fetch();
                let ids: Vec<u64> = rows.iter().map(|r| r.trial_id).collect();
                let objectives: Vec<f64> = rows.iter().map(|r| r.objective).collect();
                let weights = softmax_weights(&objectives, temperature, direction);
                sample_without_replacement(&mut self.rng, &ids, weights, k)
            }
        }
    }
}

/// Softmax weights over direction-normalized objectives. NaN gets zero.
pub(crate) fn softmax_weights(objectives: &[f64], temperature: f64, direction: Direction) -> Vec<f64> {
    let sign = if direction.lower_is_better() { -1.0 } else { 1.0 };
    let scores: Vec<f64> = objectives.iter().map(|&o| sign * o / temperature).collect();
    let max = scores
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    scores
        .iter()
        .map(|&s| if s.is_finite() { (s - max).exp() } else { 0.0 })
        .collect()
}

fn sample_without_replacement(rng: &mut fastrand::Rng, ids: &[u64], mut weights: Vec<f64>, k: usize) -> Vec<u64> {
    let mut pool: Vec<u64> = ids.to_vec();
    let mut picked = Vec::with_capacity(k.min(pool.len()));
    while picked.len() < k && !pool.is_empty() {
        let i = rng_util::weighted_index(rng, &weights);
        picked.push(pool.swap_remove(i));
        weights.swap_remove(i);
    }
    picked
}

/// Builder for [`Hyperband`].
///
/// | Option | Default |
/// |--------|---------|
/// | `max_epochs` | 20 |
/// | `eta` | 3 |
/// | `survivors` | [`SurvivorPolicy::TopK`] |
/// | `grow_distributions` | `false` |
pub struct HyperbandBuilder<A> {
    algorithm: A,
    max_epochs: u64,
    eta: u64,
    policy: SurvivorPolicy,
    grow_distributions: bool,
    seed: Option<u64>,
}

impl<A: Algorithm> HyperbandBuilder<A> {
    fn new(algorithm: A) -> Self {
        Self {
            algorithm,
            max_epochs: 20,
            eta: 3,
            policy: SurvivorPolicy::TopK,
            grow_distributions: false,
            seed: None,
        }
    }

    /// Sets `R`, the most epochs a trial trains in one rung.
    ///
    /// # Panics
    ///
    /// Panics if `max_epochs` is 0.
    #[must_use]
    pub fn max_epochs(mut self, max_epochs: u64) -> Self {
        assert!(max_epochs > 0, "max_epochs must be > 0, got {max_epochs}");
        self.max_epochs = max_epochs;
        self
    }

    /// Sets the reduction factor.
    ///
    /// # Panics
    ///
    /// Panics if `eta` is less than 2.
    #[must_use]
    pub fn eta(mut self, eta: u64) -> Self {
        assert!(eta >= 2, "eta must be >= 2, got {eta}");
        self.eta = eta;
        self
    }

    /// Sets the survivor policy.
    ///
    /// # Panics
    ///
    /// Panics if a temperature is not positive and finite.
    #[must_use]
    pub fn survivors(mut self, policy: SurvivorPolicy) -> Self {
        if let SurvivorPolicy::Temperature(t) = policy {
            assert!(t.is_finite() && t > 0.0, "temperature must be positive, got {t}");
        }
        self.policy = policy;
        self
    }

    /// Shorthand for `survivors(SurvivorPolicy::Temperature(temperature))`.
    #[must_use]
    pub fn temperature(self, temperature: f64) -> Self {
        self.survivors(SurvivorPolicy::Temperature(temperature))
    }

    /// Grows the algorithm's distribution after every submission.
    #[must_use]
    pub fn grow_distributions(mut self, enabled: bool) -> Self {
        self.grow_distributions = enabled;
        self
    }

    /// Seeds the survivor sampler.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the driver.
    #[must_use]
    pub fn build(self) -> Hyperband<A> {
        Hyperband {
            algorithm: self.algorithm,
            schedule: BanditSchedule::new(self.max_epochs, self.eta),
            policy: self.policy,
            grow_distributions: self.grow_distributions,
            rng: self.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed),
        }
    }
}

impl Legoband {
    /// Hyperband over a [`GrowingSearch`] with distribution growth on.
    #[must_use]
    pub fn legoband(search: GrowingSearch, max_epochs: u64, eta: u64) -> Self {
        Hyperband::builder(search)
            .max_epochs(max_epochs)
            .eta(eta)
            .grow_distributions(true)
            .build()
    }
}
