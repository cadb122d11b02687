#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Hyperparameter search for iterative training jobs: random, grid, local,
//! Bayesian and population based search, early stopping, and Hyperband-style
//! bandit drivers, all reading from and writing to one append-only results
//! ledger.
//!
//! # Getting Started
//!
//! ```
//! use hpsweep::prelude::*;
//!
//! let space = vec![
//!     Parameter::continuous("lr", 1e-4, 1e-1).log_scale(),
//!     Parameter::choice("activation", vec!["relu", "tanh"]),
//! ];
//! let study = Study::builder(space)
//!     .minimize()
//!     .algorithm(RandomSearch::with_seed(7).max_num_trials(10))
//!     .build()
//!     .unwrap();
//!
//! while let Some(trial) = study.get_suggestion().unwrap() {
//!     let lr = trial.get_f64("lr").unwrap();
//!     study.add_observation(&trial, 1, (lr.log10() + 2.0).powi(2)).unwrap();
//!     study.finalize(&trial, Status::Completed).unwrap();
//! }
//!
//! let best = study.best().unwrap();
//! println!("best objective {:.4} from trial {}", best.objective, best.trial_id);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Parameter`](parameter::Parameter) | One hyperparameter: Choice, Ordinal, Discrete or Continuous. |
//! | [`ResultsLedger`](ledger::ResultsLedger) | Append-only table of observations shared by every component. |
//! | [`Algorithm`](algorithm::Algorithm) | Proposes the next configuration, or `None` when exhausted. |
//! | [`StoppingRule`](stopping::StoppingRule) | Decides whether a running trial stops early. |
//! | [`Hyperband`](bandit::Hyperband) | Allocates epochs across trials through a [`TrialBackend`](bandit::TrialBackend). |
//! | [`Study`] | Ties a space, an algorithm, a stopping rule and a ledger together. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `sqlite` | [`SqliteLedger`](ledger::SqliteLedger), a `SQLite`-backed ledger | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod algorithm;
pub mod bandit;
mod error;
pub mod ledger;
pub mod parameter;
mod rng_util;
pub mod stopping;
mod study;
mod trial;
mod types;
pub mod value;

pub use error::{Error, Result};
pub use study::{Study, StudyBuilder};
pub use trial::Trial;
pub use types::{Direction, Status};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use hpsweep::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algorithm::{
        Algorithm, BayesianOptimization, GridSearch, GrowingSearch, LocalSearch,
        PopulationBasedTraining, RandomSearch,
    };
    pub use crate::bandit::{
        BanditSchedule, Hyperband, Hyperbayes, Legoband, NaturalSelection, RunSummary,
        SequentialDriver, Submission, SurvivorPolicy, TrialBackend,
    };
    pub use crate::error::{Error, Result};
    pub use crate::ledger::{JournalLedger, ResultsLedger, Row};
    pub use crate::parameter::Parameter;
    pub use crate::stopping::{MedianStoppingRule, StoppingRule};
    pub use crate::study::{Study, StudyBuilder};
    pub use crate::trial::Trial;
    pub use crate::types::{Direction, Status};
    pub use crate::value::{Configuration, Value};
}
