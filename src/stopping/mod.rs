//! Early-stopping rules.
//!
//! A [`StoppingRule`] is consulted after a trial reports an intermediate
//! observation and decides whether the trial should be stopped before it
//! completes.

mod median;

pub use median::MedianStoppingRule;

use crate::ledger::ResultsLedger;
use crate::trial::Trial;
use crate::types::Direction;

/// Trait for pluggable early-stopping strategies.
///
/// # Implementing a custom rule
///
/// ```
/// use hpsweep::ledger::ResultsLedger;
/// use hpsweep::stopping::StoppingRule;
/// use hpsweep::{Direction, Trial};
///
/// struct Threshold(f64);
///
/// impl StoppingRule for Threshold {
///     fn should_trial_stop(&self, trial: &Trial, results: &ResultsLedger, _: Direction) -> bool {
///         results
///             .final_row(trial.id())
///             .is_some_and(|row| row.objective > self.0)
///     }
/// }
/// ```
pub trait StoppingRule: Send + Sync {
    /// Returns `true` if `trial` should stop now.
    fn should_trial_stop(&self, trial: &Trial, results: &ResultsLedger, direction: Direction) -> bool;
}
