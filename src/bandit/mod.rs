//! Bandit-style drivers that allocate training epochs across trials.
//!
//! A driver asks an [`Algorithm`](crate::algorithm::Algorithm) for fresh
//! configurations, hands trials to a [`TrialBackend`] together with an epoch
//! budget, waits for the backend to report, and reads the
//! [`ResultsLedger`](crate::ledger::ResultsLedger) to decide which trials
//! continue.
//!
//! | Driver | Schedule |
//! |--------|----------|
//! | [`Hyperband`] | Successive-halving brackets from [`BanditSchedule`] |
//! | [`NaturalSelection`] | Halving slots, doubling epochs, best survivors promoted |
//! | [`SequentialDriver`] | A fixed number of trials with a fixed budget |
//!
//! Every trial a driver creates carries a `Run` key naming its bracket (or
//! generation); the backend records it with every row so the ledger can be
//! queried per run.

mod hyperband;
mod natural_selection;
mod schedule;
mod sequential;

use core::time::Duration;

pub use hyperband::{Hyperband, HyperbandBuilder, Hyperbayes, Legoband, SurvivorPolicy};
pub use natural_selection::NaturalSelection;
pub use schedule::{BanditSchedule, Bracket, Rung};
pub use sequential::SequentialDriver;

use crate::error::Result;
use crate::ledger::Row;
use crate::trial::Trial;

/// One unit of work handed to the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    /// The trial to train. Its parameters include the `Run` key.
    pub trial: Trial,
    /// Epochs to train in this submission.
    pub epochs: u64,
    /// `true` when the trial was trained before and should continue from
    /// its checkpoint.
    pub resumed: bool,
}

/// The execution backend a driver dispatches trials to.
///
/// Implementations train the trial's model and write its observations with
/// [`ResultsLedger::record`](crate::ledger::ResultsLedger::record).
pub trait TrialBackend {
    /// Starts (or queues) a submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission cannot be dispatched.
    fn submit(&mut self, submission: Submission) -> Result<()>;

    /// Blocks until every submitted trial has reported.
    ///
    /// # Errors
    ///
    /// Returns an error if a submitted trial could not be completed.
    fn wait_all(&mut self) -> Result<()>;
}

/// What a driver did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    /// Distinct trials created.
    pub trials: usize,
    /// Submissions made, resumptions included.
    pub submissions: usize,
    /// Epochs the full schedule allocates.
    pub total_epochs: u64,
    /// Projected wall time of the whole schedule, from timing the first
    /// submission.
    pub estimated_duration: Option<Duration>,
    /// The best completed observation at the end of the run.
    pub best: Option<Row>,
}

/// Projects the wall time of `total_epochs` from one submission of `epochs`
/// that took `elapsed`, and logs it.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn estimate_duration(elapsed: Duration, total_epochs: u64, epochs: u64) -> Duration {
    let secs = elapsed.as_secs_f64() * total_epochs as f64 / epochs.max(1) as f64;
    let estimate = Duration::from_secs_f64(secs);
    trace_info!(
        hours = estimate.as_secs() / 3600,
        minutes = (estimate.as_secs() % 3600) / 60,
        "estimated duration of the complete optimization"
    );
    estimate
}
