#![allow(
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

mod bayesian;
mod grid;
mod local_search;
mod pbt;
mod random;

use hpsweep::ledger::ResultsLedger;
use hpsweep::value::Configuration;
use hpsweep::{Status, Trial};

/// Records `config` as a new completed trial and returns its id.
pub(crate) fn complete(ledger: &ResultsLedger, config: Configuration, objective: f64) -> u64 {
    let trial = Trial::new(ledger.next_trial_id(), config);
    ledger.record(&trial, 1, objective, Status::Completed).unwrap();
    trial.id()
}
