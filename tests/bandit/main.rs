#![allow(clippy::cast_precision_loss)]

mod hyperband;
mod natural_selection;
mod sequential;

use hpsweep::Status;
use hpsweep::bandit::{Submission, TrialBackend};
use hpsweep::ledger::ResultsLedger;

/// A backend that queues submissions and "trains" them on `wait_all`.
///
/// The loss of a trial is `(x - 0.3)^2 + 1 / epochs_trained`, so more
/// training and a better `x` both help.
pub(crate) struct SimulatedBackend {
    ledger: ResultsLedger,
    queue: Vec<Submission>,
    pub(crate) log: Vec<Submission>,
}

impl SimulatedBackend {
    pub(crate) fn new(ledger: &ResultsLedger) -> Self {
        Self {
            ledger: ledger.clone(),
            queue: Vec::new(),
            log: Vec::new(),
        }
    }
}

impl TrialBackend for SimulatedBackend {
    fn submit(&mut self, submission: Submission) -> hpsweep::Result<()> {
        self.log.push(submission.clone());
        self.queue.push(submission);
        Ok(())
    }

    fn wait_all(&mut self) -> hpsweep::Result<()> {
        for s in self.queue.drain(..) {
            let done = self.ledger.final_row(s.trial.id()).map_or(0, |r| r.iteration);
            assert_eq!(s.resumed, done > 0, "resumed flag of trial {}", s.trial.id());
            let trained = done + s.epochs;
            let x = s.trial.get_f64("x").unwrap_or(0.0);
            let loss = (x - 0.3).powi(2) + 1.0 / trained as f64;
            self.ledger.record(&s.trial, trained, loss, Status::Completed)?;
        }
        Ok(())
    }
}
