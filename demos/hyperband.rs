//! Hyperband, Hyperbayes and Natural Selection over a simulated backend.
//!
//! The backend trains every queued submission when the driver waits, and
//! records the resulting loss in the ledger.
//!
//! Run with: `cargo run --example hyperband`

use hpsweep::prelude::*;

/// Queues submissions and trains them on `wait_all`.
struct SimulatedBackend {
    ledger: ResultsLedger,
    queue: Vec<Submission>,
}

impl TrialBackend for SimulatedBackend {
    fn submit(&mut self, submission: Submission) -> Result<()> {
        self.queue.push(submission);
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn wait_all(&mut self) -> Result<()> {
        for s in self.queue.drain(..) {
            let done = self.ledger.final_row(s.trial.id()).map_or(0, |r| r.iteration);
            let trained = done + s.epochs;
            let lr = s.trial.get_f64("lr").unwrap_or(1e-3);
            let width = s.trial.get_i64("width").unwrap_or(16);
            let loss = (lr.log10() + 2.0).powi(2)
                + 0.01 * (width as f64 - 64.0).abs() / 64.0
                + 1.0 / trained as f64;
            self.ledger.record(&s.trial, trained, loss, Status::Completed)?;
        }
        Ok(())
    }
}

fn report(name: &str, summary: &RunSummary) {
    println!(
        "{name}: {} trials, {} submissions, {} epochs scheduled",
        summary.trials, summary.submissions, summary.total_epochs
    );
    if let Some(best) = &summary.best {
        println!("  best loss {:.4} (trial {})", best.objective, best.trial_id);
    }
}

fn main() -> Result<()> {
    let space = vec![
        Parameter::continuous("lr", 1e-4, 1e-1).log_scale(),
        Parameter::discrete("width", 8, 128),
    ];

    let schedule = BanditSchedule::new(27, 3);
    for bracket in schedule.brackets() {
        let rungs: Vec<String> = bracket
            .rungs
            .iter()
            .map(|r| format!("{}x{}", r.trials, r.epochs))
            .collect();
        println!("bracket s={} run={}: {}", bracket.s, bracket.run, rungs.join(" -> "));
    }

    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend {
        ledger: ledger.clone(),
        queue: Vec::new(),
    };
    let mut hyperband = Hyperband::builder(RandomSearch::with_seed(1))
        .max_epochs(27)
        .eta(3)
        .build();
    let summary = hyperband.run(&space, &ledger, Direction::Minimize, &mut backend)?;
    report("hyperband", &summary);

    let ledger = ResultsLedger::new();
    backend.ledger = ledger.clone();
    let mut hyperbayes: Hyperbayes = Hyperband::builder(
        BayesianOptimization::builder()
            .num_random_seeds(6)
            .num_candidates(1_000)
            .seed(2)
            .build()?,
    )
    .max_epochs(27)
    .temperature(0.5)
    .seed(2)
    .build();
    let summary = hyperbayes.run(&space, &ledger, Direction::Minimize, &mut backend)?;
    report("hyperbayes", &summary);

    let ledger = ResultsLedger::new();
    backend.ledger = ledger.clone();
    let mut selection = NaturalSelection::new(GrowingSearch::with_seed(3))
        .factor(4)
        .survivors(2);
    let summary = selection.run(&space, &ledger, Direction::Minimize, &mut backend)?;
    report("natural selection", &summary);

    Ok(())
}
