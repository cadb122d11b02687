use hpsweep::{Direction, Error};
use hpsweep::algorithm::{GrowingSearch, RandomSearch};
use hpsweep::bandit::NaturalSelection;
use hpsweep::ledger::{ResultsLedger, columns};
use hpsweep::parameter::Parameter;

use super::SimulatedBackend;

fn space() -> Vec<Parameter> {
    vec![Parameter::continuous("x", 0.0, 1.0)]
}

#[test]
fn survivors_fill_slots_before_fresh_trials() {
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let mut driver = NaturalSelection::new(GrowingSearch::with_seed(1)).factor(4).survivors(1);
    let summary = driver.run(&space(), &ledger, Direction::Minimize, &mut backend).unwrap();

    assert_eq!(summary.trials, 8 + 3 + 1);
    assert_eq!(summary.submissions, 8 + 4 + 2 + 1);
    assert_eq!(summary.total_epochs, 32);
    assert_eq!(backend.log.iter().map(|s| s.epochs).sum::<u64>(), 32);

    let resumed: Vec<u64> = backend.log.iter().filter(|s| s.resumed).map(|s| s.epochs).collect();
    assert_eq!(resumed, vec![2, 4, 8]);
}

#[test]
fn promotion_moves_the_run_cell() {
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let mut driver = NaturalSelection::new(RandomSearch::with_seed(2)).factor(3).survivors(2);
    driver.run(&space(), &ledger, Direction::Minimize, &mut backend).unwrap();

    // Generation 0 had four trials; the best two moved on to run 1 and the
    // best of those to run 2.
    let run0 = ledger.k_best_from_run(10, 0, Direction::Minimize);
    let run1 = ledger.k_best_from_run(10, 1, Direction::Minimize);
    let run2 = ledger.k_best_from_run(10, 2, Direction::Minimize);
    assert_eq!(run0.len(), 2);
    assert_eq!(run1.len(), 1);
    assert_eq!(run2.len(), 1);

    let final_trial = run2[0];
    assert!(ledger.trial_rows(final_trial).iter().all(|r| r.run() == Some(2)));
    assert_eq!(ledger.final_row(final_trial).unwrap().iteration, 1 + 2 + 4);
    assert_eq!(ledger.cell(final_trial, columns::RUN).and_then(|v| v.as_i64()), Some(2));
}

#[test]
fn malformed_space_fails_before_submitting() {
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let mut driver = NaturalSelection::new(GrowingSearch::with_seed(1)).factor(3);
    let space = vec![
        Parameter::continuous("x", 0.0, 1.0),
        Parameter::choice("act", Vec::<&str>::new()),
    ];
    let err = driver.run(&space, &ledger, Direction::Minimize, &mut backend);
    assert!(matches!(err, Err(Error::EmptyRange(name)) if name == "act"));
    assert!(backend.log.is_empty());
}
