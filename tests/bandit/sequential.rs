use hpsweep::Direction;
use hpsweep::algorithm::{BayesianOptimization, RandomSearch};
use hpsweep::bandit::SequentialDriver;
use hpsweep::ledger::{ResultsLedger, columns};
use hpsweep::parameter::Parameter;

use super::SimulatedBackend;

#[test]
fn runs_a_fixed_number_of_trials() {
    let space = vec![Parameter::continuous("x", 0.0, 1.0)];
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let mut driver = SequentialDriver::new(RandomSearch::with_seed(1), 6, 5).wait_each(false);
    let summary = driver.run(&space, &ledger, Direction::Minimize, &mut backend).unwrap();

    assert_eq!(summary.trials, 6);
    assert_eq!(summary.total_epochs, 30);
    assert!(backend.log.iter().all(|s| s.epochs == 5 && !s.resumed));
    assert!(backend.log.iter().all(|s| s.trial.get_i64(columns::RUN) == Some(1)));
    assert_eq!(ledger.num_trials(), 6);
}

#[test]
fn stops_when_the_algorithm_is_exhausted() {
    let space = vec![Parameter::continuous("x", 0.0, 1.0)];
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let mut driver = SequentialDriver::new(RandomSearch::with_seed(2).max_num_trials(2), 10, 1);
    let summary = driver.run(&space, &ledger, Direction::Minimize, &mut backend).unwrap();
    assert_eq!(summary.trials, 2);
}

#[test]
fn bayesian_optimization_sees_every_earlier_result() {
    let space = vec![Parameter::continuous("x", 0.0, 1.0)];
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let bo = BayesianOptimization::builder()
        .num_random_seeds(3)
        .num_candidates(200)
        .num_refine(3)
        .n_restarts(2)
        .seed(4)
        .build()
        .unwrap();
    let mut driver = SequentialDriver::new(bo, 10, 1);
    let summary = driver.run(&space, &ledger, Direction::Minimize, &mut backend).unwrap();

    assert_eq!(ledger.len(), 10);
    let best = summary.best.unwrap();
    // Loss is (x - 0.3)^2 + 1 after one epoch.
    assert!(best.objective < 1.05, "best objective {}", best.objective);
}
