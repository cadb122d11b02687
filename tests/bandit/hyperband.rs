use std::collections::{BTreeMap, HashSet};

use hpsweep::{Direction, Error};
use hpsweep::algorithm::{BayesianOptimization, GrowingSearch, RandomSearch};
use hpsweep::bandit::{BanditSchedule, Hyperband, Hyperbayes, Legoband, Rung, SurvivorPolicy};
use hpsweep::ledger::{ResultsLedger, columns};
use hpsweep::parameter::Parameter;

use super::SimulatedBackend;

fn space() -> Vec<Parameter> {
    vec![Parameter::continuous("x", 0.0, 1.0)]
}

#[test]
fn schedule_r81_eta3() {
    let s = BanditSchedule::new(81, 3);
    assert_eq!(s.s_max(), 4);
    assert_eq!(s.budget(), 405);
    let first = &s.brackets()[0];
    assert_eq!(first.s, 4);
    assert_eq!(first.n, 81);
    assert_eq!(first.rungs[0].epochs, 1);
    let last = s.brackets().last().unwrap();
    assert_eq!(
        last.rungs,
        vec![Rung {
            index: 0,
            trials: 5,
            epochs: 81,
        }]
    );
}

#[test]
fn schedule_r9_eta2_floors_log() {
    // log2(9) = 3.17, so s_max is 3.
    let s = BanditSchedule::new(9, 2);
    assert_eq!(s.s_max(), 3);
    assert_eq!(s.budget(), 36);
    let fresh: Vec<usize> = s.brackets().iter().map(|b| b.n).collect();
    assert_eq!(fresh, vec![8, 6, 4, 4]);
}

#[test]
fn malformed_space_fails_before_submitting() {
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let mut hb = Hyperband::builder(RandomSearch::with_seed(1)).max_epochs(9).build();

    let empty = vec![Parameter::ordinal("width", Vec::<i64>::new())];
    let err = hb.run(&empty, &ledger, Direction::Minimize, &mut backend);
    assert!(matches!(err, Err(Error::EmptyRange(_))));

    let inverted = vec![Parameter::discrete("depth", 5, 1)];
    let err = hb.run(&inverted, &ledger, Direction::Minimize, &mut backend);
    assert!(matches!(err, Err(Error::InvalidBounds { .. })));

    let mut legoband = Legoband::legoband(GrowingSearch::with_seed(1), 9, 3);
    let log_from_zero = vec![Parameter::continuous("lr", 0.0, 1.0).log_scale()];
    let err = legoband.run(&log_from_zero, &ledger, Direction::Minimize, &mut backend);
    assert!(matches!(err, Err(Error::InvalidLogBounds(_))));

    assert!(backend.log.is_empty());
    assert!(ledger.is_empty());
}

#[test]
fn submissions_follow_the_schedule() {
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let mut hb = Hyperband::builder(RandomSearch::with_seed(1))
        .max_epochs(27)
        .eta(3)
        .build();
    let summary = hb.run(&space(), &ledger, Direction::Minimize, &mut backend).unwrap();

    let schedule = hb.schedule().clone();
    let expected_submissions: usize = schedule
        .brackets()
        .iter()
        .flat_map(|b| &b.rungs)
        .map(|r| r.trials)
        .sum();
    let expected_trials: usize = schedule.brackets().iter().map(|b| b.rungs[0].trials).sum();
    assert_eq!(summary.submissions, expected_submissions);
    assert_eq!(summary.trials, expected_trials);
    assert_eq!(backend.log.len(), expected_submissions);
    assert_eq!(summary.total_epochs, schedule.total_epochs());
    assert_eq!(
        backend.log.iter().map(|s| s.epochs).sum::<u64>(),
        schedule.total_epochs()
    );
    assert!(summary.estimated_duration.is_some());

    // Every trial carries the run label of its bracket.
    let mut per_run: BTreeMap<i64, usize> = BTreeMap::new();
    for s in backend.log.iter().filter(|s| !s.resumed) {
        let run = s.trial.get_i64(columns::RUN).unwrap();
        *per_run.entry(run).or_default() += 1;
    }
    let fresh: BTreeMap<i64, usize> = schedule
        .brackets()
        .iter()
        .map(|b| (b.run, b.rungs[0].trials))
        .collect();
    assert_eq!(per_run, fresh);
}

#[test]
fn top_k_promotes_the_best_of_the_run() {
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let mut hb = Hyperband::builder(RandomSearch::with_seed(2))
        .max_epochs(9)
        .eta(3)
        .build();
    hb.run(&space(), &ledger, Direction::Minimize, &mut backend).unwrap();

    // Bracket 1 (s = 2): 9 fresh trials at 1 epoch, then the best 3.
    let fresh: Vec<_> = backend.log[..9].to_vec();
    let promoted: Vec<u64> = backend.log[9..12].iter().map(|s| s.trial.id()).collect();
    assert!(backend.log[9..12].iter().all(|s| s.resumed && s.epochs == 3));

    let mut ranked: Vec<(f64, u64)> = fresh
        .iter()
        .map(|s| ((s.trial.get_f64("x").unwrap() - 0.3).powi(2), s.trial.id()))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    let best3: HashSet<u64> = ranked.iter().take(3).map(|(_, id)| *id).collect();
    assert_eq!(promoted.into_iter().collect::<HashSet<_>>(), best3);
}

#[test]
fn temperature_policy_promotes_distinct_trials_of_the_run() {
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let mut hb = Hyperband::builder(RandomSearch::with_seed(3))
        .max_epochs(9)
        .eta(3)
        .survivors(SurvivorPolicy::Temperature(0.5))
        .seed(11)
        .build();
    let summary = hb.run(&space(), &ledger, Direction::Minimize, &mut backend).unwrap();
    assert_eq!(summary.submissions, backend.log.len());

    let promoted: Vec<u64> = backend.log[9..12].iter().map(|s| s.trial.id()).collect();
    let unique: HashSet<u64> = promoted.iter().copied().collect();
    assert_eq!(unique.len(), 3);
    assert!(backend.log[9..12].iter().all(|s| s.trial.get_i64(columns::RUN) == Some(1)));
}

#[test]
fn exhausted_algorithm_still_promotes() {
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let mut hb = Hyperband::builder(RandomSearch::with_seed(4).max_num_trials(5))
        .max_epochs(9)
        .eta(3)
        .build();
    let summary = hb.run(&space(), &ledger, Direction::Minimize, &mut backend).unwrap();

    assert_eq!(summary.trials, 5);
    // The 5 fresh trials, the best 3 of them, then the best of those.
    assert_eq!(summary.submissions, 5 + 3 + 1);
    assert!(summary.best.is_some());
}

#[test]
fn hyperbayes_runs_with_bayesian_optimization() {
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let bo = BayesianOptimization::builder()
        .num_random_seeds(3)
        .num_candidates(100)
        .num_refine(2)
        .n_restarts(1)
        .seed(5)
        .build()
        .unwrap();
    let mut hb: Hyperbayes = Hyperband::builder(bo).max_epochs(3).eta(3).build();
    let summary = hb.run(&space(), &ledger, Direction::Minimize, &mut backend).unwrap();
    assert_eq!(summary.trials, hb.schedule().brackets().iter().map(|b| b.n).sum::<usize>());
}

#[test]
fn legoband_reshapes_the_distribution() {
    let ledger = ResultsLedger::new();
    let mut backend = SimulatedBackend::new(&ledger);
    let mut hb = Legoband::legoband(GrowingSearch::with_seed(6).bins(4), 9, 3);
    let summary = hb.run(&space(), &ledger, Direction::Minimize, &mut backend).unwrap();
    assert_eq!(summary.submissions, backend.log.len());

    let weights = hb.algorithm().weights("x").unwrap();
    assert_eq!(weights.len(), 4);
    assert!(weights.iter().any(|w| (*w - 1.0).abs() > f64::EPSILON));
    assert!(weights.iter().all(|w| *w >= 0.01));
}

#[test]
#[should_panic(expected = "temperature must be positive")]
fn zero_temperature_panics() {
    let _ = Hyperband::builder(RandomSearch::new()).temperature(0.0);
}
