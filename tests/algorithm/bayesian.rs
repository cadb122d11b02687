use hpsweep::algorithm::bayesian::expected_improvement;
use hpsweep::algorithm::{Algorithm, BayesianOptimization};
use hpsweep::ledger::ResultsLedger;
use hpsweep::parameter::Parameter;
use hpsweep::value::Value;
use hpsweep::{Direction, Error};

use super::complete;

fn fast(seed: u64) -> BayesianOptimization {
    BayesianOptimization::builder()
        .num_random_seeds(4)
        .num_candidates(300)
        .num_refine(3)
        .n_restarts(2)
        .seed(seed)
        .build()
        .unwrap()
}

#[test]
fn seeds_are_replayed_whatever_the_results() {
    let space = vec![
        Parameter::choice("act", vec!["relu", "tanh", "sigmoid"]),
        Parameter::continuous("x", 0.0, 1.0),
    ];
    let ledger = ResultsLedger::new();
    let mut bo = fast(1);

    let mut suggestions = Vec::new();
    for i in 0..4 {
        let config = bo.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().unwrap();
        complete(&ledger, config.clone(), f64::from(i));
        suggestions.push(config);
    }
    assert_eq!(bo.seed_configurations(), &suggestions[..]);

    // Every Choice value appears among the seeds.
    for act in ["relu", "tanh", "sigmoid"] {
        assert!(suggestions.iter().any(|c| c["act"] == Value::from(act)));
    }
}

#[test]
fn choice_grid_larger_than_seed_count_is_kept_whole() {
    let space = vec![
        Parameter::choice("a", vec![1, 2, 3]),
        Parameter::choice("b", vec![1, 2]),
    ];
    let ledger = ResultsLedger::new();
    let mut bo = fast(2);
    bo.get_suggestion(&space, &ledger, Direction::Minimize).unwrap();
    assert_eq!(bo.seed_configurations().len(), 6);
}

#[test]
fn max_num_trials_includes_seeds() {
    let space = vec![Parameter::continuous("x", 0.0, 1.0)];
    let ledger = ResultsLedger::new();
    let mut bo = BayesianOptimization::builder()
        .num_random_seeds(2)
        .max_num_trials(3)
        .num_candidates(50)
        .seed(3)
        .build()
        .unwrap();
    for _ in 0..3 {
        let c = bo.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().unwrap();
        let x = c["x"].as_f64().unwrap();
        complete(&ledger, c, x);
    }
    assert!(bo.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().is_none());
}

#[test]
fn model_suggestions_stay_in_range() {
    let space = vec![
        Parameter::continuous("lr", 1e-4, 1e-1).log_scale(),
        Parameter::discrete("units", 1, 8),
        Parameter::ordinal("batch", vec![16, 32, 64]),
        Parameter::choice("act", vec!["relu", "tanh"]),
    ];
    let ledger = ResultsLedger::new();
    let mut bo = fast(4);
    for _ in 0..12 {
        let config = bo.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().unwrap();
        for p in &space {
            assert!(p.contains(&config[p.name()]), "{} = {:?}", p.name(), config[p.name()]);
        }
        let lr = config["lr"].as_f64().unwrap();
        complete(&ledger, config, (lr.log10() + 2.5).powi(2));
    }
}

#[test]
fn finds_the_minimum_of_a_parabola() {
    let space = vec![Parameter::continuous("x", -2.0, 2.0)];
    let ledger = ResultsLedger::new();
    let mut bo = fast(5);
    for _ in 0..20 {
        let config = bo.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().unwrap();
        let x = config["x"].as_f64().unwrap();
        complete(&ledger, config, (x - 0.7).powi(2));
    }
    let best = ledger.best_row(Direction::Minimize).unwrap();
    assert!(best.objective < 0.05, "best objective {}", best.objective);
}

#[test]
fn nan_objectives_are_ignored_by_the_model() {
    let space = vec![Parameter::continuous("x", 0.0, 1.0)];
    let ledger = ResultsLedger::new();
    let mut bo = fast(6);
    for i in 0..8 {
        let config = bo.get_suggestion(&space, &ledger, Direction::Maximize).unwrap().unwrap();
        let objective = if i % 2 == 0 { f64::NAN } else { config["x"].as_f64().unwrap() };
        complete(&ledger, config, objective);
    }
}

#[test]
fn expected_improvement_is_zero_at_the_incumbent() {
    let ei = expected_improvement(1.0, 0.5, 1.0, 0.0, Direction::Minimize);
    assert!(ei.abs() < 1e-12);
    let better = expected_improvement(0.5, 0.5, 1.0, 0.0, Direction::Minimize);
    let worse = expected_improvement(1.5, 0.5, 1.0, 0.0, Direction::Minimize);
    assert!(better > 0.0);
    assert!(worse < 0.0);
}

#[test]
fn unknown_acquisition_function_is_rejected() {
    let err = BayesianOptimization::builder().acquisition_function("pi").build();
    assert!(matches!(err, Err(Error::UnsupportedAcquisition(name)) if name == "pi"));
}

#[test]
fn log_scale_from_zero_is_rejected() {
    let ledger = ResultsLedger::new();
    let mut bo = fast(5);
    let space = vec![Parameter::continuous("lr", 0.0, 1.0).log_scale()];
    let err = bo.get_suggestion(&space, &ledger, Direction::Minimize);
    assert!(matches!(err, Err(Error::InvalidLogBounds(name)) if name == "lr"));
}
