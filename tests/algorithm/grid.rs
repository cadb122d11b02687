use std::collections::HashSet;

use hpsweep::algorithm::{Algorithm, GridSearch};
use hpsweep::ledger::ResultsLedger;
use hpsweep::parameter::Parameter;
use hpsweep::{Direction, Error};

#[test]
fn visits_each_combination_once() {
    let space = vec![
        Parameter::choice("act", vec!["relu", "tanh", "sigmoid"]),
        Parameter::ordinal("batch", vec![32, 64]),
        Parameter::choice("opt", vec!["sgd", "adam"]),
    ];
    let ledger = ResultsLedger::new();
    let mut grid = GridSearch::new();
    let mut seen = HashSet::new();
    while let Some(config) = grid.get_suggestion(&space, &ledger, Direction::Minimize).unwrap() {
        assert!(seen.insert(format!("{config:?}")), "repeated {config:?}");
    }
    assert_eq!(seen.len(), 12);
    assert!(grid.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().is_none());
}

#[test]
fn last_name_varies_fastest() {
    let space = vec![
        Parameter::choice("b", vec!["x", "y"]),
        Parameter::choice("a", vec![1, 2]),
    ];
    let ledger = ResultsLedger::new();
    let mut grid = GridSearch::new();
    let first = grid.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().unwrap();
    let second = grid.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().unwrap();
    assert_eq!(first["a"], second["a"]);
    assert_ne!(first["b"], second["b"]);
}

#[test]
fn rejects_numeric_ranges() {
    let space = vec![Parameter::continuous("lr", 0.0, 1.0)];
    let ledger = ResultsLedger::new();
    let err = GridSearch::new().get_suggestion(&space, &ledger, Direction::Minimize);
    assert!(matches!(
        err,
        Err(Error::UnsupportedParameter { algorithm: "GridSearch", .. })
    ));
}

#[test]
fn load_skips_visited_points() {
    let space = vec![Parameter::choice("act", vec!["a", "b", "c"])];
    let ledger = ResultsLedger::new();
    let mut grid = GridSearch::new();
    grid.load(2);
    assert!(grid.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().is_some());
    assert!(grid.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().is_none());
}
