use std::collections::HashSet;

use hpsweep::algorithm::{Algorithm, LocalSearch};
use hpsweep::ledger::ResultsLedger;
use hpsweep::parameter::Parameter;
use hpsweep::value::{Configuration, Value};
use hpsweep::{Direction, Error};

use super::complete;

fn space() -> Vec<Parameter> {
    vec![
        Parameter::ordinal("batch", vec![16, 32, 64, 128]),
        Parameter::discrete("units", 10, 100),
        Parameter::continuous("lr", 1e-4, 1.0),
    ]
}

fn seed() -> Configuration {
    let mut c = Configuration::new();
    c.insert("batch".into(), Value::Int(32));
    c.insert("units".into(), Value::Int(50));
    c.insert("lr".into(), Value::Float(0.1));
    c
}

#[test]
fn first_suggestion_is_the_seed() {
    let ledger = ResultsLedger::new();
    let mut search = LocalSearch::new(seed()).seed(1);
    let first = search.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap();
    assert_eq!(first, Some(seed()));
}

#[test]
fn neighbours_change_exactly_one_parameter() {
    let ledger = ResultsLedger::new();
    let mut search = LocalSearch::new(seed()).seed(2);
    let first = search.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap().unwrap();
    complete(&ledger, first, 1.0);

    for _ in 0..6 {
        let next = search.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap().unwrap();
        let changed = next.iter().filter(|(k, v)| seed()[k.as_str()] != **v).count();
        assert_eq!(changed, 1, "{next:?}");
    }
}

#[test]
fn never_repeats_and_exhausts() {
    let ledger = ResultsLedger::new();
    let mut search = LocalSearch::new(seed()).seed(3);
    let mut seen = HashSet::new();
    while let Some(config) = search.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap() {
        assert!(seen.insert(format!("{config:?}")), "repeated {config:?}");
        // Every result is worse than the seed, so the centre never moves.
        let objective = if seen.len() == 1 { 0.0 } else { 1.0 };
        complete(&ledger, config, objective);
    }
    // The seed plus an up and a down move per parameter.
    assert_eq!(seen.len(), 7);
}

#[test]
fn recentres_on_improvement() {
    let ledger = ResultsLedger::new();
    let mut search = LocalSearch::new(seed()).seed(4);
    let first = search.get_suggestion(&space(), &ledger, Direction::Maximize).unwrap().unwrap();
    complete(&ledger, first, 0.5);
    let second = search.get_suggestion(&space(), &ledger, Direction::Maximize).unwrap().unwrap();
    complete(&ledger, second.clone(), 0.9);

    search.get_suggestion(&space(), &ledger, Direction::Maximize).unwrap();
    assert_eq!(search.center(), &second);
}

#[test]
fn repeats_each_configuration() {
    let ledger = ResultsLedger::new();
    let mut search = LocalSearch::new(seed()).repeat_trials(3).seed(5);
    for _ in 0..3 {
        let s = search.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap();
        assert_eq!(s, Some(seed()));
    }
    let fourth = search.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap();
    assert_ne!(fourth, Some(seed()));
}

#[test]
fn choice_parameters_are_rejected() {
    let mut space = space();
    space.push(Parameter::choice("act", vec!["relu"]));
    let mut seed = seed();
    seed.insert("act".into(), Value::from("relu"));
    let ledger = ResultsLedger::new();
    let err = LocalSearch::new(seed).get_suggestion(&space, &ledger, Direction::Minimize);
    assert!(matches!(err, Err(Error::UnsupportedParameter { kind: "choice", .. })));
}

#[test]
fn seed_must_cover_the_space() {
    let mut seed = seed();
    seed.remove("lr");
    let ledger = ResultsLedger::new();
    let err = LocalSearch::new(seed).get_suggestion(&space(), &ledger, Direction::Minimize);
    assert!(matches!(err, Err(Error::MissingParameter(name)) if name == "lr"));
}
