use hpsweep::{Direction, Error};
use hpsweep::algorithm::{Algorithm, RandomSearch};
use hpsweep::ledger::ResultsLedger;
use hpsweep::parameter::Parameter;

fn space() -> Vec<Parameter> {
    vec![
        Parameter::continuous("dropout", 0.0, 0.5),
        Parameter::discrete("layers", 1, 4),
        Parameter::choice("act", vec!["relu", "tanh"]),
    ]
}

#[test]
fn stops_after_max_num_trials() {
    let ledger = ResultsLedger::new();
    let mut search = RandomSearch::with_seed(1).max_num_trials(5);
    let mut n = 0;
    while search.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap().is_some() {
        n += 1;
    }
    assert_eq!(n, 5);
    assert!(search.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap().is_none());
}

#[test]
fn unlimited_by_default() {
    let ledger = ResultsLedger::new();
    let mut search = RandomSearch::with_seed(2);
    for _ in 0..200 {
        assert!(search.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap().is_some());
    }
    assert_eq!(search.count(), 200);
}

#[test]
fn same_seed_same_suggestions() {
    let ledger = ResultsLedger::new();
    let mut a = RandomSearch::with_seed(42);
    let mut b = RandomSearch::with_seed(42);
    for _ in 0..10 {
        assert_eq!(
            a.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap(),
            b.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap()
        );
    }
}

#[test]
fn load_counts_towards_the_limit() {
    let ledger = ResultsLedger::new();
    let mut search = RandomSearch::with_seed(3).max_num_trials(4);
    search.load(3);
    assert!(search.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap().is_some());
    assert!(search.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap().is_none());
}

#[test]
fn malformed_space_is_an_error() {
    let ledger = ResultsLedger::new();
    let mut search = RandomSearch::with_seed(1);

    let empty = vec![Parameter::choice("act", Vec::<&str>::new())];
    let err = search.get_suggestion(&empty, &ledger, Direction::Minimize);
    assert!(matches!(err, Err(Error::EmptyRange(name)) if name == "act"));

    let inverted = vec![Parameter::continuous("lr", 1.0, 0.0)];
    let err = search.get_suggestion(&inverted, &ledger, Direction::Minimize);
    assert!(matches!(err, Err(Error::InvalidBounds { .. })));

    let log_from_zero = vec![Parameter::continuous("lr", 0.0, 1.0).log_scale()];
    let err = search.get_suggestion(&log_from_zero, &ledger, Direction::Minimize);
    assert!(matches!(err, Err(Error::InvalidLogBounds(_))));

    assert_eq!(search.count(), 0);
}
