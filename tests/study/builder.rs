use hpsweep::algorithm::GridSearch;
use hpsweep::ledger::{JournalLedger, ResultsLedger};
use hpsweep::parameter::Parameter;
use hpsweep::stopping::MedianStoppingRule;
use hpsweep::{Direction, Error, Study};

#[test]
fn defaults_to_minimize_and_random_search() {
    let study = Study::builder(vec![Parameter::continuous("x", 0.0, 1.0)]).build().unwrap();
    assert_eq!(study.direction(), Direction::Minimize);
    for _ in 0..50 {
        assert!(study.get_suggestion().unwrap().is_some());
    }
}

#[test]
fn invalid_space_is_rejected() {
    let err = Study::builder(vec![
        Parameter::continuous("x", 0.0, 1.0),
        Parameter::discrete("x", 0, 3),
    ])
    .build();
    assert!(matches!(err, Err(Error::DuplicateParameter(_))));

    let err = Study::builder(vec![Parameter::continuous("lr", 0.0, 1.0).log_scale()]).build();
    assert!(matches!(err, Err(Error::InvalidLogBounds(_))));
}

#[test]
fn shares_an_existing_ledger() {
    let ledger = ResultsLedger::new();
    let study = Study::builder(Parameter::grid([("act", vec!["a".into(), "b".into()])]))
        .maximize()
        .algorithm(GridSearch::new())
        .stopping_rule(MedianStoppingRule::new())
        .ledger(ledger.clone())
        .build()
        .unwrap();
    let trial = study.get_suggestion().unwrap().unwrap();
    study.add_observation(&trial, 1, 0.5).unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(study.direction(), Direction::Maximize);
}

#[test]
fn accepts_a_storage_backend() {
    let mut path = std::env::temp_dir();
    path.push(format!("hpsweep_study_builder_{}.jsonl", std::process::id()));
    let study = Study::builder(vec![Parameter::discrete("k", 1, 3)])
        .storage(JournalLedger::new(&path))
        .build()
        .unwrap();
    let trial = study.get_suggestion().unwrap().unwrap();
    study.add_observation(&trial, 1, 1.0).unwrap();
    assert!(path.exists());
    std::fs::remove_file(&path).ok();
}
