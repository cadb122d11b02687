use hpsweep::algorithm::{GridSearch, PopulationBasedTraining, RandomSearch};
use hpsweep::ledger::{JournalLedger, ResultsLedger};
use hpsweep::parameter::Parameter;
use hpsweep::stopping::MedianStoppingRule;
use hpsweep::value::{Configuration, Value};
use hpsweep::{Direction, Status, Study};

fn temp_path() -> std::path::PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut path = std::env::temp_dir();
    path.push(format!(
        "hpsweep_study_test_{}_{}.jsonl",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    path
}

#[test]
fn full_loop_with_early_stopping() {
    let study = Study::builder(vec![Parameter::continuous("x", -1.0, 1.0)])
        .minimize()
        .algorithm(RandomSearch::with_seed(3).max_num_trials(20))
        .stopping_rule(MedianStoppingRule::new().min_iterations(2).min_trials(3))
        .build()
        .unwrap();

    let mut stopped = 0;
    while let Some(trial) = study.get_suggestion().unwrap() {
        let x = trial.get_f64("x").unwrap();
        let mut status = Status::Completed;
        for epoch in 1..=5_u64 {
            study.add_observation(&trial, epoch, x * x + 1.0 / epoch as f64).unwrap();
            if study.should_trial_stop(&trial) {
                status = Status::Stopped;
                stopped += 1;
                break;
            }
        }
        study.finalize(&trial, status).unwrap();
    }

    assert_eq!(study.ledger().num_trials(), 20);
    assert!(stopped > 0, "no trial was stopped");
    assert!(study.active_trials().is_empty());

    let best = study.best().unwrap();
    assert!(best.status.is_final());
    for row in study.ledger().final_rows() {
        assert!(row.objective >= best.objective);
    }
}

#[test]
fn context_columns_are_recorded() {
    let study = Study::builder(vec![Parameter::continuous("x", 0.0, 1.0)]).build().unwrap();
    let trial = study.get_suggestion().unwrap().unwrap();
    let mut context = Configuration::new();
    context.insert("val_accuracy".into(), Value::Float(0.91));
    study.add_observation_with_context(&trial, 1, 0.3, context).unwrap();
    study.finalize(&trial, Status::Completed).unwrap();
    assert_eq!(
        study.ledger().cell(trial.id(), "val_accuracy"),
        Some(Value::Float(0.91))
    );
}

#[test]
fn exhausted_grid_returns_none() {
    let study = Study::new(
        vec![Parameter::choice("act", vec!["relu", "tanh"])],
        GridSearch::new(),
        Direction::Maximize,
    )
    .unwrap();
    assert!(study.get_suggestion().unwrap().is_some());
    assert!(study.get_suggestion().unwrap().is_some());
    assert!(study.get_suggestion().unwrap().is_none());
}

#[test]
fn resume_continues_ids_and_generations() {
    let path = temp_path();
    let space = vec![Parameter::continuous("lr", 1e-3, 1.0)];
    {
        let study = Study::builder(space.clone())
            .algorithm(PopulationBasedTraining::new(3).seed(1))
            .storage(JournalLedger::new(&path))
            .build()
            .unwrap();
        for _ in 0..3 {
            let trial = study.get_suggestion().unwrap().unwrap();
            let lr = trial.get_f64("lr").unwrap();
            study.add_observation(&trial, 1, lr).unwrap();
            study.finalize(&trial, Status::Completed).unwrap();
        }
    }

    let study = Study::builder(space)
        .algorithm(PopulationBasedTraining::new(3).seed(2))
        .storage(JournalLedger::open(&path).unwrap())
        .build()
        .unwrap();
    assert_eq!(study.resume(), 3);

    let child = study.get_suggestion().unwrap().unwrap();
    assert_eq!(child.id(), 4);
    let parent: u64 = child.get("load_from").unwrap().as_str().unwrap().parse().unwrap();
    assert!((1..=3).contains(&parent));

    std::fs::remove_file(&path).ok();
}

#[test]
fn concurrent_workers_get_unique_trials() {
    let study = Study::builder(vec![Parameter::continuous("x", 0.0, 1.0)])
        .algorithm(RandomSearch::with_seed(9).max_num_trials(40))
        .build()
        .unwrap();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                while let Some(trial) = study.get_suggestion().unwrap() {
                    study.add_observation(&trial, 1, 0.0).unwrap();
                    study.finalize(&trial, Status::Completed).unwrap();
                }
            });
        }
    });
    assert_eq!(study.ledger().num_trials(), 40);
    assert_eq!(study.ledger().trial_ids(), (1..=40).collect::<Vec<_>>());
}

#[test]
fn separate_ledgers_do_not_interfere() {
    let a = ResultsLedger::new();
    let b = ResultsLedger::new();
    assert_eq!(a.next_trial_id(), 1);
    assert_eq!(b.next_trial_id(), 1);
}
