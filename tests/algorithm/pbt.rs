use hpsweep::algorithm::{Algorithm, PopulationBasedTraining};
use hpsweep::ledger::{ResultsLedger, columns};
use hpsweep::parameter::Parameter;
use hpsweep::value::Value;
use hpsweep::{Direction, Status, Trial};

fn space() -> Vec<Parameter> {
    vec![
        Parameter::continuous("lr", 1e-4, 1.0),
        Parameter::discrete("units", 8, 64),
        Parameter::ordinal("batch", vec![16, 32, 64]),
        Parameter::choice("act", vec!["relu", "tanh"]),
    ]
}

fn text(value: &Value) -> String {
    value.as_str().unwrap().to_owned()
}

#[test]
fn lineage_forms_a_valid_ancestor_chain() {
    let pop = 4;
    let ledger = ResultsLedger::new();
    let mut pbt = PopulationBasedTraining::new(pop).seed(8);

    for _ in 0..pop * 4 {
        let config = pbt.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap().unwrap();
        let trial = Trial::new(ledger.next_trial_id(), config);
        let lr = trial.get_f64("lr").unwrap();
        ledger.record(&trial, 1, lr, Status::Completed).unwrap();
    }
    assert_eq!(pbt.generation(), 4);

    for row in ledger.final_rows() {
        let save_to = text(&row.columns[columns::SAVE_TO]);
        let load_from = text(&row.columns[columns::LOAD_FROM]);
        let lineage = text(&row.columns[columns::LINEAGE]);
        assert_eq!(save_to, row.trial_id.to_string());

        let generation = (row.trial_id - 1) / pop as u64 + 1;
        if generation == 1 {
            assert!(load_from.is_empty());
            assert!(lineage.is_empty());
            continue;
        }

        // The parent is an earlier trial of the previous generation.
        let parent_id: u64 = load_from.parse().unwrap();
        assert_eq!((parent_id - 1) / pop as u64 + 1, generation - 1);
        let parent = ledger.final_row(parent_id).unwrap();
        let parent_lineage = text(&parent.columns[columns::LINEAGE]);
        assert_eq!(lineage, format!("{parent_lineage}{load_from},"));
        assert_eq!(lineage.matches(',').count() as u64, generation - 1);

        // Choice values are inherited unchanged.
        assert_eq!(row.columns["act"], parent.columns["act"]);
    }
}

#[test]
fn ancestors_come_from_the_top_third() {
    let pop = 6;
    let ledger = ResultsLedger::new();
    let mut pbt = PopulationBasedTraining::new(pop).seed(3);
    for i in 0..pop {
        let config = pbt.get_suggestion(&space(), &ledger, Direction::Maximize).unwrap().unwrap();
        let trial = Trial::new(ledger.next_trial_id(), config);
        ledger.record(&trial, 1, i as f64, Status::Completed).unwrap();
    }
    // Maximizing: trials 6 and 5 form the top third.
    for _ in 0..pop {
        let child = pbt.get_suggestion(&space(), &ledger, Direction::Maximize).unwrap().unwrap();
        let from = text(&child[columns::LOAD_FROM]);
        assert!(from == "6" || from == "5", "unexpected ancestor {from}");
    }
}

#[test]
fn perturbed_values_respect_range_overrides() {
    let pop = 3;
    let ledger = ResultsLedger::new();
    let mut pbt = PopulationBasedTraining::new(pop)
        .perturbation_factors(vec![10.0])
        .parameter_range(Parameter::continuous("lr", 1e-4, 0.5))
        .seed(4);
    for _ in 0..pop {
        let config = pbt.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap().unwrap();
        let trial = Trial::new(ledger.next_trial_id(), config);
        ledger.record(&trial, 1, 0.0, Status::Completed).unwrap();
    }
    for _ in 0..pop {
        let child = pbt.get_suggestion(&space(), &ledger, Direction::Minimize).unwrap().unwrap();
        let lr = child["lr"].as_f64().unwrap();
        assert!(lr <= 0.5);
        let units = child["units"].as_i64().unwrap();
        assert_eq!(units, 64);
    }
}
