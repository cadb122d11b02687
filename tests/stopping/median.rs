use hpsweep::ledger::ResultsLedger;
use hpsweep::stopping::{MedianStoppingRule, StoppingRule};
use hpsweep::value::Configuration;
use hpsweep::{Direction, Status, Trial};

/// Records one trial's intermediate objectives at iterations 1, 2, ...
fn trial_with_values(ledger: &ResultsLedger, values: &[f64]) -> Trial {
    let trial = Trial::new(ledger.next_trial_id(), Configuration::new());
    for (i, &v) in values.iter().enumerate() {
        ledger
            .record(&trial, i as u64 + 1, v, Status::Intermediate)
            .unwrap();
    }
    trial
}

// --- Minimize direction ---

#[test]
fn stop_when_worse_than_median_minimize() {
    let ledger = ResultsLedger::new();
    trial_with_values(&ledger, &[1.0, 0.8]);
    trial_with_values(&ledger, &[2.0, 1.5]);
    trial_with_values(&ledger, &[3.0, 2.5]);
    // Best values 0.8, 1.5, 2.5: median 1.5.
    let current = trial_with_values(&ledger, &[2.0, 1.8]);
    let rule = MedianStoppingRule::new().min_trials(3);
    assert!(rule.should_trial_stop(&current, &ledger, Direction::Minimize));
}

#[test]
fn keep_when_better_than_median_minimize() {
    let ledger = ResultsLedger::new();
    trial_with_values(&ledger, &[0.8]);
    trial_with_values(&ledger, &[1.5]);
    trial_with_values(&ledger, &[2.5]);
    let current = trial_with_values(&ledger, &[3.0, 1.0]);
    let rule = MedianStoppingRule::new().min_trials(3);
    assert!(!rule.should_trial_stop(&current, &ledger, Direction::Minimize));
}

#[test]
fn equal_to_median_keeps_running() {
    let ledger = ResultsLedger::new();
    trial_with_values(&ledger, &[1.0]);
    trial_with_values(&ledger, &[2.0]);
    trial_with_values(&ledger, &[3.0]);
    let current = trial_with_values(&ledger, &[2.0]);
    let rule = MedianStoppingRule::new();
    assert!(!rule.should_trial_stop(&current, &ledger, Direction::Minimize));
}

// --- Maximize direction ---

#[test]
fn stop_when_worse_than_median_maximize() {
    let ledger = ResultsLedger::new();
    trial_with_values(&ledger, &[0.7, 0.9]);
    trial_with_values(&ledger, &[0.6]);
    trial_with_values(&ledger, &[0.8]);
    let current = trial_with_values(&ledger, &[0.5, 0.55]);
    assert!(MedianStoppingRule::new().should_trial_stop(&current, &ledger, Direction::Maximize));
}

// --- Thresholds ---

#[test]
fn never_stops_with_too_few_comparators() {
    let ledger = ResultsLedger::new();
    trial_with_values(&ledger, &[0.1]);
    trial_with_values(&ledger, &[0.2]);
    let current = trial_with_values(&ledger, &[9.0]);
    let rule = MedianStoppingRule::new().min_trials(3);
    assert!(!rule.should_trial_stop(&current, &ledger, Direction::Minimize));
}

#[test]
fn min_iterations_protects_young_trials_and_filters_comparators() {
    let ledger = ResultsLedger::new();
    trial_with_values(&ledger, &[0.1, 0.1, 0.1]);
    trial_with_values(&ledger, &[0.1]);
    let young = trial_with_values(&ledger, &[9.0, 9.0]);
    let rule = MedianStoppingRule::new().min_iterations(3).min_trials(1);
    assert!(!rule.should_trial_stop(&young, &ledger, Direction::Minimize));

    ledger.record(&young, 3, 9.0, Status::Intermediate).unwrap();
    assert!(rule.should_trial_stop(&young, &ledger, Direction::Minimize));

    // Only the first trial reached three iterations.
    let strict = MedianStoppingRule::new().min_iterations(3).min_trials(2);
    assert!(!strict.should_trial_stop(&young, &ledger, Direction::Minimize));
}

// --- NaN handling ---

#[test]
fn all_nan_trial_is_stopped() {
    let ledger = ResultsLedger::new();
    let current = trial_with_values(&ledger, &[f64::NAN, f64::NAN]);
    assert!(MedianStoppingRule::new().min_trials(0).should_trial_stop(&current, &ledger, Direction::Minimize));
}

#[test]
fn nan_comparators_are_ignored() {
    let ledger = ResultsLedger::new();
    trial_with_values(&ledger, &[f64::NAN]);
    trial_with_values(&ledger, &[f64::NAN]);
    let current = trial_with_values(&ledger, &[5.0]);
    assert!(!MedianStoppingRule::new().should_trial_stop(&current, &ledger, Direction::Minimize));

    trial_with_values(&ledger, &[1.0]);
    assert!(MedianStoppingRule::new().should_trial_stop(&current, &ledger, Direction::Minimize));
}

#[test]
fn trial_without_rows_keeps_running() {
    let ledger = ResultsLedger::new();
    trial_with_values(&ledger, &[0.1]);
    let fresh = Trial::new(ledger.next_trial_id(), Configuration::new());
    assert!(!MedianStoppingRule::new().should_trial_stop(&fresh, &ledger, Direction::Minimize));
}
