//! Ask-and-tell tuning of a simulated training run with median early
//! stopping, persisted to a JSON-lines journal.
//!
//! Run with: `cargo run --example simulated_training`

use hpsweep::prelude::*;

/// Validation loss after `epoch` epochs for a learning rate and depth.
#[allow(clippy::cast_precision_loss)]
fn validation_loss(lr: f64, depth: i64, activation: &str, epoch: u64) -> f64 {
    let lr_term = (lr.log10() + 2.5).powi(2);
    let depth_term = 0.05 * (depth - 4).abs() as f64;
    let act_term = if activation == "relu" { 0.0 } else { 0.1 };
    lr_term + depth_term + act_term + 2.0 / (epoch as f64 + 1.0)
}

fn main() -> hpsweep::Result<()> {
    let space = vec![
        Parameter::continuous("lr", 1e-4, 1e-1).log_scale(),
        Parameter::discrete("depth", 1, 8),
        Parameter::choice("activation", vec!["relu", "tanh"]),
    ];

    let path = std::env::temp_dir().join("hpsweep_simulated_training.jsonl");
    std::fs::remove_file(&path).ok();

    let study = Study::builder(space)
        .minimize()
        .algorithm(
            BayesianOptimization::builder()
                .num_random_seeds(8)
                .max_num_trials(30)
                .num_candidates(2_000)
                .seed(42)
                .build()?,
        )
        .stopping_rule(MedianStoppingRule::new().min_iterations(3).min_trials(4))
        .storage(JournalLedger::new(&path))
        .build()?;

    let mut stopped = 0;
    while let Some(trial) = study.get_suggestion()? {
        let lr = trial.get_f64("lr").unwrap_or(1e-3);
        let depth = trial.get_i64("depth").unwrap_or(1);
        let activation = trial
            .get("activation")
            .and_then(Value::as_str)
            .unwrap_or("relu")
            .to_owned();

        let mut status = Status::Completed;
        for epoch in 1..=20 {
            study.add_observation(&trial, epoch, validation_loss(lr, depth, &activation, epoch))?;
            if study.should_trial_stop(&trial) {
                status = Status::Stopped;
                stopped += 1;
                break;
            }
        }
        study.finalize(&trial, status)?;
    }

    println!(
        "{} trials, {stopped} stopped early, journal at {}",
        study.ledger().num_trials(),
        path.display()
    );
    if let Some(best) = study.best() {
        println!("best loss {:.4} from trial {}", best.objective, best.trial_id);
        for (name, value) in &best.columns {
            println!("  {name} = {value}");
        }
    }
    Ok(())
}
