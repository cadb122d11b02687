//! A single ledger observation.

use serde::{Deserialize, Serialize};

use super::columns;
use crate::error::{Error, Result};
use crate::parameter::Parameter;
use crate::types::Status;
use crate::value::{Configuration, Value};

/// One observation reported by a trial.
///
/// The four fixed columns are typed fields; hyperparameters, algorithm
/// bookkeeping and user context live in [`Row::columns`]. Serialized rows are
/// flat JSON objects using the ledger column names (`Trial-ID`, `Status`,
/// `Iteration`, `Objective`, then one key per dynamic column). A NaN objective
/// is written as `null` and infinite ones as `"inf"` or `"-inf"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// The trial this observation belongs to.
    #[serde(rename = "Trial-ID")]
    pub trial_id: u64,
    /// Lifecycle state at the time of the observation.
    #[serde(rename = "Status")]
    pub status: Status,
    /// Completed training iterations when the observation was taken.
    #[serde(rename = "Iteration")]
    pub iteration: u64,
    /// The objective value; NaN marks a degenerate observation.
    #[serde(rename = "Objective", with = "objective_json")]
    pub objective: f64,
    /// Hyperparameter, bookkeeping and context columns.
    #[serde(flatten)]
    pub columns: Configuration,
}

impl Row {
    /// Creates a row without dynamic columns.
    #[must_use]
    pub fn new(trial_id: u64, status: Status, iteration: u64, objective: f64) -> Self {
        Self {
            trial_id,
            status,
            iteration,
            objective,
            columns: Configuration::new(),
        }
    }

    /// Adds a dynamic column.
    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    /// Reads any column, fixed or dynamic, by its ledger name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<Value> {
        match column {
            columns::TRIAL_ID => Some(Value::from(self.trial_id)),
            columns::STATUS => Some(Value::Str(self.status.to_string())),
            columns::ITERATION => Some(Value::from(self.iteration)),
            columns::OBJECTIVE => Some(Value::Float(self.objective)),
            other => self.columns.get(other).cloned(),
        }
    }

    /// The bracket or generation group this row was recorded under.
    #[must_use]
    pub fn run(&self) -> Option<i64> {
        self.columns.get(columns::RUN).and_then(Value::as_i64)
    }

    /// Extracts the values of `parameters` from this row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] if a parameter column is absent.
    pub fn configuration(&self, parameters: &[Parameter]) -> Result<Configuration> {
        parameters
            .iter()
            .map(|p| {
                self.columns
                    .get(p.name())
                    .map(|v| (p.name().to_owned(), v.clone()))
                    .ok_or_else(|| Error::MissingParameter(p.name().to_owned()))
            })
            .collect()
    }
}

mod objective_json {
    use serde::{Deserialize, Deserializer, Serializer, de};

    const INFINITY: &str = "inf";
    const NEG_INFINITY: &str = "-inf";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Number(f64),
        Text(String),
    }

    pub(super) fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            s.serialize_none()
        } else if value.is_infinite() {
            s.serialize_some(if *value > 0.0 { INFINITY } else { NEG_INFINITY })
        } else {
            s.serialize_some(value)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Option::<Encoded>::deserialize(d)? {
            None => Ok(f64::NAN),
            Some(Encoded::Number(v)) => Ok(v),
            Some(Encoded::Text(t)) if t == INFINITY => Ok(f64::INFINITY),
            Some(Encoded::Text(t)) if t == NEG_INFINITY => Ok(f64::NEG_INFINITY),
            Some(Encoded::Text(t)) => Err(de::Error::custom(format!("invalid objective '{t}'"))),
        }
    }
}
