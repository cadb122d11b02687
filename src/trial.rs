//! Trial handles shared between algorithms, the ledger and the execution backend.

use serde::{Deserialize, Serialize};

use crate::value::{Configuration, Value};

/// One evaluated hyperparameter configuration.
///
/// A trial is created when an algorithm's suggestion is accepted and keeps
/// its parameters for its whole lifetime. Results are not stored on the
/// trial; they accumulate as rows in the
/// [`ResultsLedger`](crate::ledger::ResultsLedger) keyed by [`Trial::id`].
///
/// The parameters may include algorithm bookkeeping keys (for example the
/// `lineage`, `load_from` and `save_to` tags of population based training,
/// or the bracket `Run` of Hyperband). They are recorded with every row.
///
/// # Examples
///
/// ```
/// use hpsweep::Trial;
/// use hpsweep::value::{Configuration, Value};
///
/// let mut params = Configuration::new();
/// params.insert("lrinit".into(), Value::Float(0.01));
/// let trial = Trial::new(1, params);
///
/// assert_eq!(trial.id(), 1);
/// assert_eq!(trial.get_f64("lrinit"), Some(0.01));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    id: u64,
    parameters: Configuration,
}

impl Trial {
    /// Creates a trial with a fixed id and configuration.
    #[must_use]
    pub fn new(id: u64, parameters: Configuration) -> Self {
        Self { id, parameters }
    }

    /// Returns the unique ID of this trial.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the trial's configuration.
    #[must_use]
    pub fn parameters(&self) -> &Configuration {
        &self.parameters
    }

    /// Returns the value assigned to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Returns the value assigned to `name` as a float.
    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Returns the value assigned to `name` as an integer.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }
}
