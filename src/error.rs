#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the lower bound is greater than the upper bound.
    #[error("invalid bounds for '{name}': low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The parameter name.
        name: String,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when log scale is used with non-positive bounds.
    #[error("invalid log bounds for '{0}': low must be positive for log scale")]
    InvalidLogBounds(String),

    /// Returned when a Choice or Ordinal parameter has no values.
    #[error("range of parameter '{0}' cannot be empty")]
    EmptyRange(String),

    /// Returned when two parameters in one space share a name.
    #[error("duplicate parameter name '{0}'")]
    DuplicateParameter(String),

    /// Returned when an algorithm is handed a parameter type it cannot work with.
    #[error("{algorithm} does not support {kind} parameter '{parameter}'")]
    UnsupportedParameter {
        /// The algorithm that rejected the parameter.
        algorithm: &'static str,
        /// The name of the rejected parameter.
        parameter: String,
        /// The parameter type.
        kind: &'static str,
    },

    /// Returned when an unknown acquisition function is requested.
    #[error("acquisition function '{0}' is not implemented, expected 'ei'")]
    UnsupportedAcquisition(String),

    /// Returned when a configuration or ledger row lacks a parameter value.
    #[error("missing value for parameter '{0}'")]
    MissingParameter(String),

    /// Returned when a value is not part of its parameter's range.
    #[error("value {value} is outside the range of parameter '{parameter}'")]
    ValueOutOfRange {
        /// The parameter name.
        parameter: String,
        /// The offending value, formatted.
        value: String,
    },

    /// Returned when a trial reports an iteration lower than one it already reported.
    #[error("trial {trial_id} reported iteration {got} after iteration {last}")]
    NonMonotonicIteration {
        /// The trial that reported out of order.
        trial_id: u64,
        /// The highest iteration already recorded.
        last: u64,
        /// The iteration that was rejected.
        got: u64,
    },

    /// Returned when the ledger holds no rows for a trial.
    #[error("no observations recorded for trial {0}")]
    UnknownTrial(u64),

    /// Returned when updating one of the fixed ledger columns.
    #[error("column '{0}' cannot be updated")]
    ImmutableColumn(String),

    /// Returned when population based training finds no completed trials to
    /// breed from.
    #[error("generation {generation} has no completed trials to sample from")]
    EmptyGeneration {
        /// The generation that was expected to contain completed trials.
        generation: usize,
    },

    /// Returned when a ledger storage operation fails.
    #[error("storage error: {0}")]
    Storage(String),

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
