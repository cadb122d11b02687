//! Hyperparameter domains and their sampling rules.
//!
//! A [`Parameter`] is a closed set of four variants:
//!
//! | Variant | Domain | Sampling |
//! |---------|--------|----------|
//! | [`Choice`](Parameter::Choice) | unordered categories | uniform over the values |
//! | [`Ordinal`](Parameter::Ordinal) | ordered categories | uniform over the values |
//! | [`Discrete`](Parameter::Discrete) | integers in `[low, high]` | uniform or log-uniform, rounded |
//! | [`Continuous`](Parameter::Continuous) | reals in `[low, high]` | uniform or log-uniform |
//!
//! # Example
//!
//! ```
//! use hpsweep::parameter::Parameter;
//!
//! let space = vec![
//!     Parameter::continuous("lrinit", 1e-4, 1e-1).log_scale(),
//!     Parameter::discrete("units", 16, 256),
//!     Parameter::ordinal("batch_size", vec![32, 64, 128]),
//!     Parameter::choice("act", vec!["relu", "tanh"]),
//! ];
//!
//! let mut rng = fastrand::Rng::with_seed(7);
//! for p in &space {
//!     let v = p.sample(&mut rng);
//!     assert!(p.contains(&v));
//! }
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rng_util;
use crate::value::{Configuration, Value};

/// Whether a numeric parameter is sampled on a linear or logarithmic scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Uniform in the raw value.
    #[default]
    Linear,
    /// Uniform in `log10` of the value.
    Log,
}

/// One hyperparameter: its name, domain and sampling rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Parameter {
    /// An unordered categorical set.
    Choice {
        /// Unique name within the search space.
        name: String,
        /// The allowed values.
        range: Vec<Value>,
    },
    /// An ordered categorical set; perturbation moves to a neighbouring value.
    Ordinal {
        /// Unique name within the search space.
        name: String,
        /// The allowed values, in order.
        range: Vec<Value>,
    },
    /// An integer range, both ends inclusive.
    Discrete {
        /// Unique name within the search space.
        name: String,
        /// Lower bound (inclusive).
        low: i64,
        /// Upper bound (inclusive).
        high: i64,
        /// Sampling scale.
        #[serde(default)]
        scale: Scale,
    },
    /// A real-valued range.
    Continuous {
        /// Unique name within the search space.
        name: String,
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
        /// Sampling scale.
        #[serde(default)]
        scale: Scale,
    },
}

impl Parameter {
    /// Creates a Choice parameter.
    #[must_use]
    pub fn choice<V: Into<Value>>(name: impl Into<String>, range: Vec<V>) -> Self {
        Parameter::Choice {
            name: name.into(),
            range: range.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an Ordinal parameter.
    #[must_use]
    pub fn ordinal<V: Into<Value>>(name: impl Into<String>, range: Vec<V>) -> Self {
        Parameter::Ordinal {
            name: name.into(),
            range: range.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a linear Discrete parameter over `[low, high]`.
    #[must_use]
    pub fn discrete(name: impl Into<String>, low: i64, high: i64) -> Self {
        Parameter::Discrete {
            name: name.into(),
            low,
            high,
            scale: Scale::Linear,
        }
    }

    /// Creates a linear Continuous parameter over `[low, high]`.
    #[must_use]
    pub fn continuous(name: impl Into<String>, low: f64, high: f64) -> Self {
        Parameter::Continuous {
            name: name.into(),
            low,
            high,
            scale: Scale::Linear,
        }
    }

    /// Switches a Discrete or Continuous parameter to log-scale sampling.
    ///
    /// Has no effect on Choice and Ordinal parameters.
    #[must_use]
    pub fn log_scale(mut self) -> Self {
        match &mut self {
            Parameter::Discrete { scale, .. } | Parameter::Continuous { scale, .. } => {
                *scale = Scale::Log;
            }
            Parameter::Choice { .. } | Parameter::Ordinal { .. } => {}
        }
        self
    }

    /// Builds one Choice parameter per entry, the usual input of
    /// [`GridSearch`](crate::algorithm::GridSearch).
    ///
    /// ```
    /// use hpsweep::parameter::Parameter;
    ///
    /// let space = Parameter::grid([
    ///     ("act", vec!["tanh".into(), "relu".into()]),
    ///     ("lrinit", vec![0.1.into(), 0.01.into()]),
    /// ]);
    /// assert_eq!(space.len(), 2);
    /// ```
    pub fn grid<N: Into<String>>(space: impl IntoIterator<Item = (N, Vec<Value>)>) -> Vec<Self> {
        space
            .into_iter()
            .map(|(name, range)| Parameter::Choice {
                name: name.into(),
                range,
            })
            .collect()
    }

    /// The parameter's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Parameter::Choice { name, .. }
            | Parameter::Ordinal { name, .. }
            | Parameter::Discrete { name, .. }
            | Parameter::Continuous { name, .. } => name,
        }
    }

    /// A short lowercase name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Parameter::Choice { .. } => "choice",
            Parameter::Ordinal { .. } => "ordinal",
            Parameter::Discrete { .. } => "discrete",
            Parameter::Continuous { .. } => "continuous",
        }
    }

    /// The sampling scale. Choice and Ordinal parameters are always linear.
    #[must_use]
    pub fn scale(&self) -> Scale {
        match self {
            Parameter::Discrete { scale, .. } | Parameter::Continuous { scale, .. } => *scale,
            Parameter::Choice { .. } | Parameter::Ordinal { .. } => Scale::Linear,
        }
    }

    /// Numeric bounds of Discrete and Continuous parameters.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self {
            Parameter::Discrete { low, high, .. } => Some((*low as f64, *high as f64)),
            Parameter::Continuous { low, high, .. } => Some((*low, *high)),
            Parameter::Choice { .. } | Parameter::Ordinal { .. } => None,
        }
    }

    /// The value list of Choice and Ordinal parameters.
    #[must_use]
    pub fn values(&self) -> Option<&[Value]> {
        match self {
            Parameter::Choice { range, .. } | Parameter::Ordinal { range, .. } => Some(range),
            Parameter::Discrete { .. } | Parameter::Continuous { .. } => None,
        }
    }

    /// Validates the parameter definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyRange`], [`Error::InvalidBounds`] or
    /// [`Error::InvalidLogBounds`].
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self) -> Result<()> {
        match self {
            Parameter::Choice { name, range } | Parameter::Ordinal { name, range } => {
                if range.is_empty() {
                    return Err(Error::EmptyRange(name.clone()));
                }
            }
            Parameter::Discrete {
                name,
                low,
                high,
                scale,
            } => {
                if low > high {
                    return Err(Error::InvalidBounds {
                        name: name.clone(),
                        low: *low as f64,
                        high: *high as f64,
                    });
                }
                if *scale == Scale::Log && *low < 1 {
                    return Err(Error::InvalidLogBounds(name.clone()));
                }
            }
            Parameter::Continuous {
                name,
                low,
                high,
                scale,
            } => {
                if low > high || low.is_nan() || high.is_nan() {
                    return Err(Error::InvalidBounds {
                        name: name.clone(),
                        low: *low,
                        high: *high,
                    });
                }
                if *scale == Scale::Log && *low <= 0.0 {
                    return Err(Error::InvalidLogBounds(name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Draws one value from the parameter's domain.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Value {
        match self {
            Parameter::Choice { range, .. } | Parameter::Ordinal { range, .. } => {
                range[rng.usize(0..range.len())].clone()
            }
            Parameter::Discrete {
                low, high, scale, ..
            } => match scale {
                Scale::Linear => Value::Int(rng.i64(*low..=*high)),
                Scale::Log => {
                    let v = log_uniform(rng, *low as f64, *high as f64);
                    Value::Int((v.round() as i64).clamp(*low, *high))
                }
            },
            Parameter::Continuous {
                low, high, scale, ..
            } => {
                let v = match scale {
                    Scale::Linear => rng_util::f64_range(rng, *low, *high),
                    Scale::Log => log_uniform(rng, *low, *high),
                };
                Value::Float(v.clamp(*low, *high))
            }
        }
    }

    /// Returns `true` if `value` lies in the parameter's range.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        match self {
            Parameter::Choice { range, .. } | Parameter::Ordinal { range, .. } => {
                range.contains(value)
            }
            Parameter::Discrete { low, high, .. } => {
                value.as_i64().is_some_and(|v| (*low..=*high).contains(&v))
            }
            Parameter::Continuous { low, high, .. } => {
                value.as_f64().is_some_and(|v| (*low..=*high).contains(&v))
            }
        }
    }

    /// Position of `value` in a Choice or Ordinal range.
    #[must_use]
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.values()?.iter().position(|v| v == value)
    }
}

/// Samples `10^u` with `u` uniform in `[log10 low, log10 high)`.
fn log_uniform(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    10f64.powf(rng_util::f64_range(rng, low.log10(), high.log10()))
}

/// Validates every parameter and checks that names are unique.
///
/// # Errors
///
/// Returns the first validation error, or [`Error::DuplicateParameter`].
pub fn validate_space(parameters: &[Parameter]) -> Result<()> {
    let mut seen = HashSet::new();
    for p in parameters {
        p.validate()?;
        if !seen.insert(p.name()) {
            return Err(Error::DuplicateParameter(p.name().to_owned()));
        }
    }
    Ok(())
}

/// Draws one value for every parameter.
pub fn sample_configuration(parameters: &[Parameter], rng: &mut fastrand::Rng) -> Configuration {
    parameters
        .iter()
        .map(|p| (p.name().to_owned(), p.sample(rng)))
        .collect()
}

/// Parses a search space from a JSON array and validates it.
///
/// ```
/// let space = hpsweep::parameter::space_from_json(
///     r#"[
///         {"type": "continuous", "name": "lr", "low": 0.0001, "high": 0.1, "scale": "log"},
///         {"type": "choice", "name": "act", "range": ["relu", "tanh"]}
///     ]"#,
/// )
/// .unwrap();
/// assert_eq!(space[0].name(), "lr");
/// ```
///
/// # Errors
///
/// Returns [`Error::Storage`] for malformed JSON and any validation error
/// from [`validate_space`].
pub fn space_from_json(json: &str) -> Result<Vec<Parameter>> {
    let parameters: Vec<Parameter> = serde_json::from_str(json)?;
    validate_space(&parameters)?;
    Ok(parameters)
}
