//! Numeric encoding of configurations for surrogate models.
//!
//! Each parameter maps to one or more design-matrix columns:
//!
//! | Parameter | Columns |
//! |-----------|---------|
//! | Choice with `m > 1` values | `m` one-hot columns (`name_0`, `name_1`, ...) |
//! | Choice with one value | none (constant) |
//! | Ordinal | one column: the raw value when every value is numeric, else the index |
//! | Discrete | one column, `log10` of the value on log scale |
//! | Continuous | one column, `log10` of the value on log scale |
//!
//! Only Continuous columns are treated as free variables by the
//! acquisition optimizer; all other columns stay fixed.

use crate::error::{Error, Result};
use crate::parameter::{Parameter, Scale};
use crate::value::{Configuration, Value};

/// How a design column was derived from its parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// A Continuous parameter, free for numerical refinement.
    Continuous,
    /// A Discrete parameter.
    Discrete,
    /// An Ordinal parameter encoded by value (`numeric`) or by index.
    Ordinal {
        /// Whether the raw numeric value is used instead of the index.
        numeric: bool,
    },
    /// One category of a Choice parameter.
    OneHot {
        /// Index of the category within the Choice range.
        category: usize,
    },
}

/// Metadata of one design-matrix column.
#[derive(Clone, Debug, PartialEq)]
pub struct DesignColumn {
    /// Column name: the parameter name, suffixed with the category index for one-hot columns.
    pub name: String,
    /// Index of the source parameter in the search space.
    pub parameter: usize,
    /// How the value is encoded.
    pub kind: ColumnKind,
    /// Scale of the source parameter.
    pub scale: Scale,
    /// Bounds in encoded space for Continuous and Discrete columns.
    pub bounds: Option<(f64, f64)>,
}

/// The column layout derived from a search space.
#[derive(Clone, Debug, PartialEq)]
pub struct DesignLayout {
    columns: Vec<DesignColumn>,
}

impl DesignLayout {
    /// Derives the layout for `parameters`.
    #[must_use]
    pub fn new(parameters: &[Parameter]) -> Self {
        let mut columns = Vec::new();
        for (idx, p) in parameters.iter().enumerate() {
            match p {
                Parameter::Choice { name, range } => {
                    if range.len() == 1 {
                        continue;
                    }
                    for category in 0..range.len() {
                        columns.push(DesignColumn {
                            name: format!("{name}_{category}"),
                            parameter: idx,
                            kind: ColumnKind::OneHot { category },
                            scale: Scale::Linear,
                            bounds: None,
                        });
                    }
                }
                Parameter::Ordinal { name, range } => columns.push(DesignColumn {
                    name: name.clone(),
                    parameter: idx,
                    kind: ColumnKind::Ordinal {
                        numeric: range.iter().all(|v| v.as_f64().is_some()),
                    },
                    scale: Scale::Linear,
                    bounds: None,
                }),
                Parameter::Discrete { name, scale, .. }
                | Parameter::Continuous { name, scale, .. } => {
                    let kind = if matches!(p, Parameter::Continuous { .. }) {
                        ColumnKind::Continuous
                    } else {
                        ColumnKind::Discrete
                    };
                    let bounds = p.bounds().map(|(lo, hi)| match scale {
                        Scale::Linear => (lo, hi),
                        Scale::Log => (lo.log10(), hi.log10()),
                    });
                    columns.push(DesignColumn {
                        name: name.clone(),
                        parameter: idx,
                        kind,
                        scale: *scale,
                        bounds,
                    });
                }
            }
        }
        Self { columns }
    }

    /// The columns in order.
    #[must_use]
    pub fn columns(&self) -> &[DesignColumn] {
        &self.columns
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` when the space encodes to zero columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Indices of the Continuous columns.
    #[must_use]
    pub fn continuous_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ColumnKind::Continuous)
            .map(|(i, _)| i)
            .collect()
    }

    /// Encodes one configuration into a design row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] when a value is absent and
    /// [`Error::ValueOutOfRange`] when it cannot be encoded.
    pub fn encode(&self, parameters: &[Parameter], config: &Configuration) -> Result<Vec<f64>> {
        self.columns
            .iter()
            .map(|col| {
                let p = &parameters[col.parameter];
                let value = config
                    .get(p.name())
                    .ok_or_else(|| Error::MissingParameter(p.name().to_owned()))?;
                encode_value(col, p, value)
            })
            .collect()
    }

    /// Maps a refined Continuous column value back to a parameter value.
    #[must_use]
    pub fn decode_continuous(&self, column: usize, x: f64) -> Value {
        let col = &self.columns[column];
        let (lo, hi) = col.bounds.unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
        let x = x.clamp(lo, hi);
        match col.scale {
            Scale::Linear => Value::Float(x),
            Scale::Log => Value::Float(10f64.powf(x)),
        }
    }
}

fn encode_value(col: &DesignColumn, p: &Parameter, value: &Value) -> Result<f64> {
    let out_of_range = || Error::ValueOutOfRange {
        parameter: p.name().to_owned(),
        value: value.to_string(),
    };
    match col.kind {
        ColumnKind::OneHot { category } => {
            let idx = p.index_of(value).ok_or_else(out_of_range)?;
            Ok(if idx == category { 1.0 } else { 0.0 })
        }
        ColumnKind::Ordinal { numeric: true } => value.as_f64().ok_or_else(out_of_range),
        #[allow(clippy::cast_precision_loss)]
        ColumnKind::Ordinal { numeric: false } => p
            .index_of(value)
            .map(|i| i as f64)
            .ok_or_else(out_of_range),
        ColumnKind::Continuous | ColumnKind::Discrete => {
            let v = value.as_f64().ok_or_else(out_of_range)?;
            Ok(match col.scale {
                Scale::Linear => v,
                Scale::Log => v.log10(),
            })
        }
    }
}

/// Design rows paired with their layout.
#[derive(Clone, Debug, PartialEq)]
pub struct DesignMatrix {
    /// The column layout.
    pub layout: DesignLayout,
    /// One encoded row per configuration.
    pub rows: Vec<Vec<f64>>,
}

impl DesignMatrix {
    /// Encodes every configuration with the layout of `parameters`.
    ///
    /// # Errors
    ///
    /// Propagates encoding errors from [`DesignLayout::encode`].
    pub fn build(parameters: &[Parameter], configs: &[Configuration]) -> Result<Self> {
        let layout = DesignLayout::new(parameters);
        let rows = configs
            .iter()
            .map(|c| layout.encode(parameters, c))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { layout, rows })
    }
}
