//! Core types shared by algorithms, stopping rules and the ledger.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// The direction of optimization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Minimize the objective value.
    Minimize,
    /// Maximize the objective value.
    Maximize,
}

impl Direction {
    /// Builds a direction from the conventional `lower_is_better` flag.
    #[must_use]
    pub fn from_lower_is_better(lower_is_better: bool) -> Self {
        if lower_is_better {
            Direction::Minimize
        } else {
            Direction::Maximize
        }
    }

    /// Returns `true` when smaller objective values are better.
    #[must_use]
    pub fn lower_is_better(self) -> bool {
        self == Direction::Minimize
    }

    /// Returns `true` if `a` is strictly better than `b`. NaN is never better.
    #[must_use]
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Direction::Minimize => a < b,
            Direction::Maximize => a > b,
        }
    }

    /// Orders two objective values best-first, with NaN sorted last.
    #[must_use]
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
                match self {
                    Direction::Minimize => ord,
                    Direction::Maximize => ord.reverse(),
                }
            }
        }
    }

    /// The best of `values`, skipping NaN. Returns NaN if nothing is left.
    pub fn best_of(self, values: impl IntoIterator<Item = f64>) -> f64 {
        values
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold(f64::NAN, |acc, v| {
                if acc.is_nan() || self.is_better(v, acc) {
                    v
                } else {
                    acc
                }
            })
    }
}

/// The status recorded with each ledger row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// An observation reported while the trial is still running.
    Intermediate,
    /// The trial ran to completion.
    Completed,
    /// The trial was stopped early.
    Stopped,
}

impl Status {
    /// Returns `true` for rows written after a trial finished.
    #[must_use]
    pub fn is_final(self) -> bool {
        !matches!(self, Status::Intermediate)
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Status::Intermediate => "INTERMEDIATE",
            Status::Completed => "COMPLETED",
            Status::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}
