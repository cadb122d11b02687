//! The append-only results ledger.
//!
//! Every observation a trial reports becomes one [`Row`]. The ledger is
//! shared by the execution backend (which writes), the algorithms and
//! stopping rules (which read) and the bandit drivers (which also update
//! bookkeeping cells such as `Run`).
//!
//! # Storage backends
//!
//! | Backend | Description | Feature flag |
//! |---------|-------------|-------------|
//! | [`MemoryLedger`] | In-memory `Vec` behind a read-write lock (the default) | none |
//! | [`JournalLedger`] | JSON-lines event log with `fs2` file locking | none |
//! | `SqliteLedger` | The same event log in a `SQLite` table (WAL mode) | `sqlite` |
//!
//! Implement [`LedgerStorage`] to plug in another backend and wrap it with
//! [`ResultsLedger::with_storage`].
//!
//! # Example
//!
//! ```
//! use hpsweep::ledger::ResultsLedger;
//! use hpsweep::value::Configuration;
//! use hpsweep::{Direction, Status, Trial};
//!
//! let ledger = ResultsLedger::new();
//! for objective in [0.4, 0.1, 0.3] {
//!     let trial = Trial::new(ledger.next_trial_id(), Configuration::new());
//!     ledger.record(&trial, 1, objective, Status::Completed).unwrap();
//! }
//! assert_eq!(ledger.k_best(2, Direction::Minimize), vec![2, 3]);
//! ```

mod design;
mod journal;
mod memory;
mod row;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use design::{ColumnKind, DesignColumn, DesignLayout, DesignMatrix};
pub use journal::JournalLedger;
pub use memory::MemoryLedger;
use parking_lot::RwLock;
pub use row::Row;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLedger;

use crate::error::{Error, Result};
use crate::parameter::Parameter;
use crate::trial::Trial;
use crate::types::{Direction, Status};
use crate::value::{Configuration, Value};

/// Ledger column names shared by algorithms and drivers.
pub mod columns {
    /// The trial identifier.
    pub const TRIAL_ID: &str = "Trial-ID";
    /// The row status.
    pub const STATUS: &str = "Status";
    /// Completed iterations at the time of the observation.
    pub const ITERATION: &str = "Iteration";
    /// The objective value.
    pub const OBJECTIVE: &str = "Objective";
    /// Bracket or generation group used by the bandit drivers.
    pub const RUN: &str = "Run";
    /// Comma-terminated ancestor chain of a population based training trial.
    pub const LINEAGE: &str = "lineage";
    /// Checkpoint a population based training trial resumes from.
    pub const LOAD_FROM: &str = "load_from";
    /// Checkpoint a population based training trial writes to.
    pub const SAVE_TO: &str = "save_to";

    /// Returns `true` for the four fixed columns, which cannot be updated.
    #[must_use]
    pub fn is_core(column: &str) -> bool {
        matches!(column, TRIAL_ID | STATUS | ITERATION | OBJECTIVE)
    }
}

/// Trait for persisting ledger rows.
///
/// Implementations must be `Send + Sync`: the ledger is shared between the
/// execution backend and the optimizer. Each `append` and `update` must be
/// atomic with respect to other writes and to readers of [`rows_arc`].
///
/// [`rows_arc`]: LedgerStorage::rows_arc
pub trait LedgerStorage: Send + Sync {
    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Must reject a row whose iteration is lower than one already recorded
    /// for the same trial with [`Error::NonMonotonicIteration`].
    fn append(&self, row: Row) -> Result<()>;

    /// Sets `column` to `value` on every row of `trial_id`.
    ///
    /// # Errors
    ///
    /// [`Error::ImmutableColumn`] for the fixed columns and
    /// [`Error::UnknownTrial`] if the trial has no rows.
    fn update(&self, trial_id: u64, column: &str, value: Value) -> Result<()>;

    /// The in-memory row buffer, in insertion order.
    fn rows_arc(&self) -> &Arc<RwLock<Vec<Row>>>;

    /// Atomically returns the next unique Trial-ID.
    fn next_trial_id(&self) -> u64;

    /// Returns the next Trial-ID without consuming it.
    fn peek_next_trial_id(&self) -> u64;

    /// Reloads rows written by other processes. Returns `true` if the
    /// buffer changed. The default implementation does nothing.
    fn refresh(&self) -> bool {
        false
    }
}

/// Shared handle to a ledger backend.
///
/// Cloning is cheap; all clones see the same rows.
#[derive(Clone)]
pub struct ResultsLedger {
    storage: Arc<dyn LedgerStorage>,
}

impl Default for ResultsLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ResultsLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResultsLedger")
            .field("rows", &self.len())
            .finish_non_exhaustive()
    }
}

impl ResultsLedger {
    /// Creates an empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::with_storage(MemoryLedger::new())
    }

    /// Wraps a custom storage backend.
    #[must_use]
    pub fn with_storage(storage: impl LedgerStorage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// See [`LedgerStorage::append`].
    pub fn append(&self, row: Row) -> Result<()> {
        self.storage.append(row)
    }

    /// Records an observation of `trial`, copying its parameters into the row.
    ///
    /// # Errors
    ///
    /// See [`LedgerStorage::append`].
    pub fn record(&self, trial: &Trial, iteration: u64, objective: f64, status: Status) -> Result<()> {
        self.record_with_context(trial, iteration, objective, status, Configuration::new())
    }

    /// Like [`record`](Self::record) with extra user columns (e.g. `val_loss`).
    /// Context columns override parameter columns of the same name.
    ///
    /// # Errors
    ///
    /// See [`LedgerStorage::append`].
    pub fn record_with_context(
        &self,
        trial: &Trial,
        iteration: u64,
        objective: f64,
        status: Status,
        context: Configuration,
    ) -> Result<()> {
        let mut row = Row::new(trial.id(), status, iteration, objective);
        row.columns.clone_from(trial.parameters());
        row.columns.extend(context);
        self.append(row)
    }

    /// Sets a bookkeeping cell on every row of `trial_id`.
    ///
    /// # Errors
    ///
    /// See [`LedgerStorage::update`].
    pub fn update_cell(&self, trial_id: u64, column: &str, value: impl Into<Value>) -> Result<()> {
        self.storage.update(trial_id, column, value.into())
    }

    /// Atomically assigns the next Trial-ID.
    #[must_use]
    pub fn next_trial_id(&self) -> u64 {
        self.storage.next_trial_id()
    }

    /// The Trial-ID the next call to [`next_trial_id`](Self::next_trial_id) returns.
    #[must_use]
    pub fn peek_next_trial_id(&self) -> u64 {
        self.storage.peek_next_trial_id()
    }

    /// Reloads rows written by other processes.
    pub fn refresh(&self) -> bool {
        self.storage.refresh()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.rows_arc().read().len()
    }

    /// Returns `true` when no rows were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of every row in insertion order.
    #[must_use]
    pub fn rows(&self) -> Vec<Row> {
        self.storage.rows_arc().read().clone()
    }

    /// Runs `f` over the rows while holding the read lock.
    pub fn with_rows<R>(&self, f: impl FnOnce(&[Row]) -> R) -> R {
        f(&self.storage.rows_arc().read())
    }

    /// Starts a filtered query.
    #[must_use]
    pub fn query(&self) -> Query<'_> {
        Query {
            ledger: self,
            trial_id: None,
            status: None,
            completed: false,
            run: None,
            order: None,
            final_only: false,
        }
    }

    /// Every row of `trial_id`, in insertion order.
    #[must_use]
    pub fn trial_rows(&self, trial_id: u64) -> Vec<Row> {
        self.query().trial(trial_id).fetch()
    }

    /// Distinct Trial-IDs, ascending.
    #[must_use]
    pub fn trial_ids(&self) -> Vec<u64> {
        self.with_rows(|rows| {
            let mut ids: Vec<u64> = rows.iter().map(|r| r.trial_id).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        })
    }

    /// Number of distinct trials.
    #[must_use]
    pub fn num_trials(&self) -> usize {
        self.trial_ids().len()
    }

    /// The final observation of every trial, ordered by Trial-ID.
    #[must_use]
    pub fn final_rows(&self) -> Vec<Row> {
        self.with_rows(|rows| final_rows_of(rows).into_values().cloned().collect())
    }

    /// The final observation of `trial_id`: the row with the highest
    /// iteration, the latest inserted on ties.
    #[must_use]
    pub fn final_row(&self, trial_id: u64) -> Option<Row> {
        self.with_rows(|rows| {
            rows.iter()
                .filter(|r| r.trial_id == trial_id)
                .reduce(|best, r| if r.iteration >= best.iteration { r } else { best })
                .cloned()
        })
    }

    /// Reads `column` from the final observation of `trial_id`.
    #[must_use]
    pub fn cell(&self, trial_id: u64, column: &str) -> Option<Value> {
        self.final_row(trial_id)?.get(column)
    }

    /// The `k` best Trial-IDs of the Run group `run`, ranked by final
    /// objective. NaN ranks last; ties go to the earliest Trial-ID.
    #[must_use]
    pub fn k_best_from_run(&self, k: usize, run: i64, direction: Direction) -> Vec<u64> {
        self.query()
            .final_only()
            .run(run)
            .sorted(direction)
            .fetch()
            .into_iter()
            .take(k)
            .map(|r| r.trial_id)
            .collect()
    }

    /// The `k` best Trial-IDs across all trials, ranked by final objective.
    #[must_use]
    pub fn k_best(&self, k: usize, direction: Direction) -> Vec<u64> {
        self.query()
            .final_only()
            .sorted(direction)
            .fetch()
            .into_iter()
            .take(k)
            .map(|r| r.trial_id)
            .collect()
    }

    /// The best completed (non-intermediate) row with a non-NaN objective.
    #[must_use]
    pub fn best_row(&self, direction: Direction) -> Option<Row> {
        self.query()
            .completed()
            .sorted(direction)
            .fetch()
            .into_iter()
            .find(|r| !r.objective.is_nan())
    }

    /// Rebuilds the configuration of `trial_id` from its final observation.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownTrial`] if the trial has no rows and
    /// [`Error::MissingParameter`] if a parameter column is absent.
    pub fn configuration(&self, trial_id: u64, parameters: &[Parameter]) -> Result<Configuration> {
        self.final_row(trial_id)
            .ok_or(Error::UnknownTrial(trial_id))?
            .configuration(parameters)
    }

    /// Projects the completed rows with non-NaN objectives onto a design
    /// matrix, returning it with the matching objective vector.
    ///
    /// # Errors
    ///
    /// Propagates encoding errors from [`DesignLayout::encode`].
    pub fn design_matrix(&self, parameters: &[Parameter]) -> Result<(DesignMatrix, Vec<f64>)> {
        let rows: Vec<Row> = self
            .query()
            .completed()
            .fetch()
            .into_iter()
            .filter(|r| !r.objective.is_nan())
            .collect();
        let configs = rows
            .iter()
            .map(|r| r.configuration(parameters))
            .collect::<Result<Vec<_>>>()?;
        let y = rows.iter().map(|r| r.objective).collect();
        Ok((DesignMatrix::build(parameters, &configs)?, y))
    }
}

/// Maps each Trial-ID to its final observation.
fn final_rows_of(rows: &[Row]) -> BTreeMap<u64, &Row> {
    let mut out: BTreeMap<u64, &Row> = BTreeMap::new();
    for row in rows {
        out.entry(row.trial_id)
            .and_modify(|best| {
                if row.iteration >= best.iteration {
                    *best = row;
                }
            })
            .or_insert(row);
    }
    out
}

/// A filtered, optionally sorted view of the ledger.
///
/// ```
/// use hpsweep::ledger::{ResultsLedger, Row};
/// use hpsweep::{Direction, Status};
///
/// let ledger = ResultsLedger::new();
/// ledger.append(Row::new(1, Status::Intermediate, 1, 0.9)).unwrap();
/// ledger.append(Row::new(1, Status::Completed, 2, 0.5)).unwrap();
/// ledger.append(Row::new(2, Status::Completed, 2, 0.3)).unwrap();
///
/// let rows = ledger.query().completed().sorted(Direction::Minimize).fetch();
/// assert_eq!(rows.iter().map(|r| r.trial_id).collect::<Vec<_>>(), vec![2, 1]);
/// ```
#[derive(Clone, Copy, Debug)]
#[must_use]
pub struct Query<'a> {
    ledger: &'a ResultsLedger,
    trial_id: Option<u64>,
    status: Option<Status>,
    completed: bool,
    run: Option<i64>,
    order: Option<Direction>,
    final_only: bool,
}

impl Query<'_> {
    /// Keeps only rows of `trial_id`.
    pub fn trial(mut self, trial_id: u64) -> Self {
        self.trial_id = Some(trial_id);
        self
    }

    /// Keeps only rows with exactly `status`.
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Keeps only rows written after a trial finished (COMPLETED or STOPPED).
    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    /// Keeps only rows whose `Run` column equals `run`.
    pub fn run(mut self, run: i64) -> Self {
        self.run = Some(run);
        self
    }

    /// Sorts best-first by objective (NaN last, earliest Trial-ID on ties).
    pub fn sorted(mut self, direction: Direction) -> Self {
        self.order = Some(direction);
        self
    }

    /// Considers only the final observation of each trial.
    pub fn final_only(mut self) -> Self {
        self.final_only = true;
        self
    }

    /// Runs the query.
    #[must_use]
    pub fn fetch(self) -> Vec<Row> {
        let mut out: Vec<Row> = self.ledger.with_rows(|rows| {
            let candidates: Vec<&Row> = if self.final_only {
                final_rows_of(rows).into_values().collect()
            } else {
                rows.iter().collect()
            };
            candidates
                .into_iter()
                .filter(|r| self.trial_id.is_none_or(|id| r.trial_id == id))
                .filter(|r| self.status.is_none_or(|s| r.status == s))
                .filter(|r| !self.completed || r.status.is_final())
                .filter(|r| self.run.is_none_or(|run| r.run() == Some(run)))
                .cloned()
                .collect()
        });
        if let Some(direction) = self.order {
            // Stable sort keeps insertion order among rows of equal objective.
            out.sort_by(|a, b| {
                direction
                    .compare(a.objective, b.objective)
                    .then(a.trial_id.cmp(&b.trial_id))
            });
        }
        out
    }
}
