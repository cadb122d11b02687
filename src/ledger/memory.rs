use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{LedgerStorage, Row, columns};
use crate::error::{Error, Result};
use crate::value::Value;

/// In-memory ledger storage (the default).
///
/// A thin wrapper around `Arc<RwLock<Vec<Row>>>` plus the Trial-ID counter.
/// Trial-IDs start at 1.
pub struct MemoryLedger {
    rows: Arc<RwLock<Vec<Row>>>,
    next_id: AtomicU64,
}

impl MemoryLedger {
    /// Creates a new, empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a ledger pre-populated with `rows`, trusting their order.
    #[must_use]
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let next_id = rows.iter().map(|r| r.trial_id).max().map_or(1, |id| id + 1);
        Self {
            rows: Arc::new(RwLock::new(rows)),
            next_id: AtomicU64::new(next_id),
        }
    }

    /// Ensures the ID counter is at least `min_value`.
    pub(crate) fn bump_next_id(&self, min_value: u64) {
        self.next_id.fetch_max(min_value, Ordering::SeqCst);
    }

    /// Validates and appends `row` under the write lock, calling `persist`
    /// before the row becomes visible. A failing `persist` leaves the
    /// ledger unchanged.
    pub(crate) fn append_with(
        &self,
        row: Row,
        persist: impl FnOnce(&Row) -> Result<()>,
    ) -> Result<()> {
        let mut rows = self.rows.write();
        let last = rows
            .iter()
            .filter(|r| r.trial_id == row.trial_id)
            .map(|r| r.iteration)
            .max();
        if let Some(last) = last
            && row.iteration < last
        {
            return Err(Error::NonMonotonicIteration {
                trial_id: row.trial_id,
                last,
                got: row.iteration,
            });
        }
        persist(&row)?;
        self.bump_next_id(row.trial_id + 1);
        rows.push(row);
        Ok(())
    }

    /// Sets `column` on every row of `trial_id` under the write lock.
    pub(crate) fn update_with(
        &self,
        trial_id: u64,
        column: &str,
        value: Value,
        persist: impl FnOnce(u64, &str, &Value) -> Result<()>,
    ) -> Result<()> {
        if columns::is_core(column) {
            return Err(Error::ImmutableColumn(column.to_owned()));
        }
        let mut rows = self.rows.write();
        if !rows.iter().any(|r| r.trial_id == trial_id) {
            return Err(Error::UnknownTrial(trial_id));
        }
        persist(trial_id, column, &value)?;
        apply_update(&mut rows, trial_id, column, &value);
        Ok(())
    }
}

/// Writes `value` into `column` of every row of `trial_id`.
pub(crate) fn apply_update(rows: &mut [Row], trial_id: u64, column: &str, value: &Value) {
    for row in rows.iter_mut().filter(|r| r.trial_id == trial_id) {
        row.columns.insert(column.to_owned(), value.clone());
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStorage for MemoryLedger {
    fn append(&self, row: Row) -> Result<()> {
        self.append_with(row, |_| Ok(()))
    }

    fn update(&self, trial_id: u64, column: &str, value: Value) -> Result<()> {
        self.update_with(trial_id, column, value, |_, _, _| Ok(()))
    }

    fn rows_arc(&self) -> &Arc<RwLock<Vec<Row>>> {
        &self.rows
    }

    fn next_trial_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn peek_next_trial_id(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }
}
