//! `SQLite`-backed ledger for multi-process studies.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rusqlite::Connection;

use super::journal::LedgerEvent;
use super::{LedgerStorage, MemoryLedger, Row};
use crate::error::{Error, Result};
use crate::value::Value;

/// A ledger that stores its event log in a `SQLite` table.
///
/// Uses WAL mode for concurrent readers and a single writer. Events are
/// the same JSON documents [`JournalLedger`](super::JournalLedger) writes,
/// one per table row, ordered by an autoincrement sequence number.
///
/// # Examples
///
/// ```no_run
/// use hpsweep::ledger::{ResultsLedger, SqliteLedger};
///
/// let ledger = ResultsLedger::with_storage(SqliteLedger::new("results.db").unwrap());
/// ```
pub struct SqliteLedger {
    memory: MemoryLedger,
    conn: Mutex<Connection>,
    applied: AtomicUsize,
}

fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

impl SqliteLedger {
    /// Opens (or creates) the database at `path` and replays its events.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the database cannot be opened, the
    /// schema cannot be created or a stored event cannot be parsed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_err)?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(storage_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ledger_events (
                seq  INTEGER PRIMARY KEY AUTOINCREMENT,
                data TEXT NOT NULL
            );",
        )
        .map_err(storage_err)?;

        let events = load_all(&conn)?;
        let applied = events.len();

        Ok(Self {
            memory: MemoryLedger::with_rows(LedgerEvent::replay(events)),
            conn: Mutex::new(conn),
            applied: AtomicUsize::new(applied),
        })
    }

    fn write_event(&self, event: &LedgerEvent) -> Result<()> {
        let data = serde_json::to_string(event)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO ledger_events (data) VALUES (?1)",
            rusqlite::params![data],
        )
        .map_err(storage_err)?;
        self.applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl LedgerStorage for SqliteLedger {
    fn append(&self, row: Row) -> Result<()> {
        self.memory
            .append_with(row, |row| self.write_event(&LedgerEvent::Append { row: row.clone() }))
    }

    fn update(&self, trial_id: u64, column: &str, value: Value) -> Result<()> {
        self.memory
            .update_with(trial_id, column, value, |trial_id, column, value| {
                self.write_event(&LedgerEvent::Update {
                    trial_id,
                    column: column.to_owned(),
                    value: value.clone(),
                })
            })
    }

    fn rows_arc(&self) -> &Arc<RwLock<Vec<Row>>> {
        self.memory.rows_arc()
    }

    fn next_trial_id(&self) -> u64 {
        self.memory.next_trial_id()
    }

    fn peek_next_trial_id(&self) -> u64 {
        self.memory.peek_next_trial_id()
    }

    fn refresh(&self) -> bool {
        let mut guard = self.memory.rows_arc().write();
        let conn = self.conn.lock();
        let Ok(events) = load_all(&conn) else {
            return false;
        };
        if events.len() <= self.applied.load(Ordering::SeqCst) {
            return false;
        }
        self.applied.store(events.len(), Ordering::SeqCst);
        let rows = LedgerEvent::replay(events);
        if let Some(max_id) = rows.iter().map(|r| r.trial_id).max() {
            self.memory.bump_next_id(max_id + 1);
        }
        *guard = rows;
        true
    }
}

/// Loads every event, ordered by sequence number.
fn load_all(conn: &Connection) -> Result<Vec<LedgerEvent>> {
    let mut stmt = conn
        .prepare("SELECT data FROM ledger_events ORDER BY seq")
        .map_err(storage_err)?;

    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(storage_err)?;

    let mut events = Vec::new();
    for row in rows {
        let data = row.map_err(storage_err)?;
        events.push(serde_json::from_str(&data)?);
    }
    Ok(events)
}
