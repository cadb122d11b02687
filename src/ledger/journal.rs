//! JSONL-based journal ledger backend.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::memory::apply_update;
use super::{LedgerStorage, MemoryLedger, Row};
use crate::error::Result;
use crate::value::Value;

/// One line of the journal.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum LedgerEvent {
    /// A row was appended.
    Append {
        /// The appended row.
        row: Row,
    },
    /// A bookkeeping cell was set on every row of a trial.
    Update {
        /// The trial whose rows changed.
        trial_id: u64,
        /// The column that was set.
        column: String,
        /// The new value.
        value: Value,
    },
}

impl LedgerEvent {
    /// Replays events into a row buffer.
    pub(crate) fn replay(events: Vec<LedgerEvent>) -> Vec<Row> {
        let mut rows = Vec::new();
        for event in events {
            match event {
                LedgerEvent::Append { row } => rows.push(row),
                LedgerEvent::Update {
                    trial_id,
                    column,
                    value,
                } => apply_update(&mut rows, trial_id, &column, &value),
            }
        }
        rows
    }
}

/// A ledger that writes every append and update as a JSON line.
///
/// Rows are kept in memory for fast reads and the event log is appended
/// under an exclusive `fs2` lock, so several processes can share one file.
/// [`refresh`](LedgerStorage::refresh) replays the file to pick up events
/// written by other processes.
///
/// # Examples
///
/// ```no_run
/// use hpsweep::ledger::{JournalLedger, ResultsLedger};
///
/// let ledger = ResultsLedger::with_storage(JournalLedger::open("results.jsonl").unwrap());
/// ```
pub struct JournalLedger {
    memory: MemoryLedger,
    path: PathBuf,
    /// Serialises in-process writes so the file lock is held briefly.
    write_lock: Mutex<()>,
    /// Number of journal events reflected in `memory`.
    applied: AtomicUsize,
}

impl JournalLedger {
    /// Creates a journal ledger writing to `path` without reading it.
    ///
    /// Use [`open`](Self::open) to load an existing journal.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            memory: MemoryLedger::new(),
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
            applied: AtomicUsize::new(0),
        }
    }

    /// Opens a journal file and replays its events.
    ///
    /// A missing file yields an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) if the file exists
    /// but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let events = load_events(&path)?;
        let applied = events.len();
        Ok(Self {
            memory: MemoryLedger::with_rows(LedgerEvent::replay(events)),
            path,
            write_lock: Mutex::new(()),
            applied: AtomicUsize::new(applied),
        })
    }

    /// The journal's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_event(&self, event: &LedgerEvent) -> Result<()> {
        let _guard = self.write_lock.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let line = serde_json::to_string(event)?;
        let written = writeln!(file, "{line}").and_then(|()| file.flush());
        file.unlock()?;
        written?;

        self.applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl LedgerStorage for JournalLedger {
    fn append(&self, row: Row) -> Result<()> {
        self.memory.append_with(row, |row| {
            let written = self.write_event(&LedgerEvent::Append { row: row.clone() });
            #[cfg(feature = "tracing")]
            if let Err(e) = &written {
                tracing::warn!(error = %e, "journal append failed");
            }
            written
        })
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
        let Ok(events) = load_events(&self.path) else {
            return false;
        };
        let mut guard = self.memory.rows_arc().write();
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

/// Reads every event of a journal. A missing file has no events.
fn load_events(path: &Path) -> Result<Vec<LedgerEvent>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    file.lock_shared()?;
    let reader = BufReader::new(&file);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        events.push(serde_json::from_str(line)?);
    }
    file.unlock()?;

    Ok(events)
}
