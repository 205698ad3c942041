use super::change::Change;
use crate::core::{Result, TxError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

/// A stored row
pub type Row = serde_json::Value;

/// Failure that can be armed on a store to exercise error paths.
///
/// Each injected fault fires once, on the next matching operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    CreateFactory,
    CloseFactory,
    CreateSession,
    CloseSession,
    Begin,
    Commit,
    Rollback,
}

impl Fault {
    fn to_error(self) -> TxError {
        let message = format!("injected {:?} failure", self);
        match self {
            Fault::CreateFactory | Fault::CloseFactory => TxError::InvalidState(message),
            Fault::CreateSession | Fault::CloseSession => TxError::SessionError(message),
            Fault::Begin | Fault::Commit | Fault::Rollback => TxError::TransactionError(message),
        }
    }
}

/// Committed data shared by every session of a provider
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    faults: Mutex<HashSet<Fault>>,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    transactions_begun: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            faults: Mutex::new(HashSet::new()),
            sessions_opened: AtomicUsize::new(0),
            sessions_closed: AtomicUsize::new(0),
            transactions_begun: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
        }
    }

    /// Arm a one-shot fault
    pub fn inject(&self, fault: Fault) {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(fault);
    }

    /// Fire `fault` if armed
    pub(crate) fn trip(&self, fault: Fault) -> Result<()> {
        let armed = self.faults.lock()?.remove(&fault);
        if armed { Err(fault.to_error()) } else { Ok(()) }
    }

    /// Committed rows of a table. Unknown tables are empty.
    pub fn rows(&self, table: &str) -> Result<Vec<Row>> {
        let tables = self.tables.read()?;
        Ok(tables.get(table).cloned().unwrap_or_default())
    }

    pub fn count(&self, table: &str) -> Result<usize> {
        let tables = self.tables.read()?;
        Ok(tables.get(table).map_or(0, Vec::len))
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables
            .read()
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Apply a committed change set atomically
    pub(crate) fn apply(&self, changes: &[Change]) -> Result<()> {
        let mut tables = self.tables.write()?;
        for change in changes {
            let rows = tables.entry(change.table_name().to_string()).or_default();
            change.apply_to(rows);
        }
        Ok(())
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            sessions_opened: self.sessions_opened.load(Ordering::SeqCst),
            sessions_closed: self.sessions_closed.load(Ordering::SeqCst),
            transactions_begun: self.transactions_begun.load(Ordering::SeqCst),
            commits: self.commits.load(Ordering::SeqCst),
            rollbacks: self.rollbacks.load(Ordering::SeqCst),
        }
    }

    pub(crate) fn note_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn note_session_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn note_begin(&self) {
        self.transactions_begun.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn note_commit(&self) {
        self.commits.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn note_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Store activity counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStats {
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    pub transactions_begun: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

impl MemoryStats {
    pub fn open_sessions(&self) -> usize {
        self.sessions_opened.saturating_sub(self.sessions_closed)
    }
}

impl std::fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Store Stats: {} open sessions ({} opened), {} begun, {} committed, {} rolled back",
            self.open_sessions(),
            self.sessions_opened,
            self.transactions_begun,
            self.commits,
            self.rollbacks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_table_is_empty() {
        let store = MemoryStore::new();
        assert!(store.rows("nothing").unwrap().is_empty());
        assert_eq!(store.count("nothing").unwrap(), 0);
    }

    #[test]
    fn test_apply_changes() {
        let store = MemoryStore::new();
        store
            .apply(&[
                Change::Insert { table: "a".into(), row: json!(1) },
                Change::Insert { table: "a".into(), row: json!(2) },
                Change::Insert { table: "b".into(), row: json!(3) },
            ])
            .unwrap();

        assert_eq!(store.rows("a").unwrap(), vec![json!(1), json!(2)]);
        assert_eq!(store.count("b").unwrap(), 1);

        store.apply(&[Change::Clear { table: "a".into() }]).unwrap();
        assert_eq!(store.count("a").unwrap(), 0);

        let mut names = store.table_names();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_fault_fires_once() {
        let store = MemoryStore::new();
        store.inject(Fault::Commit);

        let err = store.trip(Fault::Commit).unwrap_err();
        assert!(matches!(err, TxError::TransactionError(_)));
        assert!(store.trip(Fault::Commit).is_ok());
        assert!(store.trip(Fault::Rollback).is_ok());
    }

    #[test]
    fn test_stats_display() {
        let stats = MemoryStats {
            sessions_opened: 3,
            sessions_closed: 1,
            transactions_begun: 2,
            commits: 1,
            rollbacks: 1,
        };
        assert_eq!(stats.open_sessions(), 2);
        assert!(stats.to_string().contains("2 open sessions"));
    }
}
