use super::change::Change;
use super::state::{TransactionId, TransactionState};
use super::store::{MemoryStore, Row};
use crate::core::{Result, TxError};
use crate::provider::Transaction;
use std::sync::{Arc, Mutex};

struct TxnInner {
    id: Option<TransactionId>,
    state: TransactionState,
    changes: Vec<Change>,
    detached: bool,
}

/// Transaction handle of a [`super::MemorySession`]
///
/// Writes are buffered until commit; rollback discards them. Commit applies
/// the whole buffer to the store under one lock.
pub struct MemoryTransaction {
    store: Arc<MemoryStore>,
    inner: Mutex<TxnInner>,
}

impl MemoryTransaction {
    pub(crate) fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            inner: Mutex::new(TxnInner {
                id: None,
                state: TransactionState::Inactive,
                changes: Vec::new(),
                detached: false,
            }),
        }
    }

    /// Id of the current or last cycle
    pub fn id(&self) -> Option<TransactionId> {
        self.inner.lock().ok().and_then(|inner| inner.id)
    }

    pub fn state(&self) -> TransactionState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(TransactionState::Inactive)
    }

    /// Number of buffered writes
    pub fn change_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.changes.len()).unwrap_or(0)
    }

    pub(crate) fn record(&self, change: Change) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if !inner.state.is_active() {
            return Err(TxError::TransactionRequired(format!(
                "write to '{}' outside of an active transaction",
                change.table_name()
            )));
        }

        inner.changes.push(change);
        Ok(())
    }

    /// Layer this transaction's pending writes over committed rows
    pub(crate) fn overlay(&self, table: &str, mut committed: Vec<Row>) -> Result<Vec<Row>> {
        let inner = self.inner.lock()?;
        if inner.state.is_active() {
            inner
                .changes
                .iter()
                .filter(|change| change.table_name() == table)
                .for_each(|change| change.apply_to(&mut committed));
        }
        Ok(committed)
    }

    /// Drop pending work when the owning session closes
    pub(crate) fn detach(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.changes.clear();
        inner.detached = true;
        if inner.state.is_active() {
            inner.state = TransactionState::RolledBack;
        }
    }
}

impl Transaction for MemoryTransaction {
    fn is_active(&self) -> bool {
        self.state().is_active()
    }

    fn begin(&self) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if inner.detached {
            return Err(TxError::SessionError("Session is closed".into()));
        }
        if inner.state.is_active() {
            return Err(TxError::TransactionError("Transaction already active".into()));
        }

        self.store.trip(super::Fault::Begin)?;

        inner.id = Some(TransactionId::new());
        inner.state = TransactionState::Active;
        inner.changes.clear();
        self.store.note_begin();
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if !inner.state.is_active() {
            return Err(TxError::TransactionError("No active transaction".into()));
        }

        let changes = std::mem::take(&mut inner.changes);
        let applied = self
            .store
            .trip(super::Fault::Commit)
            .and_then(|_| self.store.apply(&changes));

        match applied {
            Ok(()) => {
                inner.state = TransactionState::Committed;
                self.store.note_commit();
                Ok(())
            }
            Err(err) => {
                // A failed commit leaves nothing behind.
                inner.state = TransactionState::RolledBack;
                Err(err)
            }
        }
    }

    fn rollback(&self) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if !inner.state.is_active() {
            return Err(TxError::TransactionError("No active transaction".into()));
        }

        inner.changes.clear();
        inner.state = TransactionState::RolledBack;

        self.store.trip(super::Fault::Rollback)?;
        self.store.note_rollback();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Fault;
    use serde_json::json;

    fn transaction() -> (Arc<MemoryStore>, MemoryTransaction) {
        let store = Arc::new(MemoryStore::new());
        let txn = MemoryTransaction::new(Arc::clone(&store));
        (store, txn)
    }

    fn insert(row: Row) -> Change {
        Change::Insert { table: "t".into(), row }
    }

    #[test]
    fn test_transaction_lifecycle() {
        let (store, txn) = transaction();
        assert_eq!(txn.state(), TransactionState::Inactive);
        assert!(txn.id().is_none());

        txn.begin().unwrap();
        assert!(txn.is_active());
        txn.record(insert(json!(1))).unwrap();
        assert_eq!(store.count("t").unwrap(), 0);

        txn.commit().unwrap();
        assert_eq!(txn.state(), TransactionState::Committed);
        assert_eq!(store.count("t").unwrap(), 1);
        assert_eq!(store.stats().commits, 1);
    }

    #[test]
    fn test_rollback_discards_changes() {
        let (store, txn) = transaction();
        txn.begin().unwrap();
        txn.record(insert(json!(1))).unwrap();
        assert_eq!(txn.change_count(), 1);

        txn.rollback().unwrap();
        assert_eq!(txn.change_count(), 0);
        assert_eq!(txn.state(), TransactionState::RolledBack);
        assert_eq!(store.count("t").unwrap(), 0);
    }

    #[test]
    fn test_cannot_begin_twice() {
        let (_store, txn) = transaction();
        txn.begin().unwrap();
        assert!(txn.begin().is_err());
    }

    #[test]
    fn test_resolve_requires_active() {
        let (_store, txn) = transaction();
        assert!(txn.commit().is_err());
        assert!(txn.rollback().is_err());
    }

    #[test]
    fn test_begin_again_after_commit_gets_new_id() {
        let (_store, txn) = transaction();
        txn.begin().unwrap();
        let first = txn.id().unwrap();
        txn.commit().unwrap();

        txn.begin().unwrap();
        assert_ne!(txn.id().unwrap(), first);
    }

    #[test]
    fn test_write_requires_active_transaction() {
        let (_store, txn) = transaction();
        let err = txn.record(insert(json!(1))).unwrap_err();
        assert!(matches!(err, TxError::TransactionRequired(_)));
    }

    #[test]
    fn test_failed_commit_persists_nothing() {
        let (store, txn) = transaction();
        txn.begin().unwrap();
        txn.record(insert(json!(1))).unwrap();
        store.inject(Fault::Commit);

        assert!(txn.commit().is_err());
        assert!(!txn.is_active());
        assert_eq!(store.count("t").unwrap(), 0);
    }

    #[test]
    fn test_failed_rollback_still_resolves() {
        let (store, txn) = transaction();
        txn.begin().unwrap();
        store.inject(Fault::Rollback);

        assert!(txn.rollback().is_err());
        assert!(!txn.is_active());
    }

    #[test]
    fn test_overlay_shows_pending_writes() {
        let (_store, txn) = transaction();
        txn.begin().unwrap();
        txn.record(insert(json!(2))).unwrap();
        txn.record(Change::Insert { table: "other".into(), row: json!(9) }).unwrap();

        let view = txn.overlay("t", vec![json!(1)]).unwrap();
        assert_eq!(view, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_detached_transaction_cannot_begin() {
        let (_store, txn) = transaction();
        txn.begin().unwrap();
        txn.detach();

        assert!(!txn.is_active());
        assert!(matches!(txn.begin(), Err(TxError::SessionError(_))));
    }
}
