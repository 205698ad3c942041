use super::change::Change;
use super::store::{MemoryStore, Row};
use super::transaction::MemoryTransaction;
use super::Fault;
use crate::core::{Result, TxError};
use crate::provider::Session;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Session on a [`MemoryStore`]
///
/// Reads see committed rows plus this session's own pending writes. Writes
/// require an active transaction.
pub struct MemorySession {
    id: Uuid,
    store: Arc<MemoryStore>,
    transaction: MemoryTransaction,
    open: AtomicBool,
}

impl MemorySession {
    pub(crate) fn open(store: Arc<MemoryStore>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction: MemoryTransaction::new(Arc::clone(&store)),
            store,
            open: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn insert(&self, table: &str, row: Row) -> Result<()> {
        self.ensure_open()?;
        self.transaction.record(Change::Insert {
            table: table.to_string(),
            row,
        })
    }

    /// Delete every row of `table`
    pub fn clear(&self, table: &str) -> Result<()> {
        self.ensure_open()?;
        self.transaction.record(Change::Clear {
            table: table.to_string(),
        })
    }

    pub fn rows(&self, table: &str) -> Result<Vec<Row>> {
        self.ensure_open()?;
        let committed = self.store.rows(table)?;
        self.transaction.overlay(table, committed)
    }

    pub fn count(&self, table: &str) -> Result<usize> {
        Ok(self.rows(table)?.len())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(TxError::SessionError(format!("Session {} is closed", self.id)))
        }
    }
}

impl Session for MemorySession {
    type Transaction = MemoryTransaction;

    fn transaction(&self) -> &MemoryTransaction {
        &self.transaction
    }

    fn close(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Err(TxError::SessionError(format!(
                "Session {} is already closed",
                self.id
            )));
        }

        self.transaction.detach();
        self.store.note_session_closed();
        self.store.trip(Fault::CloseSession)
    }
}

impl std::fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySession")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .field("transaction", &self.transaction.state())
            .finish()
    }
}
