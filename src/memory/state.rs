// ============================================================================
// Transaction State
// ============================================================================
//
// State transitions of an in-memory transaction:
//   Inactive ──begin──> Active ──commit──> Committed
//                         │
//                         └──rollback──> RolledBack
//
// A resolved transaction may be begun again; it then gets a fresh id.
//
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one begin..resolve cycle of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Generate a new unique transaction ID
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Never begun on this session
    Inactive,

    Active,

    Committed,

    RolledBack,
}

impl TransactionState {
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }

    /// Check if the last cycle was resolved
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::RolledBack
        )
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Inactive => write!(f, "INACTIVE"),
            TransactionState::Active => write!(f, "ACTIVE"),
            TransactionState::Committed => write!(f, "COMMITTED"),
            TransactionState::RolledBack => write!(f, "ROLLED BACK"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_generation() {
        let id1 = TransactionId::new();
        let id2 = TransactionId::new();
        assert!(id2.as_u64() > id1.as_u64());
        assert_eq!(id1.to_string(), format!("txn_{}", id1.as_u64()));
    }

    #[test]
    fn test_state_classification() {
        assert!(TransactionState::Active.is_active());
        assert!(!TransactionState::Inactive.is_active());
        assert!(!TransactionState::Inactive.is_terminal());
        assert!(TransactionState::Committed.is_terminal());
        assert!(TransactionState::RolledBack.is_terminal());
        assert_eq!(TransactionState::RolledBack.to_string(), "ROLLED BACK");
    }
}
