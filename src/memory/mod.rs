// ============================================================================
// In-Memory Persistence Provider
// ============================================================================
//
// A small transactional store implementing the provider contracts. Committed
// rows live in a shared `MemoryStore`; each session buffers its transaction's
// writes and applies them atomically on commit.
//
// Faults can be injected to drive the failure paths of the unit-of-work
// manager and the transactional interceptor.
//
// ============================================================================

pub mod change;
pub mod factory;
pub mod session;
pub mod state;
pub mod store;
pub mod transaction;

pub use change::Change;
pub use factory::MemoryFactory;
pub use session::MemorySession;
pub use state::{TransactionId, TransactionState};
pub use store::{Fault, MemoryStats, MemoryStore, Row};
pub use transaction::MemoryTransaction;

use crate::config::PersistenceConfig;
use crate::core::Result;
use crate::provider::PersistenceProvider;
use std::sync::Arc;

/// Provider handing out factories over one shared store
///
/// Every factory created by the same provider sees the same data, so a
/// restarted service keeps what was committed before.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    store: Arc<MemoryStore>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider over an existing store
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

impl PersistenceProvider for MemoryProvider {
    type Factory = MemoryFactory;

    fn create_factory(&self, config: &PersistenceConfig) -> Result<MemoryFactory> {
        self.store.trip(Fault::CreateFactory)?;
        Ok(MemoryFactory::new(Arc::clone(&self.store), config.clone()))
    }
}
