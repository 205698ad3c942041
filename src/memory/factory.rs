use super::Fault;
use super::session::MemorySession;
use super::store::MemoryStore;
use crate::config::PersistenceConfig;
use crate::core::{Result, TxError};
use crate::provider::SessionFactory;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Session factory over a shared [`MemoryStore`]
pub struct MemoryFactory {
    store: Arc<MemoryStore>,
    config: PersistenceConfig,
    open: AtomicBool,
}

impl MemoryFactory {
    pub(crate) fn new(store: Arc<MemoryStore>, config: PersistenceConfig) -> Self {
        Self {
            store,
            config,
            open: AtomicBool::new(true),
        }
    }

    /// Configuration the factory was created with
    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

impl SessionFactory for MemoryFactory {
    type Session = MemorySession;

    fn create_session(&self) -> Result<MemorySession> {
        if !self.is_open() {
            return Err(TxError::SessionError(format!(
                "Session factory for '{}' is closed",
                self.config.unit_name
            )));
        }

        self.store.trip(Fault::CreateSession)?;

        let session = MemorySession::open(Arc::clone(&self.store));
        self.store.note_session_opened();
        debug!("Memory session {} opened on '{}'", session.id(), self.config.unit_name);
        Ok(session)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Err(TxError::InvalidState(format!(
                "Session factory for '{}' is already closed",
                self.config.unit_name
            )));
        }

        self.store.trip(Fault::CloseFactory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> MemoryFactory {
        MemoryFactory::new(Arc::new(MemoryStore::new()), PersistenceConfig::new("unit"))
    }

    #[test]
    fn test_create_session() {
        let factory = factory();
        let session = factory.create_session().unwrap();
        assert!(session.is_open());
        assert_eq!(factory.store().stats().sessions_opened, 1);
    }

    #[test]
    fn test_closed_factory_refuses_sessions() {
        let factory = factory();
        factory.close().unwrap();

        assert!(!factory.is_open());
        assert!(factory.create_session().is_err());
        assert!(matches!(factory.close(), Err(TxError::InvalidState(_))));
    }

    #[test]
    fn test_close_session_delegates_to_session() {
        let factory = factory();
        let session = factory.create_session().unwrap();

        factory.close_session(&session).unwrap();
        assert!(!session.is_open());
    }

    #[test]
    fn test_injected_create_failure() {
        let factory = factory();
        factory.store().inject(Fault::CreateSession);

        assert!(matches!(factory.create_session(), Err(TxError::SessionError(_))));
        assert!(factory.create_session().is_ok());
    }
}
