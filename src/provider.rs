//! Contracts a persistence backend implements to be driven by this crate.
//!
//! The unit-of-work manager and the transactional interceptor only ever talk
//! to these traits. You can plug in the bundled [`crate::memory`] provider for
//! tests and simple apps, or wrap a real database driver for production use.

use crate::config::PersistenceConfig;
use crate::core::Result;

/// A demarcated unit of work on a [`Session`].
///
/// Methods take `&self`: a transaction is a handle owned by its session, and
/// the guarded operation may use the session while the interceptor holds the
/// transaction.
pub trait Transaction: Send + Sync {
    /// Whether the transaction has begun and is not yet resolved
    fn is_active(&self) -> bool;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;
}

/// An open handle to the persistence resource.
pub trait Session: Send + Sync + 'static {
    type Transaction: Transaction;

    /// The session's transaction. Always the same handle for a given session.
    fn transaction(&self) -> &Self::Transaction;

    fn close(&self) -> Result<()>;
}

/// Creates sessions for one persistence unit.
pub trait SessionFactory: Send + Sync + 'static {
    type Session: Session;

    fn create_session(&self) -> Result<Self::Session>;

    /// Close a session created by this factory
    fn close_session(&self, session: &Self::Session) -> Result<()> {
        session.close()
    }

    fn is_open(&self) -> bool;

    fn close(&self) -> Result<()>;
}

/// Bootstraps a [`SessionFactory`] from configuration.
pub trait PersistenceProvider: Send + Sync + 'static {
    type Factory: SessionFactory;

    /// Build a factory. `config` must be passed through unmodified.
    fn create_factory(&self, config: &PersistenceConfig) -> Result<Self::Factory>;
}

/// Session type produced by a provider's factory
pub type SessionOf<P> = <<P as PersistenceProvider>::Factory as SessionFactory>::Session;
