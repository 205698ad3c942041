// ============================================================================
// Unit-of-Work Manager
// ============================================================================

use super::{SessionRelease, UnitOfWork};
use crate::config::PersistenceConfig;
use crate::core::{Result, TaskId, TaskLocal, TxError};
use crate::provider::{PersistenceProvider, Session, SessionFactory, SessionOf};
use log::{debug, warn};
use std::sync::{Arc, RwLock};

/// Persistence service and per-task session manager
///
/// `start()` bootstraps the provider's session factory from configuration;
/// afterwards every logical task (thread) gets at most one session, created by
/// `begin()` and closed by `end()`.
///
/// # Examples
///
/// ```
/// use txscope::{PersistenceConfig, UnitOfWork, UnitOfWorkManager};
/// use txscope::memory::MemoryProvider;
///
/// # fn main() -> txscope::Result<()> {
/// let manager = UnitOfWorkManager::new(MemoryProvider::new(), PersistenceConfig::new("app"));
/// manager.start()?;
///
/// manager.begin()?;
/// assert!(manager.has_begun());
/// manager.end()?;
/// assert!(!manager.has_begun());
///
/// manager.stop()?;
/// # Ok(())
/// # }
/// ```
pub struct UnitOfWorkManager<P: PersistenceProvider> {
    provider: P,
    config: PersistenceConfig,
    /// `Some` while started
    factory: RwLock<Option<Arc<P::Factory>>>,
    sessions: TaskLocal<Arc<SessionOf<P>>>,
}

impl<P: PersistenceProvider> UnitOfWorkManager<P> {
    pub fn new(provider: P, config: PersistenceConfig) -> Self {
        Self {
            provider,
            config,
            factory: RwLock::new(None),
            sessions: TaskLocal::new(),
        }
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Create the session factory. Calling it on a started service does nothing.
    pub fn start(&self) -> Result<()> {
        let mut factory = self.factory.write()?;
        if factory.is_some() {
            return Ok(());
        }

        self.config.validate()?;
        *factory = Some(Arc::new(self.provider.create_factory(&self.config)?));

        debug!("Persistence unit '{}' started", self.config.unit_name);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.factory
            .read()
            .map(|factory| factory.is_some())
            .unwrap_or(false)
    }

    /// Close the session factory
    ///
    /// Does nothing if the service was never started. Fails with
    /// `InvalidState` if the factory was closed behind the manager's back.
    /// A failing close still leaves the service stopped.
    pub fn stop(&self) -> Result<()> {
        let mut slot = self.factory.write()?;
        let Some(factory) = slot.as_ref() else {
            return Ok(());
        };

        if !factory.is_open() {
            return Err(TxError::InvalidState(
                "Persistence service is already shut down".into(),
            ));
        }

        let closed = factory.close();
        *slot = None;

        debug!("Persistence unit '{}' stopped", self.config.unit_name);
        closed
    }

    /// The active session factory
    pub fn factory(&self) -> Result<Arc<P::Factory>> {
        self.factory.read()?.clone().ok_or(TxError::NotStarted)
    }

    /// Number of tasks that currently hold a session
    ///
    /// Includes sessions orphaned by threads that exited without `end()`.
    pub fn bound_sessions(&self) -> usize {
        self.sessions.bound_count()
    }

    /// Close sessions left bound by threads that have exited
    ///
    /// Returns how many were unbound. Close failures are logged and still
    /// count.
    pub fn release_orphaned(&self) -> Result<usize> {
        let orphaned = self.sessions.sweep()?;
        let factory = self.factory().ok();

        for session in &orphaned {
            let closed = match &factory {
                Some(factory) => factory.close_session(session),
                None => session.close(),
            };
            if let Err(err) = closed {
                warn!("Failed to close orphaned session: {}", err);
            }
        }

        if !orphaned.is_empty() {
            debug!("Released {} orphaned session(s)", orphaned.len());
        }
        Ok(orphaned.len())
    }

    /// Run `work` against the current task's session
    ///
    /// If no session was bound on entry, one is begun for the call and ended
    /// afterwards on every exit path. A failure of `work` takes precedence over
    /// a failure to close the session, which is then only logged.
    pub fn within_session<T, E, F>(&self, work: F) -> std::result::Result<T, E>
    where
        E: From<TxError>,
        F: FnOnce(&SessionOf<P>) -> std::result::Result<T, E>,
    {
        let release = if self.has_begun() {
            None
        } else {
            self.begin()?;
            Some(SessionRelease::new(self))
        };

        let session = self.session()?;
        let outcome = work(&*session);

        let Some(release) = release else {
            return outcome;
        };

        match (outcome, release.finish()) {
            (Err(err), Err(close_err)) => {
                warn!("Failed to close session after failed work: {}", close_err);
                Err(err)
            }
            (outcome, Ok(())) => outcome,
            (Ok(_), Err(close_err)) => Err(close_err.into()),
        }
    }
}

impl<P: PersistenceProvider> UnitOfWork for UnitOfWorkManager<P> {
    type Session = SessionOf<P>;

    /// Bind a new session to the current thread
    ///
    /// The binding lives until `end()` runs on the same thread. A thread that
    /// exits while still bound (for instance after a joined invocation left
    /// its transaction unresolved) keeps its session open until
    /// [`UnitOfWorkManager::release_orphaned`] is called.
    fn begin(&self) -> Result<()> {
        if self.sessions.is_bound() {
            return Ok(());
        }

        let session = self.factory()?.create_session()?;
        self.sessions.set(Arc::new(session))?;

        debug!("Session opened for {}", TaskId::current());
        Ok(())
    }

    fn end(&self) -> Result<()> {
        // Unbind first: the binding is gone even if close fails.
        let Some(session) = self.sessions.take()? else {
            return Ok(());
        };

        debug!("Closing session for {}", TaskId::current());
        match self.factory() {
            Ok(factory) => factory.close_session(&session),
            Err(_) => session.close(),
        }
    }

    fn has_begun(&self) -> bool {
        self.sessions.is_bound()
    }

    fn session(&self) -> Result<Arc<Self::Session>> {
        if !self.has_begun() {
            self.begin()?;
        }

        self.sessions
            .get()?
            .ok_or_else(|| TxError::SessionError("No session bound to the current task".into()))
    }
}
