// ============================================================================
// Unit of Work
// ============================================================================
//
// Owns the lifecycle of the persistence session bound to the current logical
// task. The transactional interceptor depends only on the `UnitOfWork` trait.
//
// ============================================================================

pub mod manager;

pub use manager::UnitOfWorkManager;

use crate::core::Result;
use crate::provider::Session;
use log::warn;
use std::sync::Arc;

/// Session lifecycle scoped to the current logical task.
pub trait UnitOfWork: Send + Sync {
    type Session: Session;

    /// Bind a new session to the current task. No-op if one is bound.
    fn begin(&self) -> Result<()>;

    /// Unbind and close the current task's session. No-op if none is bound.
    fn end(&self) -> Result<()>;

    /// Whether a session is bound to the current task
    fn has_begun(&self) -> bool;

    /// The current task's session, beginning one first if needed
    fn session(&self) -> Result<Arc<Self::Session>>;
}

impl<W: UnitOfWork + ?Sized> UnitOfWork for Arc<W> {
    type Session = W::Session;

    fn begin(&self) -> Result<()> {
        (**self).begin()
    }

    fn end(&self) -> Result<()> {
        (**self).end()
    }

    fn has_begun(&self) -> bool {
        (**self).has_begun()
    }

    fn session(&self) -> Result<Arc<Self::Session>> {
        (**self).session()
    }
}

impl<W: UnitOfWork + ?Sized> UnitOfWork for &W {
    type Session = W::Session;

    fn begin(&self) -> Result<()> {
        (**self).begin()
    }

    fn end(&self) -> Result<()> {
        (**self).end()
    }

    fn has_begun(&self) -> bool {
        (**self).has_begun()
    }

    fn session(&self) -> Result<Arc<Self::Session>> {
        (**self).session()
    }
}

/// Ends the task's session when dropped, unless finished explicitly.
///
/// `finish` reports the close result; the drop path can only log it.
pub(crate) struct SessionRelease<'a, W: UnitOfWork + ?Sized> {
    work: &'a W,
    armed: bool,
}

impl<'a, W: UnitOfWork + ?Sized> SessionRelease<'a, W> {
    pub(crate) fn new(work: &'a W) -> Self {
        Self { work, armed: true }
    }

    pub(crate) fn finish(mut self) -> Result<()> {
        self.armed = false;
        self.work.end()
    }
}

impl<W: UnitOfWork + ?Sized> Drop for SessionRelease<'_, W> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = self.work.end() {
                warn!("Failed to end session on abnormal exit: {}", err);
            }
        }
    }
}
