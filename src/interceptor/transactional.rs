// ============================================================================
// Transactional Interceptor
// ============================================================================
//
// Wraps an operation in a transaction on the current task's session:
//
//   no session bound        -> begin one, owned by this invocation
//   transaction active      -> join: run the operation, leave resolution to
//                              the invocation that began the transaction
//   transaction inactive    -> begin, run, then
//                                Ok                   -> commit
//                                Err matching policy  -> rollback
//                                other Err            -> commit
//   owned session           -> ended on exit (after a failure only once the
//                              transaction is no longer active)
//
// The operation's own failure always reaches the caller. Failures of the
// cleanup steps that follow it are logged.
//
// ============================================================================

use super::policy::RollbackPolicy;
use super::{Invocation, MethodInterceptor, TRANSACTIONAL};
use crate::core::{Result, TxError};
use crate::provider::{Session, Transaction};
use crate::unit_of_work::UnitOfWork;
use std::sync::Arc;
use tracing::{error, trace, trace_span, warn};

/// Interceptor for the [`TRANSACTIONAL`] marker
pub struct TransactionalInterceptor<W: UnitOfWork> {
    work: W,
}

impl<W: UnitOfWork> TransactionalInterceptor<W> {
    pub fn new(work: W) -> Self {
        Self { work }
    }

    pub fn work(&self) -> &W {
        &self.work
    }

    /// Run `operation` inside a transaction, resolving it by `policy`
    pub fn run<T, E, F>(&self, policy: &RollbackPolicy<E>, operation: F) -> std::result::Result<T, E>
    where
        E: From<TxError>,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let mut scope = InvocationScope::enter(&self.work)?;

        if scope.transaction().is_active() {
            scope.join_transaction();
            trace!("active transaction in place");
            let outcome = operation();
            let released = scope.release(true);
            return settle(outcome, Ok(()), released);
        }

        scope.begin_transaction()?;
        trace!("transaction begun");

        trace!("invoking");
        let outcome = operation();

        let commit = match &outcome {
            Ok(_) => true,
            Err(err) => match policy.matching_kind(err) {
                Some(kind) => {
                    trace!(rollback_kind = kind, "reverting");
                    false
                }
                None => true,
            },
        };
        if commit {
            trace!("committing");
        }
        let resolved = scope.resolve(commit);

        let released = scope.release(outcome.is_err());
        settle(outcome, resolved, released)
    }
}

impl<W, E> MethodInterceptor<E> for TransactionalInterceptor<W>
where
    W: UnitOfWork,
    E: From<TxError>,
{
    fn name(&self) -> &'static str {
        TRANSACTIONAL
    }

    fn invoke(&self, invocation: Invocation<'_, E>) -> std::result::Result<(), E> {
        let (operation, proceed) = invocation.into_parts();
        let span = trace_span!("transactional", operation = %operation.name());
        let _entered = span.enter();

        self.run(operation.rollback_policy(), proceed)
    }
}

/// Resources acquired by one invocation
///
/// Dropping an unfinished scope (a panic in the operation, or an early
/// return) rolls back a transaction it began and ends a session it began.
struct InvocationScope<'a, W: UnitOfWork> {
    work: &'a W,
    session: Arc<W::Session>,
    state: InvocationState,
    owns_session: bool,
    finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InvocationState {
    NoSession,
    SessionOwnedHere,
    TransactionJoined,
    TransactionOwnedHere,
    Resolved,
}

impl<'a, W: UnitOfWork> InvocationScope<'a, W> {
    fn enter(work: &'a W) -> Result<Self> {
        let owns_session = !work.has_begun();
        if owns_session {
            work.begin()?;
        }

        let session = match work.session() {
            Ok(session) => session,
            Err(err) => {
                if owns_session {
                    if let Err(end_err) = work.end() {
                        log_suppressed(&end_err, "end session after lookup failure");
                    }
                }
                return Err(err);
            }
        };

        Ok(Self {
            work,
            session,
            state: if owns_session {
                InvocationState::SessionOwnedHere
            } else {
                InvocationState::NoSession
            },
            owns_session,
            finished: false,
        })
    }

    fn advance(&mut self, next: InvocationState) {
        trace!(from = ?self.state, to = ?next, "invocation state");
        self.state = next;
    }

    fn transaction(&self) -> &<W::Session as Session>::Transaction {
        self.session.transaction()
    }

    fn join_transaction(&mut self) {
        self.advance(InvocationState::TransactionJoined);
    }

    fn begin_transaction(&mut self) -> Result<()> {
        self.transaction().begin()?;
        self.advance(InvocationState::TransactionOwnedHere);
        Ok(())
    }

    fn resolve(&mut self, commit: bool) -> Result<()> {
        let resolved = if commit {
            self.transaction().commit()
        } else {
            self.transaction().rollback()
        };
        self.advance(InvocationState::Resolved);

        if resolved.is_err() && self.transaction().is_active() {
            self.abandon_transaction();
        }
        resolved
    }

    /// Roll back a transaction a failed commit or rollback left active
    fn abandon_transaction(&self) {
        warn!("transaction still active after failed resolution, rolling back");
        if let Err(err) = self.transaction().rollback() {
            log_suppressed(&err, "rollback of unresolved transaction");
        }
    }

    /// End the session if this invocation began it
    ///
    /// With `only_if_resolved` an owned session whose transaction is still
    /// active stays bound to the task.
    fn release(mut self, only_if_resolved: bool) -> Result<()> {
        self.finished = true;
        if !self.owns_session {
            return Ok(());
        }

        if only_if_resolved && self.transaction().is_active() {
            warn!("transaction still active, leaving session bound to the task");
            return Ok(());
        }

        self.work.end()
    }
}

impl<W: UnitOfWork> Drop for InvocationScope<'_, W> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        if self.state == InvocationState::TransactionOwnedHere && self.transaction().is_active() {
            warn!("invocation exited abnormally, rolling back");
            if let Err(err) = self.transaction().rollback() {
                log_suppressed(&err, "rollback on abnormal exit");
            }
        }

        if self.owns_session {
            if let Err(err) = self.work.end() {
                log_suppressed(&err, "end session on abnormal exit");
            }
        }
    }
}

/// Log a cleanup failure that will not reach the caller
///
/// Failures of the session or transaction are errors; anything else (a
/// poisoned lock, a stopped service) is a warning.
fn log_suppressed(err: &TxError, step: &str) {
    if err.is_resource_error() {
        error!(error = %err, step, "cleanup failed");
    } else {
        warn!(error = %err, step, "cleanup failed");
    }
}

/// Combine the operation outcome with the cleanup results
fn settle<T, E>(
    outcome: std::result::Result<T, E>,
    resolved: Result<()>,
    released: Result<()>,
) -> std::result::Result<T, E>
where
    E: From<TxError>,
{
    match outcome {
        Err(err) => {
            if let Err(resolve_err) = resolved {
                log_suppressed(&resolve_err, "resolve after operation failure");
            }
            if let Err(release_err) = released {
                log_suppressed(&release_err, "teardown after operation failure");
            }
            Err(err)
        }
        Ok(value) => match (resolved, released) {
            (Ok(()), Ok(())) => Ok(value),
            (Err(resolve_err), released) => {
                if let Err(release_err) = released {
                    log_suppressed(&release_err, "teardown after commit failure");
                }
                Err(resolve_err.into())
            }
            (Ok(()), Err(release_err)) => Err(release_err.into()),
        },
    }
}
