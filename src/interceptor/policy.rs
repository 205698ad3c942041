use std::fmt;
use std::sync::Arc;

type Matcher<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

struct RollbackKind<E> {
    name: String,
    matches: Matcher<E>,
}

impl<E> Clone for RollbackKind<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            matches: Arc::clone(&self.matches),
        }
    }
}

/// Failure kinds that force a rollback
///
/// Kinds are checked in declaration order. A failure that matches none of
/// them commits the work done so far and is then propagated as is.
///
/// # Examples
///
/// ```
/// use txscope::RollbackPolicy;
///
/// #[derive(Debug)]
/// enum ShopError {
///     OutOfStock,
///     Audit(String),
/// }
///
/// let policy = RollbackPolicy::new()
///     .rollback_when("out-of-stock", |e: &ShopError| matches!(e, ShopError::OutOfStock));
///
/// assert!(policy.should_rollback(&ShopError::OutOfStock));
/// assert!(!policy.should_rollback(&ShopError::Audit("late".into())));
/// ```
pub struct RollbackPolicy<E> {
    kinds: Vec<RollbackKind<E>>,
}

impl<E> RollbackPolicy<E> {
    /// Empty policy: every failure commits
    pub fn new() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Roll back on failures matched by `matches`
    pub fn rollback_when<F>(mut self, kind: &str, matches: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.kinds.push(RollbackKind {
            name: kind.to_string(),
            matches: Arc::new(matches),
        });
        self
    }

    /// Roll back on every failure
    pub fn rollback_always(self) -> Self {
        self.rollback_when("*", |_| true)
    }

    /// First declared kind matching `err`
    pub fn matching_kind(&self, err: &E) -> Option<&str> {
        self.kinds
            .iter()
            .find(|kind| (kind.matches)(err))
            .map(|kind| kind.name.as_str())
    }

    pub fn should_rollback(&self, err: &E) -> bool {
        self.matching_kind(err).is_some()
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.kinds.iter().map(|kind| kind.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl RollbackPolicy<anyhow::Error> {
    /// Roll back when a `T` appears anywhere in the error's cause chain
    pub fn rollback_on<T>(self) -> Self
    where
        T: std::error::Error + Send + Sync + 'static,
    {
        self.rollback_when(std::any::type_name::<T>(), |err: &anyhow::Error| {
            err.is::<T>() || err.chain().any(|cause| cause.is::<T>())
        })
    }
}

impl<E> Default for RollbackPolicy<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for RollbackPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            kinds: self.kinds.clone(),
        }
    }
}

impl<E> fmt::Debug for RollbackPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollbackPolicy")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("domain rule violated")]
    struct DomainError;

    #[derive(Error, Debug)]
    #[error("audit failed")]
    struct AuditError;

    #[test]
    fn test_empty_policy_never_rolls_back() {
        let policy: RollbackPolicy<anyhow::Error> = RollbackPolicy::default();
        assert!(policy.is_empty());
        assert!(!policy.should_rollback(&anyhow!("boom")));
    }

    #[test]
    fn test_rollback_on_type() {
        let policy = RollbackPolicy::new().rollback_on::<DomainError>();

        assert!(policy.should_rollback(&anyhow::Error::new(DomainError)));
        assert!(!policy.should_rollback(&anyhow::Error::new(AuditError)));
        assert!(!policy.should_rollback(&anyhow!("generic")));
    }

    #[test]
    fn test_rollback_on_type_behind_context() {
        let policy = RollbackPolicy::new().rollback_on::<DomainError>();
        let err = Err::<(), _>(DomainError)
            .context("while placing order")
            .unwrap_err();

        assert!(policy.should_rollback(&err));
    }

    #[test]
    fn test_first_matching_kind_wins() {
        let policy = RollbackPolicy::new()
            .rollback_when("negative", |n: &i32| *n < 0)
            .rollback_when("even", |n: &i32| n % 2 == 0);

        assert_eq!(policy.matching_kind(&-4), Some("negative"));
        assert_eq!(policy.matching_kind(&4), Some("even"));
        assert_eq!(policy.matching_kind(&3), None);
        assert_eq!(policy.kinds(), vec!["negative", "even"]);
    }

    #[test]
    fn test_rollback_always() {
        let policy = RollbackPolicy::new().rollback_always();
        assert!(policy.should_rollback(&"anything"));
    }

    #[test]
    fn test_clone_and_debug() {
        let policy = RollbackPolicy::new().rollback_on::<AuditError>();
        let copy = policy.clone();

        assert!(copy.should_rollback(&anyhow::Error::new(AuditError)));
        assert!(format!("{:?}", copy).contains("AuditError"));
    }
}
