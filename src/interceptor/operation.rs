use super::TRANSACTIONAL;
use super::policy::RollbackPolicy;
use std::fmt;

/// Static description of a guarded operation
///
/// Markers are listed outermost first: the interceptor registered for the
/// first marker sees the call before any other.
pub struct OperationDescriptor<E> {
    name: String,
    markers: Vec<&'static str>,
    rollback_policy: RollbackPolicy<E>,
}

impl<E> OperationDescriptor<E> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            markers: Vec::new(),
            rollback_policy: RollbackPolicy::new(),
        }
    }

    /// Operation carrying only the transactional marker
    pub fn transactional(name: &str, policy: RollbackPolicy<E>) -> Self {
        Self::new(name).marker(TRANSACTIONAL).rollback(policy)
    }

    /// Append a marker. A marker already present is not added twice.
    pub fn marker(mut self, marker: &'static str) -> Self {
        if !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
        self
    }

    pub fn rollback(mut self, policy: RollbackPolicy<E>) -> Self {
        self.rollback_policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn markers(&self) -> &[&'static str] {
        &self.markers
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| *m == marker)
    }

    pub fn rollback_policy(&self) -> &RollbackPolicy<E> {
        &self.rollback_policy
    }
}

impl<E> Clone for OperationDescriptor<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            markers: self.markers.clone(),
            rollback_policy: self.rollback_policy.clone(),
        }
    }
}

impl<E> fmt::Debug for OperationDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("markers", &self.markers)
            .field("rollback_policy", &self.rollback_policy)
            .finish()
    }
}
