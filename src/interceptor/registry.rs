use super::MethodInterceptor;
use super::chain::{GuardedOperation, InterceptorChain};
use super::operation::OperationDescriptor;
use crate::core::{Result, TxError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Marker name to interceptor mapping
pub struct InterceptorRegistry<E> {
    handlers: Vec<(&'static str, Arc<dyn MethodInterceptor<E>>)>,
}

impl<E> InterceptorRegistry<E> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register `interceptor` for `marker`, replacing any previous one
    pub fn register(&mut self, marker: &'static str, interceptor: Arc<dyn MethodInterceptor<E>>) {
        if let Some(slot) = self.handlers.iter_mut().find(|(m, _)| *m == marker) {
            warn!(
                marker,
                previous = slot.1.name(),
                replacement = interceptor.name(),
                "replacing interceptor"
            );
            slot.1 = interceptor;
            return;
        }

        debug!(marker, interceptor = interceptor.name(), "interceptor registered");
        self.handlers.push((marker, interceptor));
    }

    pub fn with(mut self, marker: &'static str, interceptor: Arc<dyn MethodInterceptor<E>>) -> Self {
        self.register(marker, interceptor);
        self
    }

    pub fn handler(&self, marker: &str) -> Option<&Arc<dyn MethodInterceptor<E>>> {
        self.handlers
            .iter()
            .find(|(m, _)| *m == marker)
            .map(|(_, interceptor)| interceptor)
    }

    /// Registered markers, in registration order
    pub fn markers(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|(marker, _)| *marker).collect()
    }

    /// Chain for the operation's markers, outermost first
    pub fn chain_for(&self, operation: &OperationDescriptor<E>) -> Result<InterceptorChain<E>> {
        let mut chain = InterceptorChain::new();
        for marker in operation.markers() {
            let interceptor = self
                .handler(marker)
                .ok_or_else(|| TxError::UnknownMarker(marker.to_string()))?;
            chain.push(Arc::clone(interceptor));
        }
        Ok(chain)
    }

    /// Bind `operation` to its chain
    pub fn guard(&self, operation: OperationDescriptor<E>) -> Result<GuardedOperation<E>> {
        let chain = self.chain_for(&operation)?;
        Ok(GuardedOperation::new(operation, chain))
    }
}

impl<E> Default for InterceptorRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
