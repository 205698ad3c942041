use super::operation::OperationDescriptor;
use super::{Invocation, MethodInterceptor, Proceed};
use crate::core::TxError;
use std::sync::Arc;

/// Ordered interceptors wrapped around one operation, outermost first
pub struct InterceptorChain<E> {
    interceptors: Vec<Arc<dyn MethodInterceptor<E>>>,
}

impl<E> InterceptorChain<E> {
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Append an interceptor inside the ones already present
    pub fn push(&mut self, interceptor: Arc<dyn MethodInterceptor<E>>) {
        self.interceptors.push(interceptor);
    }

    pub fn with(mut self, interceptor: Arc<dyn MethodInterceptor<E>>) -> Self {
        self.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Run `target` through every interceptor of the chain
    ///
    /// Fails with `NotInvoked` if the chain returned normally without the
    /// target ever producing a value.
    pub fn invoke<T, F>(&self, operation: &OperationDescriptor<E>, target: F) -> Result<T, E>
    where
        E: From<TxError>,
        F: FnOnce() -> Result<T, E>,
    {
        let mut output = None;
        {
            let slot = &mut output;
            let target: Proceed<'_, E> = Box::new(move || {
                *slot = Some(target()?);
                Ok(())
            });
            self.dispatch(0, operation, target)?;
        }

        output.ok_or_else(|| TxError::NotInvoked(operation.name().to_string()).into())
    }

    fn dispatch<'a>(
        &'a self,
        index: usize,
        operation: &'a OperationDescriptor<E>,
        target: Proceed<'a, E>,
    ) -> Result<(), E> {
        match self.interceptors.get(index) {
            None => target(),
            Some(interceptor) => {
                let next: Proceed<'a, E> =
                    Box::new(move || self.dispatch(index + 1, operation, target));
                interceptor.invoke(Invocation::new(operation, next))
            }
        }
    }
}

impl<E> Default for InterceptorChain<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for InterceptorChain<E> {
    fn clone(&self) -> Self {
        Self {
            interceptors: self.interceptors.clone(),
        }
    }
}

/// An operation bound to the chain built for its markers
///
/// Cheap to clone and safe to share between tasks.
pub struct GuardedOperation<E> {
    descriptor: Arc<OperationDescriptor<E>>,
    chain: InterceptorChain<E>,
}

impl<E> GuardedOperation<E> {
    pub fn new(descriptor: OperationDescriptor<E>, chain: InterceptorChain<E>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            chain,
        }
    }

    pub fn descriptor(&self) -> &OperationDescriptor<E> {
        &self.descriptor
    }

    pub fn chain(&self) -> &InterceptorChain<E> {
        &self.chain
    }

    /// Call `f` with every interceptor of the operation wrapped around it
    pub fn invoke<T, F>(&self, f: F) -> Result<T, E>
    where
        E: From<TxError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.chain.invoke(&self.descriptor, f)
    }
}

impl<E> Clone for GuardedOperation<E> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            chain: self.chain.clone(),
        }
    }
}
