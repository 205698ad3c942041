// ============================================================================
// Method Interception
// ============================================================================
//
// Operations are described by an `OperationDescriptor` carrying marker names.
// The `InterceptorRegistry` maps each marker to a `MethodInterceptor` and
// assembles the chain that wraps every call of the operation:
//
//   GuardedOperation::invoke(f)
//     -> interceptor for markers[0]
//       -> interceptor for markers[1]
//         -> ... -> f()
//
// ============================================================================

pub mod chain;
pub mod operation;
pub mod policy;
pub mod registry;
pub mod traced;
pub mod transactional;

pub use chain::{GuardedOperation, InterceptorChain};
pub use operation::OperationDescriptor;
pub use policy::RollbackPolicy;
pub use registry::InterceptorRegistry;
pub use traced::TracingInterceptor;
pub use transactional::TransactionalInterceptor;

/// Marker handled by [`TransactionalInterceptor`]
pub const TRANSACTIONAL: &str = "transactional";

/// Marker handled by [`TracingInterceptor`]
pub const TRACED: &str = "traced";

/// Continuation running the rest of the chain and finally the operation
pub type Proceed<'a, E> = Box<dyn FnOnce() -> Result<(), E> + 'a>;

/// One call travelling through an interceptor chain
pub struct Invocation<'a, E> {
    operation: &'a OperationDescriptor<E>,
    proceed: Proceed<'a, E>,
}

impl<'a, E> Invocation<'a, E> {
    pub fn new(operation: &'a OperationDescriptor<E>, proceed: Proceed<'a, E>) -> Self {
        Self { operation, proceed }
    }

    pub fn operation(&self) -> &'a OperationDescriptor<E> {
        self.operation
    }

    /// Run the rest of the chain
    pub fn proceed(self) -> Result<(), E> {
        (self.proceed)()
    }

    pub fn into_parts(self) -> (&'a OperationDescriptor<E>, Proceed<'a, E>) {
        (self.operation, self.proceed)
    }
}

/// Cross-cutting behaviour wrapped around guarded operations
///
/// An implementation must call [`Invocation::proceed`] at most once and is
/// expected to return its failure unless it deliberately handles it.
pub trait MethodInterceptor<E>: Send + Sync {
    fn name(&self) -> &'static str;

    fn invoke(&self, invocation: Invocation<'_, E>) -> Result<(), E>;
}
