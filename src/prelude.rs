//! Common imports for application code.
//!
//! Brings the manager, the interceptor surface and the provider traits into
//! scope. Provider implementations live in their own modules.

pub use crate::{
    GuardedOperation, InterceptorRegistry, OperationDescriptor, PersistenceConfig,
    RollbackPolicy, Session, SessionFactory, TracingInterceptor, Transaction,
    TransactionalInterceptor, TxError, UnitOfWork, UnitOfWorkManager,
};
