// ============================================================================
// txscope Library
// ============================================================================

//! Declarative transaction demarcation for synchronous Rust code.
//!
//! A [`UnitOfWorkManager`] keeps one persistence session per logical task
//! (thread). Operations tagged with the [`interceptor::TRANSACTIONAL`] marker
//! are run by the [`TransactionalInterceptor`], which begins a transaction,
//! joins one already in progress, and commits or rolls back according to the
//! operation's [`RollbackPolicy`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use txscope::interceptor::TRANSACTIONAL;
//! use txscope::memory::MemoryProvider;
//! use txscope::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let manager = Arc::new(UnitOfWorkManager::new(
//!     MemoryProvider::new(),
//!     PersistenceConfig::new("shop"),
//! ));
//! manager.start()?;
//!
//! let registry = InterceptorRegistry::<anyhow::Error>::new().with(
//!     TRANSACTIONAL,
//!     Arc::new(TransactionalInterceptor::new(Arc::clone(&manager))),
//! );
//!
//! let place_order = registry.guard(
//!     OperationDescriptor::transactional("place_order", RollbackPolicy::new().rollback_always()),
//! )?;
//!
//! place_order.invoke(|| {
//!     manager.session()?.insert("orders", json!({ "sku": "A-1" }))?;
//!     Ok(())
//! })?;
//!
//! assert_eq!(manager.provider().store().count("orders")?, 1);
//! assert!(!manager.has_begun());
//! manager.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod interceptor;
pub mod memory;
pub mod prelude;
pub mod provider;
pub mod unit_of_work;

// Re-export main types for convenience
pub use config::PersistenceConfig;
pub use crate::core::{Result, TaskId, TaskLocal, TxError};
pub use interceptor::{
    GuardedOperation, InterceptorChain, InterceptorRegistry, Invocation, MethodInterceptor,
    OperationDescriptor, RollbackPolicy, TracingInterceptor, TransactionalInterceptor,
};
pub use provider::{PersistenceProvider, Session, SessionFactory, SessionOf, Transaction};
pub use unit_of_work::{UnitOfWork, UnitOfWorkManager};
