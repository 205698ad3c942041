use super::{Invocation, MethodInterceptor, TRACED};
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info_span};

/// Interceptor for the [`TRACED`] marker
///
/// Opens an `info` span named after the operation and records its outcome
/// and duration.
#[derive(Debug, Default)]
pub struct TracingInterceptor {
    invocations: AtomicU64,
    failures: AtomicU64,
}

impl TracingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl<E: Display> MethodInterceptor<E> for TracingInterceptor {
    fn name(&self) -> &'static str {
        TRACED
    }

    fn invoke(&self, invocation: Invocation<'_, E>) -> Result<(), E> {
        let span = info_span!("operation", name = %invocation.operation().name());
        let _entered = span.enter();

        self.invocations.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let outcome = invocation.proceed();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &outcome {
            Ok(()) => debug!(elapsed_ms, "operation completed"),
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                debug!(elapsed_ms, error = %err, "operation failed");
            }
        }
        outcome
    }
}
