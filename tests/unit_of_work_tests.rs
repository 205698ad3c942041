/// Unit-of-work lifecycle tests
///
/// Session binding per task, start/stop/restart of the persistence service
/// and concurrent use from many threads.
/// Run with: cargo test --test unit_of_work_tests

use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use txscope::interceptor::TRANSACTIONAL;
use txscope::memory::{MemoryProvider, MemoryStore};
use txscope::prelude::*;

fn started_manager(unit: &str) -> Arc<UnitOfWorkManager<MemoryProvider>> {
    let manager = Arc::new(UnitOfWorkManager::new(
        MemoryProvider::new(),
        PersistenceConfig::new(unit),
    ));
    manager.start().unwrap();
    manager
}

#[test]
fn test_begin_twice_yields_one_session() {
    let manager = started_manager("lifecycle");

    manager.begin().unwrap();
    let first = manager.session().unwrap();
    manager.begin().unwrap();
    let second = manager.session().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(manager.provider().store().stats().sessions_opened, 1);
    assert_eq!(manager.bound_sessions(), 1);

    manager.end().unwrap();
    manager.end().unwrap();

    assert!(!manager.has_begun());
    assert!(!first.is_open());
    assert_eq!(manager.provider().store().stats().sessions_closed, 1);
}

#[test]
fn test_restart_yields_usable_factory() {
    let manager = started_manager("restart");

    manager.stop().unwrap();
    assert!(!manager.is_started());
    manager.start().unwrap();
    assert!(manager.is_started());

    manager.begin().unwrap();
    assert!(manager.session().unwrap().is_open());
    manager.end().unwrap();
}

#[test]
fn test_stop_after_factory_closed_elsewhere() {
    let manager = started_manager("closed");

    manager.factory().unwrap().close().unwrap();

    let err = manager.stop().unwrap_err();
    assert!(matches!(err, TxError::InvalidState(_)));
    assert!(manager.is_started());
}

#[test]
fn test_committed_data_survives_restart() {
    let store = Arc::new(MemoryStore::new());
    let manager = UnitOfWorkManager::new(
        MemoryProvider::with_store(Arc::clone(&store)),
        PersistenceConfig::new("durable"),
    );
    let tx = TransactionalInterceptor::new(&manager);

    manager.start().unwrap();
    tx.run(&RollbackPolicy::new(), || {
        manager.session()?.insert("events", json!({ "kind": "created" }))
    })
    .unwrap();
    manager.stop().unwrap();

    manager.start().unwrap();
    let rows = manager
        .within_session(|session| session.rows("events"))
        .unwrap();
    assert_eq!(rows, vec![json!({ "kind": "created" })]);
    assert_eq!(store.stats().open_sessions(), 0);
}

#[test]
fn test_manager_from_json_config() {
    let config = PersistenceConfig::from_json(
        r#"{ "unit_name": "json-unit", "properties": { "memory.label": "test" } }"#,
    )
    .unwrap();
    let manager = UnitOfWorkManager::new(MemoryProvider::new(), config);

    manager.start().unwrap();
    let factory = manager.factory().unwrap();
    assert_eq!(factory.config().unit_name, "json-unit");
    assert_eq!(factory.config().get("memory.label"), Some(&json!("test")));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_threads_get_distinct_sessions() {
    let manager = started_manager("threads");
    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                manager.begin().unwrap();
                let id = manager.session().unwrap().id();

                // Every thread holds its session at the same time here.
                barrier.wait();
                assert_eq!(manager.bound_sessions(), num_threads);
                assert_eq!(manager.session().unwrap().id(), id);
                barrier.wait();

                manager.end().unwrap();
                id
            })
        })
        .collect();

    let ids: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(ids.len(), num_threads);
    assert_eq!(manager.bound_sessions(), 0);
    assert_eq!(manager.provider().store().stats().open_sessions(), 0);
}

#[test]
fn test_end_on_one_thread_leaves_others_bound() {
    let manager = started_manager("isolation");
    manager.begin().unwrap();

    let other = Arc::clone(&manager);
    thread::spawn(move || {
        assert!(!other.has_begun());
        other.begin().unwrap();
        other.end().unwrap();
    })
    .join()
    .unwrap();

    assert!(manager.has_begun());
    assert!(manager.session().unwrap().is_open());
    manager.end().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_guarded_operations() {
    let manager = started_manager("tokio");
    let registry = InterceptorRegistry::<TxError>::new().with(
        TRANSACTIONAL,
        Arc::new(TransactionalInterceptor::new(Arc::clone(&manager))),
    );
    let op = registry
        .guard(OperationDescriptor::transactional(
            "record",
            RollbackPolicy::new().rollback_when("odd", |e: &TxError| {
                matches!(e, TxError::InvalidState(msg) if msg == "odd")
            }),
        ))
        .unwrap();

    let num_tasks = 20;
    let mut handles = vec![];

    for task_id in 0..num_tasks {
        let manager = Arc::clone(&manager);
        let op = op.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            op.invoke(|| {
                manager.session()?.insert("log", json!({ "task": task_id }))?;
                if task_id % 2 == 1 {
                    return Err(TxError::InvalidState("odd".into()));
                }
                Ok(task_id)
            })
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    let store = manager.provider().store();
    assert_eq!(succeeded, num_tasks / 2);
    assert_eq!(store.count("log").unwrap(), num_tasks / 2);
    assert_eq!(store.stats().commits, num_tasks / 2);
    assert_eq!(store.stats().rollbacks, num_tasks / 2);
    assert_eq!(store.stats().open_sessions(), 0);
    assert_eq!(manager.bound_sessions(), 0);
}
