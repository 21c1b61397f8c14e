use std::sync::Arc;
use std::time::Duration;

use graphtx_log::InMemoryLog;
use graphtx_model::SlaveContext;
use graphtx_store::{MemoryIdAllocator, MemoryStore, NoopCacheInvalidator};

use crate::config::CoordinatorConfig;
use crate::coordinator::MasterCoordinator;
use crate::lock::{InMemoryLockManager, LockKind};
use crate::response::ResponseStatus;

fn spawn_coordinator(config: CoordinatorConfig) -> Arc<MasterCoordinator> {
    MasterCoordinator::spawn(
        Arc::new(MemoryStore::default()),
        Arc::new(NoopCacheInvalidator),
        Arc::new(InMemoryLog::default()),
        Arc::new(InMemoryLockManager::default()),
        Arc::new(MemoryIdAllocator::default()),
        config,
    )
}

#[test]
fn create_relationship_type_then_commit_advances_last_committed_tx() {
    let coordinator = spawn_coordinator(CoordinatorConfig::default());
    let ctx = SlaveContext::new(1, 1, 1);

    let created = coordinator.create_relationship_type(&ctx, "KNOWS".to_string());
    assert_eq!(created.status, ResponseStatus::Ok);

    let committed = coordinator.commit_single_resource_transaction(&ctx);
    let (tx_id, up_to) = committed.result.expect("commit succeeded");

    assert_eq!(up_to, tx_id - 1);
    assert!(coordinator.get_master_id_for_committed_tx(tx_id).result.is_some());
    assert!(coordinator.active_tx_id(&ctx).is_none());
    coordinator.shutdown();
}

/// Invariant 8: a second slave context serviced in between two operations
/// on the first must not disturb the first context's transaction.
#[test]
fn suspend_resume_round_trip_preserves_the_other_context() {
    let coordinator = spawn_coordinator(CoordinatorConfig::default());
    let ctx_a = SlaveContext::new(1, 1, 1);
    let ctx_b = SlaveContext::new(2, 1, 1);

    coordinator.create_relationship_type(&ctx_a, "KNOWS".to_string());
    let tx_id_a_before = coordinator.active_tx_id(&ctx_a).unwrap();

    coordinator.create_relationship_type(&ctx_b, "LIKES".to_string());

    let tx_id_a_after = coordinator.active_tx_id(&ctx_a).unwrap();
    assert_eq!(tx_id_a_before, tx_id_a_after, "servicing ctx_b must not touch ctx_a's row");
    assert_ne!(tx_id_a_before, coordinator.active_tx_id(&ctx_b).unwrap());
    coordinator.shutdown();
}

/// S6 / invariant 7: an idle transaction is rolled back and dropped from
/// `txTable` once it crosses the idle threshold, and the next request for
/// the same slave context starts a fresh one.
#[test]
fn reaper_drops_idle_context_and_next_request_starts_fresh() {
    let coordinator = spawn_coordinator(CoordinatorConfig {
        reaper_period: Duration::from_millis(10),
        idle_threshold: Duration::from_millis(20),
        grab_size: 1000,
    });
    let ctx = SlaveContext::new(7, 1, 1);

    coordinator.create_relationship_type(&ctx, "KNOWS".to_string());
    let first_tx_id = coordinator.active_tx_id(&ctx).expect("row present right after the request");

    let deadline = std::time::Instant::now() + Duration::from_millis(500);
    while coordinator.active_tx_id(&ctx).is_some() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(coordinator.active_tx_id(&ctx).is_none(), "reaper should have dropped the idle row");

    coordinator.create_relationship_type(&ctx, "LIKES".to_string());
    let second_tx_id = coordinator.active_tx_id(&ctx).expect("fresh row for the same context");
    assert_ne!(first_tx_id, second_tx_id);
    coordinator.shutdown();
}

/// spec.md §4.4/§7: an illegal/unrecognized entity-kind tag must resolve to
/// `NOT_LOCKED` rather than panicking or silently mapping onto a real kind.
#[test]
fn unrecognized_entity_kind_tag_resolves_to_not_locked() {
    let coordinator = spawn_coordinator(CoordinatorConfig::default());
    let ctx = SlaveContext::new(1, 1, 1);

    let response = coordinator.acquire_lock_by_raw_kind(&ctx, LockKind::Read, 99, 1);
    assert_eq!(response.status, ResponseStatus::NotLocked);
    assert!(response.result.is_none());
    coordinator.shutdown();
}

/// Regression test for the concurrency bug this rewrite fixes: holding the
/// table mutex across a request body would make two unrelated slave
/// contexts unable to make progress at the same time. ctx_a's request is
/// held open by a channel rendezvous; ctx_b's request must complete without
/// waiting for it.
#[test]
fn independent_slave_contexts_run_concurrently() {
    let coordinator = spawn_coordinator(CoordinatorConfig::default());
    let ctx_a = SlaveContext::new(1, 1, 1);
    let ctx_b = SlaveContext::new(2, 1, 1);

    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();

    let coordinator_a = Arc::clone(&coordinator);
    let handle = std::thread::spawn(move || {
        coordinator_a.with_transaction(&ctx_a, |_tx, _owner| {
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        });
    });

    started_rx.recv_timeout(Duration::from_secs(2)).expect("ctx_a's request should start promptly");

    // If the table mutex were held across ctx_a's request body, this would
    // block until ctx_a's request released it; it must complete immediately.
    let response = coordinator.acquire_node_read_lock(&ctx_b, 1);
    assert_eq!(response.status, ResponseStatus::Ok);

    release_tx.send(()).unwrap();
    handle.join().unwrap();
    coordinator.shutdown();
}
