//! Concurrent append behavior: many writers, one unbroken chain.

use std::sync::Arc;

use casetrail_audit::{
    verify_chain, AuditAction, AuditEvent, AuditLogger, AuditReader, AuditStore,
    MemoryAuditStore, SqliteAuditStore,
};

mod common;
use common::*;

fn actor_login(i: usize) -> AuditEvent {
    AuditEvent::new(
        AuditAction::Login,
        format!("u{}", i),
        format!("u{}@example.com", i),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_100_concurrent_appends_form_single_chain() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("audit.db").display());
    let store = SqliteAuditStore::connect(&url).await.unwrap();
    store.run_migrations().await.unwrap();

    let logger = Arc::new(AuditLogger::new(store.clone()));

    let mut handles = Vec::new();
    for i in 0..100 {
        let logger = Arc::clone(&logger);
        handles.push(tokio::spawn(async move { logger.append(actor_login(i)).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.count().await.unwrap(), 100);

    let reader = AuditReader::new(store);
    let entries = reader.chain_window(None, None, 1000).await.unwrap();
    assert_eq!(entries.len(), 100);

    let report = verify_chain(&entries);
    assert!(report.is_valid(), "unexpected anomalies: {:?}", report.anomalies);
    assert_eq!(report.valid_entries, 100);

    // Exactly one genesis and a strictly linear linkage: no forks.
    assert!(entries[0].previous_hash.is_none());
    for pair in entries.windows(2) {
        assert_eq!(
            pair[1].previous_hash.as_deref(),
            Some(pair[0].content_hash.as_str())
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_appends_against_memory_store() {
    let store = MemoryAuditStore::new();
    let logger = Arc::new(AuditLogger::new(store.clone()));

    let mut handles = Vec::new();
    for i in 0..100 {
        let logger = Arc::clone(&logger);
        handles.push(tokio::spawn(async move { logger.append(actor_login(i)).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.len(), 100);
    let reader = AuditReader::new(store);
    let entries = reader.chain_window(None, None, 1000).await.unwrap();
    assert!(verify_chain(&entries).is_valid());
}

/// A writer that bypasses the engine and claims an already-claimed
/// predecessor hits the storage serialization point.
#[tokio::test]
async fn test_bypassing_writer_cannot_fork_the_chain() {
    let store = setup_store().await;
    let logger = AuditLogger::new(store.clone());

    let first = logger.append(approval_event("u1", "c1")).await.unwrap();
    let second = logger.append(login_event("u2")).await.unwrap();

    // Handcraft a third entry claiming `first` as predecessor even though
    // `second` already does.
    let mut fork = second.clone();
    fork.id = uuid::Uuid::new_v4();
    fork.previous_hash = Some(first.content_hash.clone());

    let result = store.insert(&fork).await;
    assert!(matches!(
        result,
        Err(casetrail_audit::AuditError::ChainConflict)
    ));
    assert_eq!(store.count().await.unwrap(), 2);
}
