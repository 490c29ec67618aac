//! Query façade behavior: filters, pagination, ordering, time ranges.

use std::time::Duration;

use casetrail_audit::{AuditAction, AuditQuery, AuditLogger, AuditReader};

mod common;
use common::*;

#[tokio::test]
async fn test_by_actor_descending() {
    let store = setup_store().await;
    let logger = AuditLogger::new(store.clone());

    let a1 = logger.append(approval_event("u1", "c1")).await.unwrap();
    logger.append(approval_event("u2", "c2")).await.unwrap();
    let a2 = logger.append(login_event("u1")).await.unwrap();

    let reader = AuditReader::new(store);
    let mine = reader.by_actor("u1", AuditQuery::new()).await.unwrap();

    assert_eq!(mine.len(), 2);
    // Newest first.
    assert_eq!(mine[0].id, a2.id);
    assert_eq!(mine[1].id, a1.id);
}

#[tokio::test]
async fn test_by_resource_with_type() {
    let store = setup_store().await;
    let logger = AuditLogger::new(store.clone());

    let on_case = logger.append(approval_event("u1", "c1")).await.unwrap();
    logger.append(rejection_event("u1", "c2")).await.unwrap();
    logger.append(login_event("u1")).await.unwrap();

    let reader = AuditReader::new(store);

    let entries = reader.by_resource("c1", AuditQuery::new()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, on_case.id);

    // A resource-type filter that doesn't match excludes the entry.
    let entries = reader
        .by_resource("c1", AuditQuery::new().resource_typed("user", "c1"))
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_by_action() {
    let store = setup_store().await;
    let logger = AuditLogger::new(store.clone());

    logger.append(approval_event("u1", "c1")).await.unwrap();
    logger.append(login_event("u2")).await.unwrap();
    logger.append(approval_event("u3", "c3")).await.unwrap();

    let reader = AuditReader::new(store);
    let approvals = reader
        .by_action(AuditAction::CaseApproved, AuditQuery::new())
        .await
        .unwrap();

    assert_eq!(approvals.len(), 2);
    assert!(approvals.iter().all(|e| e.action == AuditAction::CaseApproved));
}

#[tokio::test]
async fn test_pagination_pages_do_not_overlap() {
    let store = setup_store().await;
    let logger = AuditLogger::new(store.clone());

    for i in 0..5 {
        logger.append(login_event(&format!("u{}", i))).await.unwrap();
    }

    let reader = AuditReader::new(store);
    let page1 = reader
        .search(AuditQuery::new().ascending().page(2, 0))
        .await
        .unwrap();
    let page2 = reader
        .search(AuditQuery::new().ascending().page(2, 2))
        .await
        .unwrap();
    let page3 = reader
        .search(AuditQuery::new().ascending().page(2, 4))
        .await
        .unwrap();

    assert_eq!(page1.len(), 2);
    assert_eq!(page2.len(), 2);
    assert_eq!(page3.len(), 1);

    let mut seen: Vec<_> = page1.iter().chain(&page2).chain(&page3).map(|e| e.id).collect();
    let total = seen.len();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), total, "pages returned overlapping entries");
}

#[tokio::test]
async fn test_time_range_filter() {
    let store = setup_store().await;
    let logger = AuditLogger::new(store.clone());

    logger.append(login_event("early")).await.unwrap();
    logger.append(login_event("early-too")).await.unwrap();

    // Ensure strictly distinct timestamps around the boundary.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let boundary = logger.append(login_event("late")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let after = logger.append(login_event("later")).await.unwrap();

    let reader = AuditReader::new(store);
    let recent = reader
        .search(AuditQuery::new().since(boundary.created_at).ascending())
        .await
        .unwrap();

    assert_eq!(
        recent.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![boundary.id, after.id]
    );

    let window = reader
        .search(
            AuditQuery::new()
                .between(boundary.created_at, boundary.created_at)
                .ascending(),
        )
        .await
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, boundary.id);
}

#[tokio::test]
async fn test_chain_window_is_ascending() {
    let store = setup_store().await;
    let logger = AuditLogger::new(store.clone());

    let mut appended = Vec::new();
    for i in 0..4 {
        appended.push(logger.append(login_event(&format!("u{}", i))).await.unwrap());
    }

    let reader = AuditReader::new(store);
    let window = reader.chain_window(None, None, 100).await.unwrap();

    assert_eq!(
        window.iter().map(|e| e.id).collect::<Vec<_>>(),
        appended.iter().map(|e| e.id).collect::<Vec<_>>()
    );
}
