use casetrail_audit::{AuditAction, AuditEvent, SqliteAuditStore};
use serde_json::json;

/// Set up a single-connection in-memory SQLite store with the audit schema
/// applied.
pub async fn setup_store() -> SqliteAuditStore {
    let store = SqliteAuditStore::connect_in_memory()
        .await
        .expect("failed to create test store");
    store
        .run_migrations()
        .await
        .expect("failed to apply audit schema");
    store
}

/// A case approval with before/after snapshots and request metadata.
pub fn approval_event(actor: &str, case_id: &str) -> AuditEvent {
    AuditEvent::new(
        AuditAction::CaseApproved,
        actor,
        format!("{}@example.com", actor),
    )
    .with_resource("case", case_id)
    .with_states(
        Some(json!({"status": "SUBMITTED"})),
        Some(json!({"status": "APPROVED"})),
    )
    .with_request_context("10.0.0.1", "Mozilla/5.0", "sess-1")
}

pub fn rejection_event(actor: &str, case_id: &str) -> AuditEvent {
    AuditEvent::new(
        AuditAction::CaseRejected,
        actor,
        format!("{}@example.com", actor),
    )
    .with_resource("case", case_id)
    .with_states(
        Some(json!({"status": "SUBMITTED"})),
        Some(json!({"status": "REJECTED"})),
    )
}

pub fn login_event(actor: &str) -> AuditEvent {
    AuditEvent::new(AuditAction::Login, actor, format!("{}@example.com", actor))
}
