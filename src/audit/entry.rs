//! Audit entry model and canonical content hashing.
//!
//! Every sensitive state change in the platform is recorded as one
//! `AuditEntry`. The entry's `content_hash` is a SHA-256 digest over a
//! canonical serialization of its fields, and `previous_hash` links it to
//! the entry appended immediately before it, forming a tamper-evident chain.

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AuditError;

/// The closed set of auditable actions.
///
/// Extensible only by adding new tags; existing tags are never repurposed.
/// The wire and storage form is the SCREAMING_SNAKE_CASE tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CaseSubmitted,
    CaseApproved,
    CaseRejected,
    CaseDeleted,
    Login,
    LoginFailed,
    Logout,
    BreakGlassAccess,
    DataDeletionRequest,
    DataAnonymized,
    RetentionCleanup,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaseSubmitted => "CASE_SUBMITTED",
            Self::CaseApproved => "CASE_APPROVED",
            Self::CaseRejected => "CASE_REJECTED",
            Self::CaseDeleted => "CASE_DELETED",
            Self::Login => "LOGIN",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::Logout => "LOGOUT",
            Self::BreakGlassAccess => "BREAK_GLASS_ACCESS",
            Self::DataDeletionRequest => "DATA_DELETION_REQUEST",
            Self::DataAnonymized => "DATA_ANONYMIZED",
            Self::RetentionCleanup => "RETENTION_CLEANUP",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASE_SUBMITTED" => Ok(Self::CaseSubmitted),
            "CASE_APPROVED" => Ok(Self::CaseApproved),
            "CASE_REJECTED" => Ok(Self::CaseRejected),
            "CASE_DELETED" => Ok(Self::CaseDeleted),
            "LOGIN" => Ok(Self::Login),
            "LOGIN_FAILED" => Ok(Self::LoginFailed),
            "LOGOUT" => Ok(Self::Logout),
            "BREAK_GLASS_ACCESS" => Ok(Self::BreakGlassAccess),
            "DATA_DELETION_REQUEST" => Ok(Self::DataDeletionRequest),
            "DATA_ANONYMIZED" => Ok(Self::DataAnonymized),
            "RETENTION_CLEANUP" => Ok(Self::RetentionCleanup),
            other => Err(AuditError::Serialization(format!(
                "unknown audit action: {}",
                other
            ))),
        }
    }
}

/// The business fields of an audit event, supplied by the caller.
///
/// `actor_id` and `actor_email` must come from an authenticated session.
/// State snapshots are opaque values; they are hashed and stored whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub actor_id: String,
    pub actor_email: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub previous_state: Option<serde_json::Value>,
    pub new_state: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

impl AuditEvent {
    pub fn new(
        action: AuditAction,
        actor_id: impl Into<String>,
        actor_email: impl Into<String>,
    ) -> Self {
        Self {
            action,
            actor_id: actor_id.into(),
            actor_email: actor_email.into(),
            resource_type: None,
            resource_id: None,
            previous_state: None,
            new_state: None,
            ip_address: None,
            user_agent: None,
            session_id: None,
        }
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_states(
        mut self,
        previous_state: Option<serde_json::Value>,
        new_state: Option<serde_json::Value>,
    ) -> Self {
        self.previous_state = previous_state;
        self.new_state = new_state;
        self
    }

    pub fn with_request_context(
        mut self,
        ip_address: impl Into<String>,
        user_agent: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        self.ip_address = Some(ip_address.into());
        self.user_agent = Some(user_agent.into());
        self.session_id = Some(session_id.into());
        self
    }

    /// Check the required fields. Called by the append engine before any
    /// storage access.
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.actor_id.trim().is_empty() {
            return Err(AuditError::InvalidEvent("actor_id must be non-empty".to_string()));
        }
        if self.actor_email.trim().is_empty() {
            return Err(AuditError::InvalidEvent(
                "actor_email must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One immutable record in the audit chain.
///
/// Created once by the append engine, read many times, never mutated and
/// never deleted. `previous_hash` is `None` only for the genesis entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: AuditAction,
    pub actor_id: String,
    pub actor_email: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub previous_state: Option<serde_json::Value>,
    pub new_state: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub content_hash: String,
    pub previous_hash: Option<String>,
}

impl AuditEntry {
    /// Canonical string representation used as the hash input.
    ///
    /// Fixed field order, `key:value` pairs joined by `|`. Absent optional
    /// fields contribute the literal `null`; a state snapshot of JSON `null`
    /// serializes to the same token, so the two hash identically. Object
    /// keys inside state snapshots are sorted by serde_json's default map,
    /// and `created_at` is rendered at microsecond precision, so the string
    /// is reproducible across processes. `content_hash` and `previous_hash`
    /// are deliberately not inputs.
    pub fn canonical_string(&self) -> String {
        canonical_string(
            self.action,
            &self.actor_id,
            &self.actor_email,
            self.resource_type.as_deref(),
            self.resource_id.as_deref(),
            self.previous_state.as_ref(),
            self.new_state.as_ref(),
            self.ip_address.as_deref(),
            self.user_agent.as_deref(),
            self.session_id.as_deref(),
            self.created_at,
        )
    }

    /// Recompute this entry's content hash from its stored fields.
    pub fn compute_hash(&self) -> String {
        sha256_hex(&self.canonical_string())
    }

    /// Whether the stored content hash matches the recomputed one.
    pub fn verify_hash(&self) -> bool {
        self.content_hash == self.compute_hash()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} by {} ({})",
            self.action,
            self.actor_id,
            self.resource_id.as_deref().unwrap_or("-")
        )
    }
}

/// Compute the content hash for an event about to be appended.
///
/// Same canonical form as `AuditEntry::canonical_string`, so a persisted
/// entry always re-verifies against the digest produced here.
pub fn hash_event(event: &AuditEvent, created_at: DateTime<Utc>) -> String {
    sha256_hex(&canonical_string(
        event.action,
        &event.actor_id,
        &event.actor_email,
        event.resource_type.as_deref(),
        event.resource_id.as_deref(),
        event.previous_state.as_ref(),
        event.new_state.as_ref(),
        event.ip_address.as_deref(),
        event.user_agent.as_deref(),
        event.session_id.as_deref(),
        created_at,
    ))
}

/// Truncate a timestamp to microsecond precision.
///
/// The canonical form and the stored RFC 3339 text both carry microseconds,
/// so the append engine drops sub-microsecond digits up front to keep the
/// in-memory entry identical to what a later read returns.
pub fn truncate_to_micros(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_nanosecond((t.nanosecond() / 1000) * 1000).unwrap_or(t)
}

/// RFC 3339 rendering used for hashing and for the SQLite `created_at`
/// column. Fixed precision and `Z` suffix keep text comparisons
/// chronological.
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[allow(clippy::too_many_arguments)]
fn canonical_string(
    action: AuditAction,
    actor_id: &str,
    actor_email: &str,
    resource_type: Option<&str>,
    resource_id: Option<&str>,
    previous_state: Option<&serde_json::Value>,
    new_state: Option<&serde_json::Value>,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
    session_id: Option<&str>,
    created_at: DateTime<Utc>,
) -> String {
    format!(
        "action:{}|actor_id:{}|actor_email:{}|resource_type:{}|resource_id:{}|previous_state:{}|new_state:{}|ip_address:{}|user_agent:{}|session_id:{}|created_at:{}",
        action.as_str(),
        actor_id,
        actor_email,
        null_or(resource_type),
        null_or(resource_id),
        null_or_json(previous_state),
        null_or_json(new_state),
        null_or(ip_address),
        null_or(user_agent),
        null_or(session_id),
        format_timestamp(created_at),
    )
}

fn null_or(value: Option<&str>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "null".to_string(),
    }
}

fn null_or_json(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "null".to_string(),
    }
}

fn sha256_hex(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
