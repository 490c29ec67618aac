//! Read-only retrieval of audit entries.
//!
//! `AuditQuery` is the one predicate the storage layer understands;
//! `AuditReader` wraps it with the lookups reporting code actually wants.
//! No verification happens here; callers combine these reads with
//! `audit::verify` when they need an integrity check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::entry::{AuditAction, AuditEntry};
use crate::error::AuditError;
use crate::storage::AuditStore;

pub const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Filter, pagination, and ordering for audit log reads.
///
/// Reporting reads default to newest-first; the chain verifier needs
/// `Ascending` explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<String>,
    pub resource_id: Option<String>,
    pub resource_type: Option<String>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
    pub order: SortOrder,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            actor_id: None,
            resource_id: None,
            resource_type: None,
            action: None,
            from: None,
            to: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            order: SortOrder::Descending,
        }
    }
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn resource_typed(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn until(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    pub fn ascending(mut self) -> Self {
        self.order = SortOrder::Ascending;
        self
    }
}

/// Read-only façade over an audit store.
#[derive(Debug, Clone)]
pub struct AuditReader<S> {
    store: S,
}

impl<S: AuditStore> AuditReader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All entries caused by one actor, newest first.
    pub async fn by_actor(
        &self,
        actor_id: &str,
        opts: AuditQuery,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        self.store.find(&opts.actor(actor_id)).await
    }

    /// All entries touching one resource, newest first. Pass a typed query
    /// (`AuditQuery::new().resource_typed(..)`-style `opts`) to also pin the
    /// resource type.
    pub async fn by_resource(
        &self,
        resource_id: &str,
        opts: AuditQuery,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        self.store.find(&opts.resource(resource_id)).await
    }

    /// All entries of one action type, newest first.
    pub async fn by_action(
        &self,
        action: AuditAction,
        opts: AuditQuery,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        self.store.find(&opts.action(action)).await
    }

    /// Arbitrary predicate search.
    pub async fn search(&self, query: AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        self.store.find(&query).await
    }

    /// An ordered, contiguous window of the chain in ascending append order,
    /// the shape `audit::verify::verify_chain` expects.
    pub async fn chain_window(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        let query = AuditQuery {
            from,
            to,
            limit,
            order: SortOrder::Ascending,
            ..AuditQuery::default()
        };
        self.store.find(&query).await
    }
}
