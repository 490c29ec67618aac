//! Storage boundary for the audit log.
//!
//! The hashing and verification logic never sees a persistence type; it
//! talks to this trait. Implementations must provide durable, append-only
//! row storage and a serialization point that rejects two entries claiming
//! the same predecessor (see `AuditStore::insert`).

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use uuid::Uuid;

use crate::audit::entry::AuditEntry;
use crate::audit::query::AuditQuery;
use crate::error::AuditError;

pub use memory::MemoryAuditStore;
pub use sqlite::SqliteAuditStore;

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist one complete entry as a single atomic write.
    ///
    /// Must fail with `AuditError::ChainConflict` when another entry already
    /// claims the same `previous_hash` (including the genesis slot), so a
    /// racing append cannot silently fork the chain. Entries are never
    /// updated or deleted through this interface.
    async fn insert(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// The most recently appended entry, or `None` for an empty log.
    async fn latest(&self) -> Result<Option<AuditEntry>, AuditError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditEntry>, AuditError>;

    /// Predicate search with pagination and ordering.
    async fn find(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError>;
}
