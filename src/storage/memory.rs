//! In-memory audit store.
//!
//! Backs unit tests and embedded/demo use. Entries live in a `Vec` in
//! append order behind a `Mutex`; the insert path enforces the same
//! no-fork invariant the SQLite unique index provides.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::audit::entry::AuditEntry;
use crate::audit::query::{AuditQuery, SortOrder};
use crate::error::AuditError;
use crate::storage::AuditStore;

#[derive(Debug, Clone, Default)]
pub struct MemoryAuditStore {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<AuditEntry>>, AuditError> {
        self.entries
            .lock()
            .map_err(|e| AuditError::StorageUnavailable(format!("store lock poisoned: {}", e)))
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn insert(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut entries = self.lock()?;
        // The claimed predecessor must be the current tail; anything else is
        // a concurrent append that lost the race.
        let tail = entries.last().map(|e| e.content_hash.clone());
        if entry.previous_hash != tail {
            return Err(AuditError::ChainConflict);
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn latest(&self) -> Result<Option<AuditEntry>, AuditError> {
        Ok(self.lock()?.last().cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditEntry>, AuditError> {
        Ok(self.lock()?.iter().find(|e| e.id == id).cloned())
    }

    async fn find(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.lock()?;
        // Vec order is append order, which is ascending chain order.
        let mut matches: Vec<AuditEntry> = entries
            .iter()
            .filter(|e| {
                query.actor_id.as_ref().map_or(true, |a| &e.actor_id == a)
                    && query
                        .resource_id
                        .as_ref()
                        .map_or(true, |r| e.resource_id.as_ref() == Some(r))
                    && query
                        .resource_type
                        .as_ref()
                        .map_or(true, |t| e.resource_type.as_ref() == Some(t))
                    && query.action.map_or(true, |a| e.action == a)
                    && query.from.map_or(true, |from| e.created_at >= from)
                    && query.to.map_or(true, |to| e.created_at <= to)
            })
            .cloned()
            .collect();

        if query.order == SortOrder::Descending {
            matches.reverse();
        }

        Ok(matches
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }
}
