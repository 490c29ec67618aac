//! Appending entries to the audit chain.
//!
//! `AuditLogger` is the single write path: it validates the event, reads
//! the current tail hash through `ChainLinker`, computes the content hash,
//! and persists the complete entry as one atomic insert. The read-tail /
//! insert critical section runs under an async mutex so appends within one
//! process never race each other; a conflict surfaced by the store (an
//! out-of-process writer got there first) is retried with a freshly read
//! tail up to a bounded count.

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::audit::entry::{hash_event, truncate_to_micros, AuditEntry, AuditEvent};
use crate::error::AuditError;
use crate::storage::AuditStore;

const DEFAULT_MAX_RETRIES: u32 = 5;

/// Resolves the hash the next entry must link to.
pub struct ChainLinker<'a, S> {
    store: &'a S,
}

impl<'a, S: AuditStore> ChainLinker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The `content_hash` of the most recently appended entry, or `None`
    /// when the log is empty (the genesis marker).
    ///
    /// A storage failure propagates as `StorageUnavailable`; it is never
    /// collapsed into "no previous entry", which would silently restart the
    /// chain.
    pub async fn tail_hash(&self) -> Result<Option<String>, AuditError> {
        Ok(self.store.latest().await?.map(|e| e.content_hash))
    }
}

/// The append engine. One instance per deployment writer; share it behind
/// an `Arc` across request handlers.
pub struct AuditLogger<S> {
    store: S,
    max_retries: u32,
    append_lock: Mutex<()>,
}

impl<S: AuditStore> AuditLogger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_retries: DEFAULT_MAX_RETRIES,
            append_lock: Mutex::new(()),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record one audit event as an immutable chain entry.
    ///
    /// Returns the persisted entry. On failure nothing has been written:
    /// `InvalidEvent` for missing required fields, `StorageUnavailable` when
    /// the store cannot be read or written, `ChainConflict` when retries
    /// against a racing external writer are exhausted. The durable write is
    /// never rolled back; corrections are new entries.
    pub async fn append(&self, event: AuditEvent) -> Result<AuditEntry, AuditError> {
        event.validate()?;

        let mut attempt: u32 = 0;
        loop {
            let _serialized = self.append_lock.lock().await;

            let previous_hash = ChainLinker::new(&self.store).tail_hash().await?;
            let created_at = truncate_to_micros(Utc::now());
            let content_hash = hash_event(&event, created_at);

            let entry = AuditEntry {
                id: Uuid::new_v4(),
                action: event.action,
                actor_id: event.actor_id.clone(),
                actor_email: event.actor_email.clone(),
                resource_type: event.resource_type.clone(),
                resource_id: event.resource_id.clone(),
                previous_state: event.previous_state.clone(),
                new_state: event.new_state.clone(),
                ip_address: event.ip_address.clone(),
                user_agent: event.user_agent.clone(),
                session_id: event.session_id.clone(),
                created_at,
                content_hash,
                previous_hash,
            };

            match self.store.insert(&entry).await {
                Ok(()) => {
                    debug!(entry = %entry.summary(), "audit entry appended");
                    return Ok(entry);
                }
                Err(AuditError::ChainConflict) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, "append lost the chain tail race, retrying with fresh tail");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
