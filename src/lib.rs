//! # casetrail-audit
//!
//! Immutable, hash-chained audit logging for the CaseTrail platform.
//!
//! Appended entries form a singly linked list by SHA-256 content hash:
//! each entry stores a digest of its own canonical serialization plus the
//! digest of the entry appended before it. Editing, deleting, or
//! reordering any persisted entry is detectable by an on-demand
//! verification pass: an attacker would have to rewrite every subsequent
//! entry to hide a single change.
//!
//! ```rust,ignore
//! use casetrail_audit::{AuditAction, AuditEvent, AuditLogger, SqliteAuditStore};
//!
//! let store = SqliteAuditStore::connect("sqlite://audit.db").await?;
//! store.run_migrations().await?;
//!
//! let logger = AuditLogger::new(store.clone());
//! logger
//!     .append(
//!         AuditEvent::new(AuditAction::CaseApproved, "u1", "alice@example.com")
//!             .with_resource("case", "c1"),
//!     )
//!     .await?;
//!
//! let reader = AuditReader::new(store);
//! let report = verify_chain(&reader.chain_window(None, None, 1000).await?);
//! assert!(report.is_valid());
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod storage;

pub use audit::append::{AuditLogger, ChainLinker};
pub use audit::entry::{AuditAction, AuditEntry, AuditEvent};
pub use audit::query::{AuditQuery, AuditReader, SortOrder};
pub use audit::verify::{
    verify_chain, verify_chain_from, verify_entry, AnomalyKind, ChainAnomaly, EntryStatus,
    VerificationReport,
};
pub use config::AuditConfig;
pub use error::AuditError;
pub use storage::{AuditStore, MemoryAuditStore, SqliteAuditStore};
