//! Tamper-evident audit logging.
//!
//! Every sensitive state change becomes one immutable `AuditEntry` whose
//! SHA-256 content hash chains to its predecessor. Appends go through
//! `AuditLogger`; reads go through `AuditReader`; `verify_chain` detects
//! any edit, deletion, or reordering after the fact.

pub mod append;
pub mod entry;
pub mod query;
pub mod verify;

pub use append::{AuditLogger, ChainLinker};
pub use entry::{AuditAction, AuditEntry, AuditEvent};
pub use query::{AuditQuery, AuditReader, SortOrder};
pub use verify::{verify_chain, verify_chain_from, verify_entry, VerificationReport};
