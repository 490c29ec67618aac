//! Entry and chain verification.
//!
//! Verification never mutates anything and never fails because of what it
//! finds: tampering is reported as data in a `VerificationReport`, not
//! raised as an error, so one bad entry cannot prevent inspection of the
//! rest of the chain.
//!
//! Detection coverage: editing any field of a persisted entry breaks that
//! entry's content hash; deleting or reordering entries breaks the next
//! entry's previous-hash expectation. Hiding a single edit would require
//! rewriting every subsequent entry's hash, which append-only storage
//! permissions do not allow.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit::entry::AuditEntry;

/// Outcome of verifying a single entry's content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Valid,
    /// `expected` is the hash recomputed from the stored fields; `actual`
    /// is the digest stored alongside them.
    Invalid { expected: String, actual: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalyKind {
    /// The entry's stored fields no longer produce its stored digest.
    ContentHashMismatch,
    /// The entry's stored previous-hash does not match its predecessor,
    /// signalling insertion, deletion, or reordering.
    ChainBreak,
}

/// One detected discrepancy, with enough context to investigate.
#[derive(Debug, Clone, Serialize)]
pub struct ChainAnomaly {
    pub entry_id: Uuid,
    pub kind: AnomalyKind,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub invalid_entries: usize,
    pub anomalies: Vec<ChainAnomaly>,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.invalid_entries == 0
    }

    pub fn summary(&self) -> String {
        if self.is_valid() {
            format!("✅ Audit chain is valid ({} entries)", self.total_entries)
        } else {
            format!(
                "❌ Audit chain is invalid: {} of {} entries flagged, {} anomalies",
                self.invalid_entries,
                self.total_entries,
                self.anomalies.len()
            )
        }
    }
}

/// Recompute one entry's content hash from its stored fields and compare
/// against the stored digest.
///
/// Chain linkage is deliberately out of scope here: an entry can carry a
/// correct content hash and still sit in a broken chain if its neighbors
/// were removed or reordered.
pub fn verify_entry(entry: &AuditEntry) -> EntryStatus {
    let expected = entry.compute_hash();
    if expected == entry.content_hash {
        EntryStatus::Valid
    } else {
        EntryStatus::Invalid {
            expected,
            actual: entry.content_hash.clone(),
        }
    }
}

/// Verify a full chain fetched from the beginning of the log.
///
/// `entries` must be an ordered, contiguous window in ascending append
/// order (`AuditReader::chain_window`). An empty window is trivially valid.
pub fn verify_chain(entries: &[AuditEntry]) -> VerificationReport {
    verify_chain_from(entries, None)
}

/// Verify a contiguous sub-range of the chain.
///
/// `anchor` is the `content_hash` of the entry immediately preceding the
/// window, or `None` when the window starts at genesis.
///
/// The expectation threaded between entries is the predecessor's *stored*
/// content hash, so a single edited entry is reported exactly once instead
/// of cascading a failure onto every later entry. The flip side: an entry
/// whose stored `content_hash` field itself was overwritten is flagged
/// here *and* its successor is flagged with a chain break. Both findings
/// are real and both are surfaced.
pub fn verify_chain_from(entries: &[AuditEntry], anchor: Option<&str>) -> VerificationReport {
    let mut anomalies = Vec::new();
    let mut flagged: HashSet<Uuid> = HashSet::new();
    let mut expected_previous: Option<String> = anchor.map(str::to_string);

    for entry in entries {
        if let EntryStatus::Invalid { expected, actual } = verify_entry(entry) {
            debug!(entry_id = %entry.id, "content hash mismatch");
            anomalies.push(ChainAnomaly {
                entry_id: entry.id,
                kind: AnomalyKind::ContentHashMismatch,
                expected: Some(expected),
                actual: Some(actual),
            });
            flagged.insert(entry.id);
        }

        if entry.previous_hash != expected_previous {
            debug!(entry_id = %entry.id, "chain break");
            anomalies.push(ChainAnomaly {
                entry_id: entry.id,
                kind: AnomalyKind::ChainBreak,
                expected: expected_previous.clone(),
                actual: entry.previous_hash.clone(),
            });
            flagged.insert(entry.id);
        }

        expected_previous = Some(entry.content_hash.clone());
    }

    let report = VerificationReport {
        total_entries: entries.len(),
        valid_entries: entries.len() - flagged.len(),
        invalid_entries: flagged.len(),
        anomalies,
    };
    info!(
        total = report.total_entries,
        invalid = report.invalid_entries,
        "chain verification complete"
    );
    report
}
