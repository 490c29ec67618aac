use thiserror::Error;

impl From<sqlx::Error> for AuditError {
    fn from(err: sqlx::Error) -> Self {
        Self::StorageUnavailable(format!("database error: {}", err))
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization error: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum AuditError {
    /// The caller supplied an audit event missing required fields. Rejected
    /// before any write; fix the input and retry.
    #[error("Invalid audit event: {0}")]
    InvalidEvent(String),

    /// A read or write against the storage collaborator failed. Whether the
    /// triggering business operation proceeds, retries, or aborts is the
    /// caller's policy.
    #[error("Audit storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Two appends raced for the same chain tail and the loser exhausted its
    /// retries. The chain itself is intact.
    #[error("Concurrent append conflict: another entry claimed the same predecessor")]
    ChainConflict,

    /// A stored row could not be decoded back into an audit entry.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
