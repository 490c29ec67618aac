use serde::{Deserialize, Serialize};
use std::env;

use crate::error::AuditError;

/// Runtime configuration for the audit subsystem, loaded from environment
/// variables with local-development defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub database_url: String,
    /// How many times an append retries after a detected chain conflict
    /// before surfacing `ChainConflict` to the caller.
    pub append_max_retries: u32,
    /// Default window size for chain verification passes.
    pub verify_batch_size: i64,
}

impl AuditConfig {
    pub fn load() -> Result<Self, AuditError> {
        let database_url = env::var("AUDIT_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://casetrail-audit.db".to_string());

        let append_max_retries = env::var("AUDIT_APPEND_MAX_RETRIES")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|e| AuditError::Config(format!("AUDIT_APPEND_MAX_RETRIES: {}", e)))?;

        let verify_batch_size = env::var("AUDIT_VERIFY_BATCH_SIZE")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .map_err(|e| AuditError::Config(format!("AUDIT_VERIFY_BATCH_SIZE: {}", e)))?;

        Ok(AuditConfig {
            database_url,
            append_max_retries,
            verify_batch_size,
        })
    }
}
