//! SQLite-backed audit store.
//!
//! The deployment store for the audit chain. Rows are append-only; the
//! unique index over `IFNULL(previous_hash, 'GENESIS')` is the storage-side
//! serialization point: the second of two inserts claiming the same
//! predecessor fails and surfaces as `ChainConflict` for the append engine
//! to retry. `seq` (the rowid) records insertion order and is the
//! tiebreaker when two entries share a `created_at` microsecond.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit::entry::{format_timestamp, AuditAction, AuditEntry};
use crate::audit::query::{AuditQuery, SortOrder};
use crate::error::AuditError;
use crate::storage::AuditStore;

const AUDIT_SCHEMA: &str = include_str!("../../migrations/001_audit_log.sql");

const ENTRY_COLUMNS: &str = "id, action, actor_id, actor_email, resource_type, resource_id, \
     previous_state, new_state, ip_address, user_agent, session_id, \
     created_at, content_hash, previous_hash";

#[derive(Clone)]
pub struct SqliteAuditStore {
    pool: SqlitePool,
}

impl SqliteAuditStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, AuditError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AuditError::Config(format!("invalid database URL: {}", e)))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    /// A private in-memory database on a single connection, for tests and
    /// throwaway embedding. One connection is required: every pooled SQLite
    /// connection to `:memory:` would otherwise see its own empty database.
    pub async fn connect_in_memory() -> Result<Self, AuditError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), AuditError> {
        sqlx::raw_sql(AUDIT_SCHEMA).execute(&self.pool).await?;
        info!("audit log schema applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn count(&self) -> Result<i64, AuditError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM audit_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn insert(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let result = sqlx::query(
            "INSERT INTO audit_entries (id, action, actor_id, actor_email, resource_type, \
             resource_id, previous_state, new_state, ip_address, user_agent, session_id, \
             created_at, content_hash, previous_hash) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(entry.id.to_string())
        .bind(entry.action.as_str())
        .bind(&entry.actor_id)
        .bind(&entry.actor_email)
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(entry.previous_state.as_ref().map(|v| v.to_string()))
        .bind(entry.new_state.as_ref().map(|v| v.to_string()))
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&entry.session_id)
        .bind(format_timestamp(entry.created_at))
        .bind(&entry.content_hash)
        .bind(&entry.previous_hash)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(entry = %entry.summary(), "audit entry persisted");
                Ok(())
            }
            Err(sqlx::Error::Database(db))
                if db.kind() == sqlx::error::ErrorKind::UniqueViolation
                    && db.message().contains("previous_hash") =>
            {
                Err(AuditError::ChainConflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn latest(&self) -> Result<Option<AuditEntry>, AuditError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM audit_entries ORDER BY created_at DESC, seq DESC LIMIT 1",
            ENTRY_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_entry(&r)).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditEntry>, AuditError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM audit_entries WHERE id = ?1",
            ENTRY_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_entry(&r)).transpose()
    }

    async fn find(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM audit_entries WHERE 1 = 1",
            ENTRY_COLUMNS
        ));

        if let Some(actor_id) = &query.actor_id {
            builder.push(" AND actor_id = ").push_bind(actor_id.clone());
        }
        if let Some(resource_id) = &query.resource_id {
            builder.push(" AND resource_id = ").push_bind(resource_id.clone());
        }
        if let Some(resource_type) = &query.resource_type {
            builder
                .push(" AND resource_type = ")
                .push_bind(resource_type.clone());
        }
        if let Some(action) = query.action {
            builder.push(" AND action = ").push_bind(action.as_str());
        }
        // created_at is stored as fixed-precision RFC 3339 UTC text, so
        // lexicographic comparison is chronological.
        if let Some(from) = query.from {
            builder.push(" AND created_at >= ").push_bind(format_timestamp(from));
        }
        if let Some(to) = query.to {
            builder.push(" AND created_at <= ").push_bind(format_timestamp(to));
        }

        builder.push(match query.order {
            SortOrder::Ascending => " ORDER BY created_at ASC, seq ASC",
            SortOrder::Descending => " ORDER BY created_at DESC, seq DESC",
        });
        builder.push(" LIMIT ").push_bind(query.limit);
        builder.push(" OFFSET ").push_bind(query.offset);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_entry).collect()
    }
}

fn row_to_entry(row: &SqliteRow) -> Result<AuditEntry, AuditError> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| AuditError::Serialization(format!("corrupt entry id: {}", e)))?;

    let action: String = row.try_get("action")?;
    let action: AuditAction = action.parse()?;

    let created_at: String = row.try_get("created_at")?;
    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| AuditError::Serialization(format!("corrupt created_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(AuditEntry {
        id,
        action,
        actor_id: row.try_get("actor_id")?,
        actor_email: row.try_get("actor_email")?,
        resource_type: row.try_get("resource_type")?,
        resource_id: row.try_get("resource_id")?,
        previous_state: parse_state(row.try_get("previous_state")?)?,
        new_state: parse_state(row.try_get("new_state")?)?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        session_id: row.try_get("session_id")?,
        created_at,
        content_hash: row.try_get("content_hash")?,
        previous_hash: row.try_get("previous_hash")?,
    })
}

fn parse_state(raw: Option<String>) -> Result<Option<serde_json::Value>, AuditError> {
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::{hash_event, truncate_to_micros, AuditEvent};

    async fn setup() -> SqliteAuditStore {
        let store = SqliteAuditStore::connect_in_memory().await.unwrap();
        store.run_migrations().await.unwrap();
        store
    }

    fn entry_after(previous_hash: Option<String>, actor: &str) -> AuditEntry {
        let event = AuditEvent::new(
            AuditAction::CaseApproved,
            actor,
            format!("{}@example.com", actor),
        )
        .with_resource("case", "c1")
        .with_states(None, Some(serde_json::json!({"status": "APPROVED"})));
        let created_at = truncate_to_micros(Utc::now());
        AuditEntry {
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
            content_hash: hash_event(&event, created_at),
            previous_hash,
        }
    }

    #[tokio::test]
    async fn test_insert_round_trip() {
        let store = setup().await;
        let entry = entry_after(None, "u1");
        store.insert(&entry).await.unwrap();

        let fetched = store.find_by_id(entry.id).await.unwrap().unwrap();
        assert_eq!(fetched, entry);
        // The round-tripped entry still verifies against its stored digest.
        assert!(fetched.verify_hash());
    }

    #[tokio::test]
    async fn test_latest_follows_inserts() {
        let store = setup().await;
        assert!(store.latest().await.unwrap().is_none());

        let first = entry_after(None, "u1");
        store.insert(&first).await.unwrap();
        let second = entry_after(Some(first.content_hash.clone()), "u2");
        store.insert(&second).await.unwrap();

        assert_eq!(store.latest().await.unwrap().unwrap().id, second.id);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_predecessor_is_chain_conflict() {
        let store = setup().await;
        let first = entry_after(None, "u1");
        store.insert(&first).await.unwrap();

        // Second genesis claim hits the IFNULL slot of the unique index.
        let fork_genesis = entry_after(None, "u2");
        assert!(matches!(
            store.insert(&fork_genesis).await,
            Err(AuditError::ChainConflict)
        ));

        let second = entry_after(Some(first.content_hash.clone()), "u2");
        store.insert(&second).await.unwrap();
        let fork = entry_after(Some(first.content_hash.clone()), "u3");
        assert!(matches!(
            store.insert(&fork).await,
            Err(AuditError::ChainConflict)
        ));
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
