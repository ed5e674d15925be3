use chrono::{DateTime, Utc};
use sqlx::Row;

use coverdesk_core::audit::{AuditAction, AuditEntry};
use coverdesk_core::domain::quote::QuoteId;

use super::{AuditLogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditLogRepository {
    pool: DbPool,
}

impl SqlAuditLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEntry, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quote_id: String =
        row.try_get("quote_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let timestamp_str: String =
        row.try_get("timestamp").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let actor: String =
        row.try_get("actor").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let action_str: String =
        row.try_get("action").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let details: String =
        row.try_get("details").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad audit timestamp: {e}")))?;

    Ok(AuditEntry {
        id,
        quote_id: QuoteId(quote_id),
        timestamp,
        actor,
        action: AuditAction::parse(&action_str),
        details,
    })
}

#[async_trait::async_trait]
impl AuditLogRepository for SqlAuditLogRepository {
    async fn append(&self, entry: AuditEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO audit_log (id, quote_id, timestamp, actor, action, details)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(&entry.quote_id.0)
        .bind(entry.timestamp.to_rfc3339())
        .bind(&entry.actor)
        .bind(entry.action.as_key())
        .bind(&entry.details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_quote(
        &self,
        quote_id: &QuoteId,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, quote_id, timestamp, actor, action, details
             FROM audit_log WHERE quote_id = ? ORDER BY timestamp DESC, id DESC",
        )
        .bind(&quote_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect::<Result<Vec<_>, _>>()
    }
}
