use chrono::{DateTime, Utc};
use sqlx::Row;

use coverdesk_core::domain::quote::{Quote, QuoteId, QuoteSource, QuoteStatus};

use super::{QuoteRepository, RepositoryError};
use crate::DbPool;

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn quote_status_as_str(status: QuoteStatus) -> &'static str {
    match status {
        QuoteStatus::Draft => "draft",
        QuoteStatus::PendingApproval => "pending_approval",
        QuoteStatus::ApprovalGranted => "approval_granted",
        QuoteStatus::ApprovalRejected => "approval_rejected",
        QuoteStatus::LinkSent => "link_sent",
        QuoteStatus::LinkClicked => "link_clicked",
        QuoteStatus::DocsUploaded => "docs_uploaded",
        QuoteStatus::PaymentPending => "payment_pending",
        QuoteStatus::Issued => "issued",
        QuoteStatus::Expiring => "expiring",
    }
}

pub fn quote_source_as_str(source: QuoteSource) -> &'static str {
    match source {
        QuoteSource::AgentPortal => "agent_portal",
        QuoteSource::CustomerPortal => "customer_portal",
    }
}

fn version_as_i64(version: u64) -> Result<i64, RepositoryError> {
    i64::try_from(version)
        .map_err(|_| RepositoryError::Decode(format!("version {version} exceeds storage range")))
}

/// The payload column is the document of record; denormalized columns exist
/// for filtering and ordering only.
fn row_to_quote(row: &sqlx::sqlite::SqliteRow) -> Result<Quote, RepositoryError> {
    let payload: String =
        row.try_get("payload").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    serde_json::from_str(&payload).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn bind_quote_columns<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    quote: &'q Quote,
    version: i64,
    payload: &'q str,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(&quote.quote_reference)
        .bind(quote_status_as_str(quote.status))
        .bind(version)
        .bind(quote_source_as_str(quote.source))
        .bind(&quote.agent_id)
        .bind(&quote.agent_name)
        .bind(quote.created_at.to_rfc3339())
        .bind(quote.updated_at.to_rfc3339())
        .bind(payload)
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query("SELECT payload FROM quote WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_quote(r)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<Quote>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query("SELECT payload FROM quote ORDER BY created_at DESC, id DESC")
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_quote).collect::<Result<Vec<_>, _>>()
    }

    async fn insert(&self, quote: Quote) -> Result<(), RepositoryError> {
        let version = version_as_i64(quote.version)?;
        let payload =
            serde_json::to_string(&quote).map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let query = sqlx::query(
            "INSERT INTO quote (id, quote_reference, status, version, source,
                                agent_id, agent_name, created_at, updated_at, payload)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&quote.id.0);
        bind_quote_columns(query, &quote, version, &payload).execute(&self.pool).await?;

        Ok(())
    }

    async fn update_guarded(
        &self,
        quote: Quote,
        expected_version: u64,
    ) -> Result<(), RepositoryError> {
        let version = version_as_i64(quote.version)?;
        let expected = version_as_i64(expected_version)?;
        let payload =
            serde_json::to_string(&quote).map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let query = sqlx::query(
            "UPDATE quote SET quote_reference = ?, status = ?, version = ?, source = ?,
                              agent_id = ?, agent_name = ?, created_at = ?, updated_at = ?,
                              payload = ?
             WHERE id = ? AND version = ?",
        );
        let result = bind_quote_columns(query, &quote, version, &payload)
            .bind(&quote.id.0)
            .bind(expected)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT version FROM quote WHERE id = ?")
                .bind(&quote.id.0)
                .fetch_optional(&self.pool)
                .await?;

            return Err(match exists {
                Some(_) => RepositoryError::Conflict {
                    quote_id: quote.id.0.clone(),
                    expected: expected_version,
                },
                None => RepositoryError::Missing { quote_id: quote.id.0.clone() },
            });
        }

        Ok(())
    }
}
