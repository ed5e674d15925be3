use chrono::{DateTime, Utc};
use sqlx::Row;

use coverdesk_core::domain::discount::DiscountCode;
use coverdesk_core::domain::quote::QuoteId;

use super::{DiscountCodeRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDiscountCodeRepository {
    pool: DbPool,
}

impl SqlDiscountCodeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_code(row: &sqlx::sqlite::SqliteRow) -> Result<DiscountCode, RepositoryError> {
    let code: String = row.try_get("code").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let percent: i64 =
        row.try_get("percent").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let staff_id: String =
        row.try_get("staff_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let year: i64 = row.try_get("year").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_used: i64 =
        row.try_get("is_used").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let used_at_str: Option<String> =
        row.try_get("used_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let used_by: Option<String> =
        row.try_get("used_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let used_on_quote: Option<String> =
        row.try_get("used_on_quote").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let percent = u8::try_from(percent)
        .map_err(|_| RepositoryError::Decode(format!("bad discount percent {percent}")))?;
    let used_at = used_at_str
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(DiscountCode {
        code,
        percent,
        staff_id,
        year: year as i32,
        is_used: is_used != 0,
        used_at,
        used_by,
        used_on_quote: used_on_quote.map(QuoteId),
    })
}

#[async_trait::async_trait]
impl DiscountCodeRepository for SqlDiscountCodeRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        let row = sqlx::query(
            "SELECT code, percent, staff_id, year, is_used, used_at, used_by, used_on_quote
             FROM discount_code WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_code(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_staff(
        &self,
        staff_id: &str,
        year: i32,
    ) -> Result<Vec<DiscountCode>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT code, percent, staff_id, year, is_used, used_at, used_by, used_on_quote
             FROM discount_code WHERE staff_id = ? AND year = ?
             ORDER BY percent DESC, code ASC",
        )
        .bind(staff_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_code).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, code: DiscountCode) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO discount_code (code, percent, staff_id, year, is_used,
                                        used_at, used_by, used_on_quote)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(code) DO UPDATE SET
                 is_used = excluded.is_used,
                 used_at = excluded.used_at,
                 used_by = excluded.used_by,
                 used_on_quote = excluded.used_on_quote",
        )
        .bind(&code.code)
        .bind(i64::from(code.percent))
        .bind(&code.staff_id)
        .bind(i64::from(code.year))
        .bind(i64::from(code.is_used))
        .bind(code.used_at.map(|dt| dt.to_rfc3339()))
        .bind(&code.used_by)
        .bind(code.used_on_quote.as_ref().map(|id| id.0.clone()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
