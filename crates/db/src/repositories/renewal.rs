use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;

use coverdesk_core::domain::renewal::{ReminderKind, RenewalPolicy, RenewalStatus};

use super::{RenewalPolicyRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRenewalPolicyRepository {
    pool: DbPool,
}

impl SqlRenewalPolicyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn renewal_status_as_str(status: RenewalStatus) -> &'static str {
    match status {
        RenewalStatus::Pending => "pending",
        RenewalStatus::Reminder30Sent => "reminder_30_sent",
        RenewalStatus::Reminder15Sent => "reminder_15_sent",
        RenewalStatus::ExpiredUnactioned => "expired_unactioned",
        RenewalStatus::AssignedToPool => "assigned_to_pool",
        RenewalStatus::Renewed => "renewed",
        RenewalStatus::CustomerDeclined => "customer_declined",
    }
}

fn parse_status(raw: &str) -> RenewalStatus {
    match raw {
        "reminder_30_sent" => RenewalStatus::Reminder30Sent,
        "reminder_15_sent" => RenewalStatus::Reminder15Sent,
        "expired_unactioned" => RenewalStatus::ExpiredUnactioned,
        "assigned_to_pool" => RenewalStatus::AssignedToPool,
        "renewed" => RenewalStatus::Renewed,
        "customer_declined" => RenewalStatus::CustomerDeclined,
        _ => RenewalStatus::Pending,
    }
}

fn row_to_policy(row: &sqlx::sqlite::SqliteRow) -> Result<RenewalPolicy, RepositoryError> {
    let policy_number: String =
        row.try_get("policy_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_name: String =
        row.try_get("customer_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let phone: String =
        row.try_get("phone").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let expiry_date_str: String =
        row.try_get("expiry_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reminders_str: String =
        row.try_get("reminders_sent").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let expiry_date = NaiveDate::parse_from_str(&expiry_date_str, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("bad expiry date: {e}")))?;
    let reminders_sent: Vec<ReminderKind> = serde_json::from_str(&reminders_str)
        .map_err(|e| RepositoryError::Decode(format!("bad reminders list: {e}")))?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad updated_at: {e}")))?;

    Ok(RenewalPolicy {
        policy_number,
        customer_name,
        phone,
        expiry_date,
        status: parse_status(&status_str),
        reminders_sent,
        updated_at,
    })
}

#[async_trait::async_trait]
impl RenewalPolicyRepository for SqlRenewalPolicyRepository {
    async fn list_all(&self) -> Result<Vec<RenewalPolicy>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT policy_number, customer_name, phone, expiry_date, status,
                    reminders_sent, updated_at
             FROM renewal_policy ORDER BY expiry_date ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_policy).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, policy: RenewalPolicy) -> Result<(), RepositoryError> {
        let reminders = serde_json::to_string(&policy.reminders_sent)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO renewal_policy (policy_number, customer_name, phone, expiry_date,
                                         status, reminders_sent, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(policy_number) DO UPDATE SET
                 customer_name = excluded.customer_name,
                 phone = excluded.phone,
                 expiry_date = excluded.expiry_date,
                 status = excluded.status,
                 reminders_sent = excluded.reminders_sent,
                 updated_at = excluded.updated_at",
        )
        .bind(&policy.policy_number)
        .bind(&policy.customer_name)
        .bind(&policy.phone)
        .bind(policy.expiry_date.format("%Y-%m-%d").to_string())
        .bind(renewal_status_as_str(policy.status))
        .bind(&reminders)
        .bind(policy.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
