use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalStatus {
    Pending,
    Reminder30Sent,
    Reminder15Sent,
    ExpiredUnactioned,
    AssignedToPool,
    Renewed,
    CustomerDeclined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    ThirtyDay,
    FifteenDay,
}

impl ReminderKind {
    pub fn threshold_days(self) -> i64 {
        match self {
            Self::ThirtyDay => 30,
            Self::FifteenDay => 15,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalPolicy {
    pub policy_number: String,
    pub customer_name: String,
    pub phone: String,
    pub expiry_date: NaiveDate,
    pub status: RenewalStatus,
    /// Idempotency record: a reminder kind listed here is never re-sent.
    pub reminders_sent: Vec<ReminderKind>,
    pub updated_at: DateTime<Utc>,
}

impl RenewalPolicy {
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        self.expiry_date.signed_duration_since(today).num_days()
    }

    pub fn has_reminder(&self, kind: ReminderKind) -> bool {
        self.reminders_sent.contains(&kind)
    }

    /// Actioned policies are out of the scanner's hands.
    pub fn is_actioned(&self) -> bool {
        matches!(
            self.status,
            RenewalStatus::AssignedToPool | RenewalStatus::Renewed | RenewalStatus::CustomerDeclined
        )
    }
}

/// The scanner step a policy is due for on a given day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenewalDue {
    Nothing,
    Reminder(ReminderKind),
    PoolAssignment,
}

/// Buckets a policy for the scanner. Reminder windows do not stack: once a
/// policy is inside the 15-day window, a missed 30-day reminder is skipped
/// rather than sent late.
pub fn renewal_due(policy: &RenewalPolicy, today: NaiveDate) -> RenewalDue {
    if policy.is_actioned() {
        return RenewalDue::Nothing;
    }

    let days = policy.days_until_expiry(today);
    if days <= 0 {
        return RenewalDue::PoolAssignment;
    }
    if days <= 15 && !policy.has_reminder(ReminderKind::FifteenDay) {
        return RenewalDue::Reminder(ReminderKind::FifteenDay);
    }
    if days <= 30 && days > 15 && !policy.has_reminder(ReminderKind::ThirtyDay) {
        return RenewalDue::Reminder(ReminderKind::ThirtyDay);
    }
    RenewalDue::Nothing
}
