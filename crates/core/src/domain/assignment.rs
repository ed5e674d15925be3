use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    Claimed,
    Rejected,
    Completed,
}

impl AssignmentStatus {
    /// Terminal assignments may be superseded by a fresh assignment.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentAction {
    Assigned,
    Claimed,
    Edited,
    Rejected,
    Completed,
}

/// Closed set of dispositions an agent can record when handing a quote back
/// to the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    CustomerUnreachable,
    CustomerDeclined,
    DuplicateQuote,
    IncorrectContactDetails,
    PriceTooHigh,
    PolicyAlreadyActive,
    IneligibleVehicle,
    MissingDocuments,
    OutsideServiceArea,
    TestQuote,
    Other,
}

pub const REJECTION_REASONS: [RejectionReason; 11] = [
    RejectionReason::CustomerUnreachable,
    RejectionReason::CustomerDeclined,
    RejectionReason::DuplicateQuote,
    RejectionReason::IncorrectContactDetails,
    RejectionReason::PriceTooHigh,
    RejectionReason::PolicyAlreadyActive,
    RejectionReason::IneligibleVehicle,
    RejectionReason::MissingDocuments,
    RejectionReason::OutsideServiceArea,
    RejectionReason::TestQuote,
    RejectionReason::Other,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Normal,
    Soon,
    Urgent,
}

/// Derived on every read, never persisted. Boundaries are strict: an
/// assignment sitting at exactly 24h is `Soon`, at exactly 12h `Normal`.
pub fn classify_urgency(assigned_at: DateTime<Utc>, now: DateTime<Utc>) -> Urgency {
    let elapsed = now.signed_duration_since(assigned_at);
    if elapsed > Duration::hours(24) {
        Urgency::Urgent
    } else if elapsed > Duration::hours(12) {
        Urgency::Soon
    } else {
        Urgency::Normal
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentNote {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub author_name: String,
    pub reminder_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AgentNote {
    pub fn new(
        text: impl Into<String>,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        reminder_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            reminder_at,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteAssignment {
    pub assigned_to_agent_id: String,
    pub assigned_to_agent_name: String,
    pub assigned_by_agent_id: String,
    pub assigned_by_agent_name: String,
    pub assigned_at: DateTime<Utc>,
    pub status: AssignmentStatus,
    pub claimed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<RejectionReason>,
    pub rejection_note: Option<String>,
    pub agent_notes: Vec<AgentNote>,
}

impl QuoteAssignment {
    pub fn new(
        assigned_to_agent_id: impl Into<String>,
        assigned_to_agent_name: impl Into<String>,
        assigned_by_agent_id: impl Into<String>,
        assigned_by_agent_name: impl Into<String>,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            assigned_to_agent_id: assigned_to_agent_id.into(),
            assigned_to_agent_name: assigned_to_agent_name.into(),
            assigned_by_agent_id: assigned_by_agent_id.into(),
            assigned_by_agent_name: assigned_by_agent_name.into(),
            assigned_at,
            status: AssignmentStatus::Assigned,
            claimed_at: None,
            rejected_at: None,
            completed_at: None,
            rejection_reason: None,
            rejection_note: None,
            agent_notes: Vec::new(),
        }
    }

    pub fn urgency(&self, now: DateTime<Utc>) -> Urgency {
        classify_urgency(self.assigned_at, now)
    }
}

/// Immutable fact appended to a quote's assignment history. Entries are never
/// reordered or edited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentHistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: AssignmentAction,
    pub performed_by: String,
    pub performed_by_name: String,
    pub details: String,
}

impl AssignmentHistoryEntry {
    pub fn record(
        action: AssignmentAction,
        performed_by: impl Into<String>,
        performed_by_name: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action,
            performed_by: performed_by.into(),
            performed_by_name: performed_by_name.into(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{classify_urgency, AssignmentStatus, QuoteAssignment, Urgency, REJECTION_REASONS};

    #[test]
    fn urgency_buckets_by_hours_since_assignment() {
        let now = Utc::now();
        assert_eq!(classify_urgency(now - Duration::hours(25), now), Urgency::Urgent);
        assert_eq!(classify_urgency(now - Duration::hours(13), now), Urgency::Soon);
        assert_eq!(classify_urgency(now - Duration::hours(1), now), Urgency::Normal);
    }

    #[test]
    fn urgency_boundaries_are_strict() {
        let now = Utc::now();
        assert_eq!(classify_urgency(now - Duration::hours(24), now), Urgency::Soon);
        assert_eq!(classify_urgency(now - Duration::hours(12), now), Urgency::Normal);
    }

    #[test]
    fn rejection_reason_set_is_closed_at_eleven() {
        assert_eq!(REJECTION_REASONS.len(), 11);
    }

    #[test]
    fn fresh_assignment_has_no_progress_timestamps() {
        let assignment = QuoteAssignment::new("agent-2", "Noor", "sup-1", "Fatima", Utc::now());
        assert_eq!(assignment.status, AssignmentStatus::Assigned);
        assert!(assignment.claimed_at.is_none());
        assert!(assignment.rejected_at.is_none());
        assert!(assignment.completed_at.is_none());
        assert!(!assignment.status.is_terminal());
    }
}
