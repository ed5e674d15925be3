use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::quote::QuoteId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    QuoteCreated,
    QuoteUpdated,
    ExceptionRequest,
    ApprovalGranted,
    ApprovalRejected,
    ApprovalInvalidated,
    PaymentLinkSent,
    PaymentCollected,
    StatusChanged,
    Assigned,
    Claimed,
    AssignmentRejected,
    AssignmentCompleted,
    NoteAdded,
    Custom(String),
}

impl AuditAction {
    pub fn as_key(&self) -> String {
        match self {
            Self::QuoteCreated => "quote_created".to_string(),
            Self::QuoteUpdated => "quote_updated".to_string(),
            Self::ExceptionRequest => "exception_request".to_string(),
            Self::ApprovalGranted => "approval_granted".to_string(),
            Self::ApprovalRejected => "approval_rejected".to_string(),
            Self::ApprovalInvalidated => "approval_invalidated".to_string(),
            Self::PaymentLinkSent => "payment_link_sent".to_string(),
            Self::PaymentCollected => "payment_collected".to_string(),
            Self::StatusChanged => "status_changed".to_string(),
            Self::Assigned => "assigned".to_string(),
            Self::Claimed => "claimed".to_string(),
            Self::AssignmentRejected => "assignment_rejected".to_string(),
            Self::AssignmentCompleted => "assignment_completed".to_string(),
            Self::NoteAdded => "note_added".to_string(),
            Self::Custom(value) => value.to_ascii_lowercase(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "quote_created" => Self::QuoteCreated,
            "quote_updated" => Self::QuoteUpdated,
            "exception_request" => Self::ExceptionRequest,
            "approval_granted" => Self::ApprovalGranted,
            "approval_rejected" => Self::ApprovalRejected,
            "approval_invalidated" => Self::ApprovalInvalidated,
            "payment_link_sent" => Self::PaymentLinkSent,
            "payment_collected" => Self::PaymentCollected,
            "status_changed" => Self::StatusChanged,
            "assigned" => Self::Assigned,
            "claimed" => Self::Claimed,
            "assignment_rejected" => Self::AssignmentRejected,
            "assignment_completed" => Self::AssignmentCompleted,
            "note_added" => Self::NoteAdded,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Write-once fact scoped to a quote; nothing in the system edits or deletes
/// audit entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub quote_id: QuoteId,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: AuditAction,
    pub details: String,
}

impl AuditEntry {
    pub fn new(
        quote_id: QuoteId,
        action: AuditAction,
        actor: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            quote_id,
            timestamp: Utc::now(),
            actor: actor.into(),
            action,
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditAction, AuditEntry};
    use crate::domain::quote::QuoteId;

    #[test]
    fn action_keys_round_trip() {
        for action in [
            AuditAction::QuoteCreated,
            AuditAction::ExceptionRequest,
            AuditAction::ApprovalGranted,
            AuditAction::Claimed,
            AuditAction::AssignmentCompleted,
        ] {
            assert_eq!(AuditAction::parse(&action.as_key()), action);
        }

        assert_eq!(
            AuditAction::parse("legacy_import"),
            AuditAction::Custom("legacy_import".to_string())
        );
    }

    #[test]
    fn entries_carry_actor_and_quote_scope() {
        let entry = AuditEntry::new(
            QuoteId("QT-2026-0042".to_string()),
            AuditAction::ApprovalGranted,
            "credit-1",
            "installment exception approved",
        );

        assert_eq!(entry.quote_id.0, "QT-2026-0042");
        assert_eq!(entry.actor, "credit-1");
        assert!(!entry.id.is_empty());
    }
}
