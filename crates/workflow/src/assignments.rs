use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use coverdesk_core::audit::{AuditAction, AuditEntry};
use coverdesk_core::domain::assignment::{
    AgentNote, AssignmentAction, AssignmentHistoryEntry, AssignmentStatus, QuoteAssignment,
    RejectionReason, Urgency,
};
use coverdesk_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use coverdesk_core::errors::{DomainError, WorkflowError};
use coverdesk_db::repositories::{AuditLogRepository, QuoteRepository};

use crate::quotes::{map_repo_error, OperationOutcome};

/// Who a batch of quotes is being assigned to, and by whom.
#[derive(Clone, Debug)]
pub struct AssignmentTemplate {
    pub assigned_to_agent_id: String,
    pub assigned_to_agent_name: String,
    pub assigned_by_agent_id: String,
    pub assigned_by_agent_name: String,
}

/// Per-quote report for a batch assignment. The batch is not atomic across
/// quotes; this says exactly which ids were assigned and which were not.
#[derive(Debug, Default)]
pub struct BatchAssignOutcome {
    pub assigned: Vec<QuoteId>,
    pub failed: Vec<(QuoteId, WorkflowError)>,
    pub side_effect_failures: Vec<(QuoteId, WorkflowError)>,
}

/// Pool dashboard row; urgency is derived at read time, never stored.
#[derive(Clone, Debug)]
pub struct PoolEntry {
    pub quote_id: QuoteId,
    pub quote_reference: String,
    pub assigned_to_agent_name: String,
    pub status: AssignmentStatus,
    pub urgency: Urgency,
}

pub struct AssignmentService {
    quotes: Arc<dyn QuoteRepository>,
    audit: Arc<dyn AuditLogRepository>,
}

impl AssignmentService {
    pub fn new(quotes: Arc<dyn QuoteRepository>, audit: Arc<dyn AuditLogRepository>) -> Self {
        Self { quotes, audit }
    }

    async fn load(&self, quote_id: &QuoteId) -> Result<Quote, WorkflowError> {
        self.quotes
            .find_by_id(quote_id)
            .await
            .map_err(map_repo_error)?
            .ok_or_else(|| WorkflowError::NotFound { quote_id: quote_id.0.clone() })
    }

    async fn persist(&self, mut quote: Quote) -> Result<Quote, WorkflowError> {
        let expected = quote.version;
        quote.version += 1;
        quote.updated_at = Utc::now();
        self.quotes.update_guarded(quote.clone(), expected).await.map_err(map_repo_error)?;
        Ok(quote)
    }

    async fn record_audit(&self, entry: AuditEntry, failures: &mut Vec<WorkflowError>) {
        if let Err(error) = self.audit.append(entry).await {
            let failure = WorkflowError::AuditUnavailable(error.to_string());
            warn!(
                event_name = "workflow.audit.append_failed",
                error = %failure,
                "audit entry was not recorded"
            );
            failures.push(failure);
        }
    }

    /// Assigns each quote to the template's agent, one history entry per
    /// quote. A quote with a live (assigned or claimed) assignment is
    /// reported as failed and left untouched; a terminal assignment is
    /// superseded by a fresh one.
    pub async fn assign_many(
        &self,
        quote_ids: &[QuoteId],
        template: &AssignmentTemplate,
    ) -> BatchAssignOutcome {
        let mut outcome = BatchAssignOutcome::default();

        for quote_id in quote_ids {
            match self.assign_one(quote_id, template).await {
                Ok(failures) => {
                    outcome.assigned.push(quote_id.clone());
                    outcome
                        .side_effect_failures
                        .extend(failures.into_iter().map(|failure| (quote_id.clone(), failure)));
                }
                Err(error) => outcome.failed.push((quote_id.clone(), error)),
            }
        }

        outcome
    }

    async fn assign_one(
        &self,
        quote_id: &QuoteId,
        template: &AssignmentTemplate,
    ) -> Result<Vec<WorkflowError>, WorkflowError> {
        let mut quote = self.load(quote_id).await?;

        if let Some(existing) = &quote.assignment {
            if !existing.status.is_terminal() {
                return Err(WorkflowError::Domain(DomainError::AlreadyAssigned {
                    status: existing.status,
                }));
            }
        }

        quote.assignment = Some(QuoteAssignment::new(
            &template.assigned_to_agent_id,
            &template.assigned_to_agent_name,
            &template.assigned_by_agent_id,
            &template.assigned_by_agent_name,
            Utc::now(),
        ));
        quote.assignment_history.push(AssignmentHistoryEntry::record(
            AssignmentAction::Assigned,
            &template.assigned_by_agent_id,
            &template.assigned_by_agent_name,
            format!("assigned to {}", template.assigned_to_agent_name),
        ));

        self.persist(quote).await?;

        let mut failures = Vec::new();
        self.record_audit(
            AuditEntry::new(
                quote_id.clone(),
                AuditAction::Assigned,
                &template.assigned_by_agent_id,
                format!("assigned to {}", template.assigned_to_agent_name),
            ),
            &mut failures,
        )
        .await;

        Ok(failures)
    }

    /// Claim is a guarded transition `Assigned -> Claimed`: of two agents
    /// racing for the same quote, exactly one write lands and the other
    /// observes a version conflict.
    pub async fn claim(
        &self,
        quote_id: &QuoteId,
        agent_id: &str,
        agent_name: &str,
    ) -> Result<OperationOutcome, WorkflowError> {
        let mut quote = self.load(quote_id).await?;

        let assignment = quote
            .assignment
            .as_mut()
            .ok_or(WorkflowError::Domain(DomainError::AssignmentMissing))?;
        if assignment.status != AssignmentStatus::Assigned {
            return Err(WorkflowError::Domain(DomainError::AssignmentStateInvalid {
                status: assignment.status,
                required: AssignmentStatus::Assigned,
            }));
        }

        assignment.status = AssignmentStatus::Claimed;
        assignment.claimed_at = Some(Utc::now());
        quote.assignment_history.push(AssignmentHistoryEntry::record(
            AssignmentAction::Claimed,
            agent_id,
            agent_name,
            "claimed from pool",
        ));

        let quote = self.persist(quote).await?;

        let mut failures = Vec::new();
        self.record_audit(
            AuditEntry::new(quote_id.clone(), AuditAction::Claimed, agent_id, "claimed from pool"),
            &mut failures,
        )
        .await;

        Ok(OperationOutcome { quote, side_effect_failures: failures })
    }

    pub async fn reject(
        &self,
        quote_id: &QuoteId,
        agent_id: &str,
        agent_name: &str,
        reason: RejectionReason,
        note: Option<String>,
    ) -> Result<OperationOutcome, WorkflowError> {
        let mut quote = self.load(quote_id).await?;

        let assignment = quote
            .assignment
            .as_mut()
            .ok_or(WorkflowError::Domain(DomainError::AssignmentMissing))?;
        if assignment.status.is_terminal() {
            return Err(WorkflowError::Domain(DomainError::AssignmentStateInvalid {
                status: assignment.status,
                required: AssignmentStatus::Claimed,
            }));
        }

        assignment.status = AssignmentStatus::Rejected;
        assignment.rejected_at = Some(Utc::now());
        assignment.rejection_reason = Some(reason);
        assignment.rejection_note = note.clone();
        quote.assignment_history.push(AssignmentHistoryEntry::record(
            AssignmentAction::Rejected,
            agent_id,
            agent_name,
            format!("rejected: {reason:?}"),
        ));

        let quote = self.persist(quote).await?;

        let mut failures = Vec::new();
        self.record_audit(
            AuditEntry::new(
                quote_id.clone(),
                AuditAction::AssignmentRejected,
                agent_id,
                note.unwrap_or_else(|| format!("{reason:?}")),
            ),
            &mut failures,
        )
        .await;

        Ok(OperationOutcome { quote, side_effect_failures: failures })
    }

    /// Guarded on the parent quote: completion is only meaningful once the
    /// policy is issued. On failure nothing is mutated.
    pub async fn complete(
        &self,
        quote_id: &QuoteId,
        agent_id: &str,
        agent_name: &str,
    ) -> Result<OperationOutcome, WorkflowError> {
        let mut quote = self.load(quote_id).await?;

        if quote.status != QuoteStatus::Issued {
            return Err(WorkflowError::Domain(DomainError::QuoteNotIssued {
                status: quote.status,
            }));
        }

        let assignment = quote
            .assignment
            .as_mut()
            .ok_or(WorkflowError::Domain(DomainError::AssignmentMissing))?;
        if assignment.status != AssignmentStatus::Claimed {
            return Err(WorkflowError::Domain(DomainError::AssignmentStateInvalid {
                status: assignment.status,
                required: AssignmentStatus::Claimed,
            }));
        }

        assignment.status = AssignmentStatus::Completed;
        assignment.completed_at = Some(Utc::now());
        quote.assignment_history.push(AssignmentHistoryEntry::record(
            AssignmentAction::Completed,
            agent_id,
            agent_name,
            "assignment completed",
        ));

        let quote = self.persist(quote).await?;

        let mut failures = Vec::new();
        self.record_audit(
            AuditEntry::new(
                quote_id.clone(),
                AuditAction::AssignmentCompleted,
                agent_id,
                "assignment completed",
            ),
            &mut failures,
        )
        .await;

        Ok(OperationOutcome { quote, side_effect_failures: failures })
    }

    /// Notes are purely additive; there is no edit or delete.
    pub async fn add_note(
        &self,
        quote_id: &QuoteId,
        text: &str,
        author_id: &str,
        author_name: &str,
        reminder_at: Option<DateTime<Utc>>,
    ) -> Result<OperationOutcome, WorkflowError> {
        let mut quote = self.load(quote_id).await?;

        let assignment = quote
            .assignment
            .as_mut()
            .ok_or(WorkflowError::Domain(DomainError::AssignmentMissing))?;
        assignment.agent_notes.push(AgentNote::new(text, author_id, author_name, reminder_at));
        quote.assignment_history.push(AssignmentHistoryEntry::record(
            AssignmentAction::Edited,
            author_id,
            author_name,
            "note added",
        ));

        let quote = self.persist(quote).await?;

        let mut failures = Vec::new();
        self.record_audit(
            AuditEntry::new(quote_id.clone(), AuditAction::NoteAdded, author_id, text),
            &mut failures,
        )
        .await;

        Ok(OperationOutcome { quote, side_effect_failures: failures })
    }

    /// Live assignments with their derived urgency, for the pool dashboard.
    pub async fn pool_view(&self, now: DateTime<Utc>) -> Result<Vec<PoolEntry>, WorkflowError> {
        let quotes = self.quotes.list_all().await.map_err(map_repo_error)?;

        Ok(quotes
            .into_iter()
            .filter_map(|quote| {
                let assignment = quote.assignment?;
                if assignment.status.is_terminal() {
                    return None;
                }
                Some(PoolEntry {
                    quote_id: quote.id,
                    quote_reference: quote.quote_reference,
                    assigned_to_agent_name: assignment.assigned_to_agent_name.clone(),
                    status: assignment.status,
                    urgency: assignment.urgency(now),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use coverdesk_core::domain::assignment::{AssignmentStatus, RejectionReason, Urgency};
    use coverdesk_core::domain::quote::{QuoteId, QuoteStatus};
    use coverdesk_core::errors::{DomainError, WorkflowError};
    use coverdesk_db::repositories::{
        InMemoryAuditLogRepository, InMemoryQuoteRepository, QuoteRepository,
    };

    use super::{AssignmentService, AssignmentTemplate};
    use crate::testing::sample_quote;

    struct Harness {
        quotes: Arc<InMemoryQuoteRepository>,
        service: AssignmentService,
    }

    fn harness() -> Harness {
        let quotes = Arc::new(InMemoryQuoteRepository::default());
        let audit = Arc::new(InMemoryAuditLogRepository::default());
        let service = AssignmentService::new(quotes.clone(), audit);
        Harness { quotes, service }
    }

    fn template() -> AssignmentTemplate {
        AssignmentTemplate {
            assigned_to_agent_id: "agent-2".to_string(),
            assigned_to_agent_name: "Noor Khalid".to_string(),
            assigned_by_agent_id: "sup-1".to_string(),
            assigned_by_agent_name: "Khalid Rashid".to_string(),
        }
    }

    async fn seed_assigned(harness: &Harness, id: &str, status: QuoteStatus) -> QuoteId {
        let quote = sample_quote(id, status);
        let quote_id = quote.id.clone();
        harness.quotes.insert(quote).await.expect("seed");
        let outcome = harness.service.assign_many(&[quote_id.clone()], &template()).await;
        assert_eq!(outcome.assigned.len(), 1);
        quote_id
    }

    #[tokio::test]
    async fn assign_many_reports_per_quote_outcomes() {
        let harness = harness();
        for id in ["QT-A1", "QT-A2", "QT-A3"] {
            harness.quotes.insert(sample_quote(id, QuoteStatus::Draft)).await.expect("seed");
        }
        let ids = [
            QuoteId("QT-A1".to_string()),
            QuoteId("QT-A2".to_string()),
            QuoteId("QT-A3".to_string()),
            QuoteId("QT-MISSING".to_string()),
        ];

        let outcome = harness.service.assign_many(&ids, &template()).await;

        assert_eq!(outcome.assigned.len(), 3);
        assert_eq!(outcome.failed.len(), 1);
        assert!(matches!(outcome.failed[0].1, WorkflowError::NotFound { .. }));

        for id in &outcome.assigned {
            let quote = harness.quotes.find_by_id(id).await.expect("read").expect("exists");
            let assignment = quote.assignment.expect("assigned");
            assert_eq!(assignment.assigned_to_agent_id, "agent-2");
            assert_eq!(assignment.status, AssignmentStatus::Assigned);
            assert_eq!(quote.assignment_history.len(), 1, "exactly one history entry");
        }
    }

    #[tokio::test]
    async fn reassigning_a_live_assignment_fails_without_duplicating_history() {
        let harness = harness();
        let quote_id = seed_assigned(&harness, "QT-B1", QuoteStatus::Draft).await;

        let rerun = harness.service.assign_many(&[quote_id.clone()], &template()).await;
        assert!(rerun.assigned.is_empty());
        assert!(matches!(
            rerun.failed[0].1,
            WorkflowError::Domain(DomainError::AlreadyAssigned { .. })
        ));

        let quote = harness.quotes.find_by_id(&quote_id).await.expect("read").expect("exists");
        assert_eq!(quote.assignment_history.len(), 1);
    }

    #[tokio::test]
    async fn rejected_assignments_can_be_superseded() {
        let harness = harness();
        let quote_id = seed_assigned(&harness, "QT-B2", QuoteStatus::Draft).await;

        harness
            .service
            .reject(&quote_id, "agent-2", "Noor Khalid", RejectionReason::CustomerUnreachable, None)
            .await
            .expect("reject");

        let outcome = harness.service.assign_many(&[quote_id.clone()], &template()).await;
        assert_eq!(outcome.assigned.len(), 1);

        let quote = harness.quotes.find_by_id(&quote_id).await.expect("read").expect("exists");
        let assignment = quote.assignment.expect("fresh assignment");
        assert_eq!(assignment.status, AssignmentStatus::Assigned);
        assert!(assignment.rejected_at.is_none());
        // assigned, rejected, assigned again
        assert_eq!(quote.assignment_history.len(), 3);
    }

    #[tokio::test]
    async fn claim_sets_claimed_at_no_earlier_than_assignment() {
        let harness = harness();
        let quote_id = seed_assigned(&harness, "QT-C1", QuoteStatus::Draft).await;

        let outcome =
            harness.service.claim(&quote_id, "agent-2", "Noor Khalid").await.expect("claim");
        let assignment = outcome.quote.assignment.expect("assignment");

        assert_eq!(assignment.status, AssignmentStatus::Claimed);
        let claimed_at = assignment.claimed_at.expect("claimed_at set");
        assert!(claimed_at >= assignment.assigned_at);
    }

    #[tokio::test]
    async fn second_claim_loses_cleanly() {
        let harness = harness();
        let quote_id = seed_assigned(&harness, "QT-C2", QuoteStatus::Draft).await;

        harness.service.claim(&quote_id, "agent-2", "Noor Khalid").await.expect("first claim");
        let error = harness
            .service
            .claim(&quote_id, "agent-3", "Fatima Yousif")
            .await
            .expect_err("second claim");
        assert!(matches!(
            error,
            WorkflowError::Domain(DomainError::AssignmentStateInvalid {
                status: AssignmentStatus::Claimed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn interleaved_claims_surface_a_version_conflict() {
        let harness = harness();
        let quote_id = seed_assigned(&harness, "QT-C3", QuoteStatus::Draft).await;

        // Both claimants read the same snapshot; the first commit bumps the
        // version, so the slower write must fail the guard.
        let snapshot =
            harness.quotes.find_by_id(&quote_id).await.expect("read").expect("exists");
        harness.service.claim(&quote_id, "agent-2", "Noor Khalid").await.expect("winner");

        let mut loser = snapshot.clone();
        loser.version += 1;
        if let Some(assignment) = loser.assignment.as_mut() {
            assignment.status = AssignmentStatus::Claimed;
            assignment.claimed_at = Some(Utc::now());
        }
        let conflict = harness
            .quotes
            .update_guarded(loser, snapshot.version)
            .await
            .expect_err("stale claim write");
        assert!(matches!(
            conflict,
            coverdesk_db::repositories::RepositoryError::Conflict { .. }
        ));

        let stored =
            harness.quotes.find_by_id(&quote_id).await.expect("read").expect("exists");
        let assignment = stored.assignment.expect("assignment");
        assert_eq!(assignment.status, AssignmentStatus::Claimed);
    }

    #[tokio::test]
    async fn rejection_records_reason_and_timestamp() {
        let harness = harness();
        let quote_id = seed_assigned(&harness, "QT-D1", QuoteStatus::Draft).await;
        harness.service.claim(&quote_id, "agent-2", "Noor Khalid").await.expect("claim");

        let outcome = harness
            .service
            .reject(
                &quote_id,
                "agent-2",
                "Noor Khalid",
                RejectionReason::PriceTooHigh,
                Some("customer found a cheaper provider".to_string()),
            )
            .await
            .expect("reject");

        let assignment = outcome.quote.assignment.expect("assignment");
        assert_eq!(assignment.status, AssignmentStatus::Rejected);
        assert_eq!(assignment.rejection_reason, Some(RejectionReason::PriceTooHigh));
        assert!(assignment.rejected_at.is_some());
    }

    #[tokio::test]
    async fn complete_requires_an_issued_quote_and_mutates_nothing_otherwise() {
        let harness = harness();
        let quote_id = seed_assigned(&harness, "QT-E1", QuoteStatus::PaymentPending).await;
        harness.service.claim(&quote_id, "agent-2", "Noor Khalid").await.expect("claim");

        let error = harness
            .service
            .complete(&quote_id, "agent-2", "Noor Khalid")
            .await
            .expect_err("not issued yet");
        assert!(matches!(
            error,
            WorkflowError::Domain(DomainError::QuoteNotIssued {
                status: QuoteStatus::PaymentPending
            })
        ));

        let untouched =
            harness.quotes.find_by_id(&quote_id).await.expect("read").expect("exists");
        let assignment = untouched.assignment.expect("assignment");
        assert_eq!(assignment.status, AssignmentStatus::Claimed);
        assert!(assignment.completed_at.is_none());
    }

    #[tokio::test]
    async fn complete_succeeds_on_issued_quotes() {
        let harness = harness();
        let quote_id = seed_assigned(&harness, "QT-E2", QuoteStatus::Issued).await;
        harness.service.claim(&quote_id, "agent-2", "Noor Khalid").await.expect("claim");

        let outcome = harness
            .service
            .complete(&quote_id, "agent-2", "Noor Khalid")
            .await
            .expect("complete");

        let assignment = outcome.quote.assignment.expect("assignment");
        assert_eq!(assignment.status, AssignmentStatus::Completed);
        assert!(assignment.completed_at.is_some());
    }

    #[tokio::test]
    async fn notes_accumulate_without_replacing_earlier_ones() {
        let harness = harness();
        let quote_id = seed_assigned(&harness, "QT-F1", QuoteStatus::Draft).await;

        harness
            .service
            .add_note(&quote_id, "left a voicemail", "agent-2", "Noor Khalid", None)
            .await
            .expect("first note");
        let outcome = harness
            .service
            .add_note(
                &quote_id,
                "call back tomorrow",
                "agent-2",
                "Noor Khalid",
                Some(Utc::now() + Duration::days(1)),
            )
            .await
            .expect("second note");

        let assignment = outcome.quote.assignment.expect("assignment");
        assert_eq!(assignment.agent_notes.len(), 2);
        assert_eq!(assignment.agent_notes[0].text, "left a voicemail");
        assert!(assignment.agent_notes[1].reminder_at.is_some());
    }

    #[tokio::test]
    async fn pool_view_classifies_urgency_from_assignment_age() {
        let harness = harness();
        let quote_id = seed_assigned(&harness, "QT-G1", QuoteStatus::Draft).await;

        let mut stored =
            harness.quotes.find_by_id(&quote_id).await.expect("read").expect("exists");
        let expected = stored.version;
        if let Some(assignment) = stored.assignment.as_mut() {
            assignment.assigned_at = Utc::now() - Duration::hours(25);
        }
        stored.version += 1;
        harness.quotes.update_guarded(stored, expected).await.expect("age the assignment");

        let pool = harness.service.pool_view(Utc::now()).await.expect("pool view");
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].urgency, Urgency::Urgent);
    }
}
