use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use coverdesk_core::audit::{AuditAction, AuditEntry};
use coverdesk_core::domain::customer::{Customer, TravelCriteria, Vehicle};
use coverdesk_core::domain::quote::{
    ApprovalState, ApprovalValidity, Quote, QuoteId, QuoteSource, RiskFactors, SelectedPlan,
};
use coverdesk_core::errors::{DomainError, WorkflowError};
use coverdesk_core::lifecycle::{LifecycleEngine, LifecycleEvent, MotorQuoteLifecycle};
use coverdesk_core::links::PaymentLinkSigner;
use coverdesk_db::repositories::{AuditLogRepository, QuoteRepository, RepositoryError};
use coverdesk_notify::Notifier;

/// Result of a quote mutation. `side_effect_failures` lists audit or
/// notification writes that failed after the quote itself committed; the
/// state change stands, the caller learns the trail is incomplete.
#[derive(Debug)]
pub struct OperationOutcome {
    pub quote: Quote,
    pub side_effect_failures: Vec<WorkflowError>,
}

#[derive(Debug)]
pub struct IssuedPaymentLink {
    pub quote: Quote,
    pub url: String,
    pub side_effect_failures: Vec<WorkflowError>,
}

#[derive(Clone, Debug)]
pub struct NewQuoteInput {
    pub customer: Customer,
    pub vehicle: Option<Vehicle>,
    pub travel_criteria: Option<TravelCriteria>,
    pub risk_factors: RiskFactors,
    pub source: QuoteSource,
    pub agent_id: String,
    pub agent_name: String,
}

/// Field edits applied by the update path. Absent fields are untouched.
#[derive(Clone, Debug, Default)]
pub struct QuoteUpdate {
    pub customer: Option<Customer>,
    pub vehicle: Option<Vehicle>,
    pub travel_criteria: Option<TravelCriteria>,
    pub risk_factors: Option<RiskFactors>,
}

/// Externally driven progress reported by the customer portal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortalEvent {
    LinkOpened,
    DocumentsUploaded,
    PaymentStarted,
    PaymentConfirmed,
}

impl PortalEvent {
    fn lifecycle_event(self) -> LifecycleEvent {
        match self {
            Self::LinkOpened => LifecycleEvent::LinkOpened,
            Self::DocumentsUploaded => LifecycleEvent::DocumentsUploaded,
            Self::PaymentStarted => LifecycleEvent::PaymentStarted,
            Self::PaymentConfirmed => LifecycleEvent::PaymentConfirmed,
        }
    }
}

pub struct QuoteService {
    quotes: Arc<dyn QuoteRepository>,
    audit: Arc<dyn AuditLogRepository>,
    notifier: Arc<Notifier>,
    signer: PaymentLinkSigner,
    portal_base_url: String,
    engine: LifecycleEngine<MotorQuoteLifecycle>,
}

pub(crate) fn map_repo_error(error: RepositoryError) -> WorkflowError {
    match error {
        RepositoryError::Missing { quote_id } => WorkflowError::NotFound { quote_id },
        RepositoryError::Conflict { quote_id, expected } => {
            WorkflowError::VersionConflict { quote_id, expected }
        }
        RepositoryError::Database(source) => WorkflowError::StorageUnavailable(source.to_string()),
        RepositoryError::Decode(message) => WorkflowError::StorageUnavailable(message),
    }
}

impl QuoteService {
    pub fn new(
        quotes: Arc<dyn QuoteRepository>,
        audit: Arc<dyn AuditLogRepository>,
        notifier: Arc<Notifier>,
        signer: PaymentLinkSigner,
        portal_base_url: impl Into<String>,
    ) -> Self {
        Self {
            quotes,
            audit,
            notifier,
            signer,
            portal_base_url: portal_base_url.into(),
            engine: LifecycleEngine::default(),
        }
    }

    async fn load(&self, quote_id: &QuoteId) -> Result<Quote, WorkflowError> {
        self.quotes
            .find_by_id(quote_id)
            .await
            .map_err(map_repo_error)?
            .ok_or_else(|| WorkflowError::NotFound { quote_id: quote_id.0.clone() })
    }

    /// Bumps the version and writes through the guarded update, so a
    /// concurrent editor surfaces as a version conflict instead of a lost
    /// update.
    async fn persist(&self, mut quote: Quote) -> Result<Quote, WorkflowError> {
        let expected = quote.version;
        quote.version += 1;
        quote.updated_at = Utc::now();
        self.quotes.update_guarded(quote.clone(), expected).await.map_err(map_repo_error)?;
        Ok(quote)
    }

    async fn record_audit(
        &self,
        entry: AuditEntry,
        failures: &mut Vec<WorkflowError>,
    ) {
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

    pub async fn create_draft(
        &self,
        input: NewQuoteInput,
    ) -> Result<OperationOutcome, WorkflowError> {
        let now = Utc::now();
        let id = QuoteId(format!("QT-{}", Uuid::new_v4()));
        let reference =
            format!("MTR-{}", &Uuid::new_v4().simple().to_string()[..8].to_uppercase());

        let quote = Quote {
            id: id.clone(),
            quote_reference: reference,
            version: 1,
            status: self.engine.initial_status(),
            source: input.source,
            customer: input.customer,
            vehicle: input.vehicle,
            travel_criteria: input.travel_criteria,
            risk_factors: input.risk_factors,
            selected_plan: None,
            assignment: None,
            assignment_history: Vec::new(),
            approval: ApprovalState::default(),
            agent_id: input.agent_id.clone(),
            agent_name: input.agent_name.clone(),
            created_at: now,
            updated_at: now,
        };

        self.quotes.insert(quote.clone()).await.map_err(map_repo_error)?;

        let mut failures = Vec::new();
        self.record_audit(
            AuditEntry::new(id, AuditAction::QuoteCreated, &input.agent_id, "draft saved"),
            &mut failures,
        )
        .await;

        Ok(OperationOutcome { quote, side_effect_failures: failures })
    }

    /// Applies field edits. If a field feeding pricing or risk changes while
    /// an approval decision is pending or on record, the quote is forced
    /// back to draft and the decision is cleared; any other edit leaves
    /// status and approval untouched.
    pub async fn update(
        &self,
        quote_id: &QuoteId,
        update: QuoteUpdate,
        actor_id: &str,
    ) -> Result<OperationOutcome, WorkflowError> {
        let mut quote = self.load(quote_id).await?;
        let inputs_before = quote.approval_inputs();

        if let Some(customer) = update.customer {
            quote.customer = customer;
        }
        if let Some(vehicle) = update.vehicle {
            quote.vehicle = Some(vehicle);
        }
        if let Some(travel_criteria) = update.travel_criteria {
            quote.travel_criteria = Some(travel_criteria);
        }
        if let Some(risk_factors) = update.risk_factors {
            quote.risk_factors = risk_factors;
        }

        let mut failures = Vec::new();
        let invalidated = quote.status.carries_approval()
            && quote.approval_inputs() != inputs_before;
        if invalidated {
            let outcome =
                self.engine.apply(quote.status, LifecycleEvent::RiskProfileChanged)?;
            quote.status = outcome.to;
            quote.approval.invalidate();
        }

        let quote = self.persist(quote).await?;

        self.record_audit(
            AuditEntry::new(quote_id.clone(), AuditAction::QuoteUpdated, actor_id, "quote edited"),
            &mut failures,
        )
        .await;
        if invalidated {
            self.record_audit(
                AuditEntry::new(
                    quote_id.clone(),
                    AuditAction::ApprovalInvalidated,
                    actor_id,
                    "risk-relevant field changed; approval decision cleared",
                ),
                &mut failures,
            )
            .await;
        }

        Ok(OperationOutcome { quote, side_effect_failures: failures })
    }

    /// An exception only makes sense for customers who are not natively
    /// eligible for installments; for everyone else the plan can simply be
    /// sold in installments.
    pub async fn request_installment_exception(
        &self,
        quote_id: &QuoteId,
        actor_id: &str,
        justification: &str,
    ) -> Result<OperationOutcome, WorkflowError> {
        let mut quote = self.load(quote_id).await?;

        if quote.customer.installment_eligible() {
            return Err(WorkflowError::Domain(DomainError::InvariantViolation(
                "customer is natively eligible for installments".to_string(),
            )));
        }

        let outcome = self.engine.apply(quote.status, LifecycleEvent::ExceptionRequested)?;
        quote.status = outcome.to;
        quote.approval = ApprovalState {
            validity: ApprovalValidity::None,
            handled_at: None,
            handled_by: None,
            justification: Some(justification.to_string()),
        };

        let quote = self.persist(quote).await?;

        let mut failures = Vec::new();
        self.record_audit(
            AuditEntry::new(
                quote_id.clone(),
                AuditAction::ExceptionRequest,
                actor_id,
                format!("installment exception requested: {justification}"),
            ),
            &mut failures,
        )
        .await;

        Ok(OperationOutcome { quote, side_effect_failures: failures })
    }

    /// Credit-control decision. `agent_phone`, when provided, receives the
    /// outcome notification; a failed send is reported, not swallowed.
    pub async fn decide_approval(
        &self,
        quote_id: &QuoteId,
        granted: bool,
        decider_id: &str,
        agent_phone: Option<&str>,
    ) -> Result<OperationOutcome, WorkflowError> {
        let mut quote = self.load(quote_id).await?;

        let event = if granted {
            LifecycleEvent::ApprovalGranted
        } else {
            LifecycleEvent::ApprovalRejected
        };
        let outcome = self.engine.apply(quote.status, event)?;
        quote.status = outcome.to;
        quote.approval.validity = ApprovalValidity::Valid;
        quote.approval.handled_at = Some(Utc::now());
        quote.approval.handled_by = Some(decider_id.to_string());

        let quote = self.persist(quote).await?;

        let mut failures = Vec::new();
        let action =
            if granted { AuditAction::ApprovalGranted } else { AuditAction::ApprovalRejected };
        self.record_audit(
            AuditEntry::new(quote_id.clone(), action, decider_id, "credit-control decision"),
            &mut failures,
        )
        .await;

        if let Some(phone) = agent_phone {
            if let Err(error) = self
                .notifier
                .send_approval_decision(phone, &quote.agent_name, &quote.quote_reference, granted)
                .await
            {
                failures.push(WorkflowError::NotificationFailed(error.to_string()));
            }
        }

        Ok(OperationOutcome { quote, side_effect_failures: failures })
    }

    pub async fn send_payment_link(
        &self,
        quote_id: &QuoteId,
        plan: SelectedPlan,
        actor_id: &str,
    ) -> Result<IssuedPaymentLink, WorkflowError> {
        let mut quote = self.load(quote_id).await?;

        let outcome = self.engine.apply(quote.status, LifecycleEvent::PaymentLinkSent)?;
        quote.status = outcome.to;
        quote.selected_plan = Some(plan.clone());

        let quote = self.persist(quote).await?;

        let issued_at = quote.updated_at;
        let signature = self.signer.sign(&quote.id, &plan.plan_id, issued_at);
        let url = format!(
            "{}/pay/{}?plan={}&ts={}&sig={}",
            self.portal_base_url.trim_end_matches('/'),
            quote.id.0,
            plan.plan_id.0,
            issued_at.timestamp(),
            signature,
        );

        let mut failures = Vec::new();
        self.record_audit(
            AuditEntry::new(
                quote_id.clone(),
                AuditAction::PaymentLinkSent,
                actor_id,
                format!("payment link sent for plan {} ({})", plan.plan_name, plan.provider),
            ),
            &mut failures,
        )
        .await;

        if let Err(error) = self
            .notifier
            .send_payment_link(
                &quote.customer.phone,
                &quote.customer.name,
                &quote.quote_reference,
                &plan.plan_name,
                &url,
            )
            .await
        {
            failures.push(WorkflowError::NotificationFailed(error.to_string()));
        }

        Ok(IssuedPaymentLink { quote, url, side_effect_failures: failures })
    }

    pub async fn collect_payment(
        &self,
        quote_id: &QuoteId,
        plan: SelectedPlan,
        actor_id: &str,
    ) -> Result<OperationOutcome, WorkflowError> {
        let mut quote = self.load(quote_id).await?;

        let outcome = self.engine.apply(quote.status, LifecycleEvent::PaymentCollected)?;
        quote.status = outcome.to;
        quote.selected_plan = Some(plan.clone());

        let quote = self.persist(quote).await?;

        let mut failures = Vec::new();
        self.record_audit(
            AuditEntry::new(
                quote_id.clone(),
                AuditAction::PaymentCollected,
                actor_id,
                format!("payment collected for plan {}", plan.plan_name),
            ),
            &mut failures,
        )
        .await;

        Ok(OperationOutcome { quote, side_effect_failures: failures })
    }

    pub async fn record_portal_event(
        &self,
        quote_id: &QuoteId,
        event: PortalEvent,
    ) -> Result<OperationOutcome, WorkflowError> {
        let mut quote = self.load(quote_id).await?;

        let outcome = self.engine.apply(quote.status, event.lifecycle_event())?;
        let from = quote.status;
        quote.status = outcome.to;

        let quote = self.persist(quote).await?;

        let mut failures = Vec::new();
        self.record_audit(
            AuditEntry::new(
                quote_id.clone(),
                AuditAction::StatusChanged,
                "customer-portal",
                format!("portal event moved quote from {from:?} to {:?}", quote.status),
            ),
            &mut failures,
        )
        .await;

        Ok(OperationOutcome { quote, side_effect_failures: failures })
    }

    pub async fn mark_expiring(
        &self,
        quote_id: &QuoteId,
        actor_id: &str,
    ) -> Result<OperationOutcome, WorkflowError> {
        let mut quote = self.load(quote_id).await?;

        let outcome = self.engine.apply(quote.status, LifecycleEvent::ExpiryApproaching)?;
        quote.status = outcome.to;

        let quote = self.persist(quote).await?;

        let mut failures = Vec::new();
        self.record_audit(
            AuditEntry::new(
                quote_id.clone(),
                AuditAction::StatusChanged,
                actor_id,
                "policy nearing expiry; quote flagged for renewal",
            ),
            &mut failures,
        )
        .await;

        Ok(OperationOutcome { quote, side_effect_failures: failures })
    }
}
