use thiserror::Error;

use crate::domain::quote::QuoteStatus;
use crate::lifecycle::states::{LifecycleAction, LifecycleEvent, TransitionOutcome};

/// A lifecycle is a closed transition table; nothing outside the engine may
/// assign a quote status directly.
pub trait LifecycleDefinition {
    fn initial_status(&self) -> QuoteStatus;
    fn transition(
        &self,
        current: QuoteStatus,
        event: LifecycleEvent,
    ) -> Result<TransitionOutcome, TransitionError>;
}

#[derive(Clone, Debug, Default)]
pub struct MotorQuoteLifecycle;

impl LifecycleDefinition for MotorQuoteLifecycle {
    fn initial_status(&self) -> QuoteStatus {
        QuoteStatus::Draft
    }

    fn transition(
        &self,
        current: QuoteStatus,
        event: LifecycleEvent,
    ) -> Result<TransitionOutcome, TransitionError> {
        transition_motor_quote(current, event)
    }
}

pub struct LifecycleEngine<D> {
    definition: D,
}

impl<D> LifecycleEngine<D>
where
    D: LifecycleDefinition,
{
    pub fn new(definition: D) -> Self {
        Self { definition }
    }

    pub fn initial_status(&self) -> QuoteStatus {
        self.definition.initial_status()
    }

    pub fn apply(
        &self,
        current: QuoteStatus,
        event: LifecycleEvent,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.definition.transition(current, event)
    }
}

impl Default for LifecycleEngine<MotorQuoteLifecycle> {
    fn default() -> Self {
        Self::new(MotorQuoteLifecycle)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {status:?} on event {event:?}")]
    InvalidTransition { status: QuoteStatus, event: LifecycleEvent },
}

fn transition_motor_quote(
    current: QuoteStatus,
    event: LifecycleEvent,
) -> Result<TransitionOutcome, TransitionError> {
    use LifecycleAction::{
        ClearApprovalDecision, DenormalizeSelectedPlan, FlagForRenewal, NotifyCreditControl,
        NotifyCustomer, NotifyRequestingAgent, RecordExceptionRequest,
    };

    let (to, actions) = match (current, event) {
        (QuoteStatus::Draft, LifecycleEvent::ExceptionRequested) => {
            (QuoteStatus::PendingApproval, vec![RecordExceptionRequest, NotifyCreditControl])
        }
        (QuoteStatus::PendingApproval, LifecycleEvent::ApprovalGranted) => {
            (QuoteStatus::ApprovalGranted, vec![NotifyRequestingAgent])
        }
        (QuoteStatus::PendingApproval, LifecycleEvent::ApprovalRejected) => {
            (QuoteStatus::ApprovalRejected, vec![NotifyRequestingAgent])
        }
        (QuoteStatus::Draft | QuoteStatus::ApprovalGranted, LifecycleEvent::PaymentLinkSent) => {
            (QuoteStatus::LinkSent, vec![DenormalizeSelectedPlan, NotifyCustomer])
        }
        (QuoteStatus::Draft | QuoteStatus::ApprovalGranted, LifecycleEvent::PaymentCollected) => {
            (QuoteStatus::PaymentPending, vec![DenormalizeSelectedPlan])
        }
        (QuoteStatus::LinkSent, LifecycleEvent::LinkOpened) => {
            (QuoteStatus::LinkClicked, Vec::new())
        }
        (QuoteStatus::LinkClicked, LifecycleEvent::DocumentsUploaded) => {
            (QuoteStatus::DocsUploaded, Vec::new())
        }
        (QuoteStatus::DocsUploaded, LifecycleEvent::PaymentStarted) => {
            (QuoteStatus::PaymentPending, Vec::new())
        }
        (QuoteStatus::PaymentPending, LifecycleEvent::PaymentConfirmed) => {
            (QuoteStatus::Issued, Vec::new())
        }
        (
            QuoteStatus::PendingApproval
            | QuoteStatus::ApprovalGranted
            | QuoteStatus::ApprovalRejected,
            LifecycleEvent::RiskProfileChanged,
        ) => (QuoteStatus::Draft, vec![ClearApprovalDecision]),
        (QuoteStatus::Issued, LifecycleEvent::ExpiryApproaching) => {
            (QuoteStatus::Expiring, vec![FlagForRenewal])
        }
        _ => {
            return Err(TransitionError::InvalidTransition { status: current, event });
        }
    };

    Ok(TransitionOutcome { from: current, to, event, actions })
}
