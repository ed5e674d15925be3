use serde::{Deserialize, Serialize};

use crate::domain::quote::QuoteStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Agent requests an installment exception for an ineligible customer.
    ExceptionRequested,
    /// Credit-control decision.
    ApprovalGranted,
    ApprovalRejected,
    /// Agent sends the customer a payment link for the selected plan.
    PaymentLinkSent,
    /// Agent collects payment directly (branch/cash), skipping the link.
    PaymentCollected,
    /// Customer-portal driven progress.
    LinkOpened,
    DocumentsUploaded,
    PaymentStarted,
    PaymentConfirmed,
    /// A field feeding pricing or risk changed while an approval decision
    /// was pending or on record.
    RiskProfileChanged,
    /// Renewal scanner noticed the issued policy is nearing expiry.
    ExpiryApproaching,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    RecordExceptionRequest,
    NotifyCreditControl,
    NotifyRequestingAgent,
    NotifyCustomer,
    DenormalizeSelectedPlan,
    ClearApprovalDecision,
    FlagForRenewal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: QuoteStatus,
    pub to: QuoteStatus,
    pub event: LifecycleEvent,
    pub actions: Vec<LifecycleAction>,
}
