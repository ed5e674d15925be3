use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::assignment::{AssignmentHistoryEntry, QuoteAssignment};
use crate::domain::customer::{Customer, TravelCriteria, Vehicle};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    PendingApproval,
    ApprovalGranted,
    ApprovalRejected,
    LinkSent,
    LinkClicked,
    DocsUploaded,
    PaymentPending,
    Issued,
    Expiring,
}

impl QuoteStatus {
    /// Statuses in which a credit-control decision is pending or on record;
    /// risk-relevant edits in these statuses invalidate the decision.
    pub fn carries_approval(self) -> bool {
        matches!(self, Self::PendingApproval | Self::ApprovalGranted | Self::ApprovalRejected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    AgentPortal,
    CustomerPortal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub age_under_24: bool,
    pub license_under_1_year: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalValidity {
    #[default]
    None,
    Valid,
    Invalidated,
}

/// Credit-control decision state. `handled_at` is cleared when a decision is
/// invalidated so "no timestamp" always reads as "no live decision".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalState {
    pub validity: ApprovalValidity,
    pub handled_at: Option<DateTime<Utc>>,
    pub handled_by: Option<String>,
    pub justification: Option<String>,
}

impl ApprovalState {
    pub fn invalidate(&mut self) {
        self.validity = ApprovalValidity::Invalidated;
        self.handled_at = None;
        self.handled_by = None;
    }
}

/// Denormalized copy of the plan chosen at link-send time. May go stale if
/// the provider's plan list regenerates; that is accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedPlan {
    pub plan_id: PlanId,
    pub provider: String,
    pub plan_name: String,
    pub annual_premium: Decimal,
    pub installments_requested: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub quote_reference: String,
    /// Optimistic-concurrency token; bumped on every persisted write.
    pub version: u64,
    pub status: QuoteStatus,
    pub source: QuoteSource,
    pub customer: Customer,
    pub vehicle: Option<Vehicle>,
    pub travel_criteria: Option<TravelCriteria>,
    pub risk_factors: RiskFactors,
    pub selected_plan: Option<SelectedPlan>,
    pub assignment: Option<QuoteAssignment>,
    pub assignment_history: Vec<AssignmentHistoryEntry>,
    pub approval: ApprovalState,
    pub agent_id: String,
    pub agent_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The inputs a credit-control decision is priced against. If any of these
/// change after the decision, it no longer applies.
#[derive(Clone, Debug, PartialEq)]
pub struct ApprovalInputs {
    pub insured_value: Option<Decimal>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub risk_factors: RiskFactors,
}

impl Quote {
    pub fn approval_inputs(&self) -> ApprovalInputs {
        ApprovalInputs {
            insured_value: self.vehicle.as_ref().map(|vehicle| vehicle.insured_value),
            make: self.vehicle.as_ref().map(|vehicle| vehicle.make.clone()),
            model: self.vehicle.as_ref().map(|vehicle| vehicle.model.clone()),
            risk_factors: self.risk_factors,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::customer::{Customer, Vehicle};
    use crate::domain::quote::{
        ApprovalState, ApprovalValidity, Quote, QuoteId, QuoteSource, QuoteStatus, RiskFactors,
    };

    fn quote(status: QuoteStatus) -> Quote {
        let now = Utc::now();
        Quote {
            id: QuoteId("QT-2026-0001".to_string()),
            quote_reference: "MTR-0001".to_string(),
            version: 1,
            status,
            source: QuoteSource::AgentPortal,
            customer: Customer {
                cpr: "900112233".to_string(),
                name: "Ali Hasan".to_string(),
                phone: "36007788".to_string(),
                email: "ali@example.com".to_string(),
                credit_eligible: true,
                credit_score: Some(610),
            },
            vehicle: Some(Vehicle {
                plate: "112233".to_string(),
                chassis: "JTDBT923771234567".to_string(),
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                year: 2023,
                insured_value: Decimal::new(8_500_000, 3),
                is_financed: false,
                has_modifications: false,
            }),
            travel_criteria: None,
            risk_factors: RiskFactors::default(),
            selected_plan: None,
            assignment: None,
            assignment_history: Vec::new(),
            approval: ApprovalState::default(),
            agent_id: "agent-1".to_string(),
            agent_name: "Sara Ahmed".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn approval_bearing_statuses() {
        assert!(QuoteStatus::PendingApproval.carries_approval());
        assert!(QuoteStatus::ApprovalGranted.carries_approval());
        assert!(QuoteStatus::ApprovalRejected.carries_approval());
        assert!(!QuoteStatus::Draft.carries_approval());
        assert!(!QuoteStatus::Issued.carries_approval());
    }

    #[test]
    fn approval_inputs_ignore_contact_details() {
        let base = quote(QuoteStatus::ApprovalGranted);
        let mut contact_edit = base.clone();
        contact_edit.customer.email = "ali.hasan@example.com".to_string();
        assert_eq!(base.approval_inputs(), contact_edit.approval_inputs());

        let mut value_edit = base.clone();
        if let Some(vehicle) = value_edit.vehicle.as_mut() {
            vehicle.insured_value = Decimal::new(9_000_000, 3);
        }
        assert_ne!(base.approval_inputs(), value_edit.approval_inputs());
    }

    #[test]
    fn invalidate_clears_decision_timestamp() {
        let mut approval = ApprovalState {
            validity: ApprovalValidity::Valid,
            handled_at: Some(Utc::now()),
            handled_by: Some("credit-1".to_string()),
            justification: Some("loyal customer".to_string()),
        };
        approval.invalidate();
        assert_eq!(approval.validity, ApprovalValidity::Invalidated);
        assert!(approval.handled_at.is_none());
        assert!(approval.handled_by.is_none());
    }
}
