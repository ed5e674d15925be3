//! Application services composing the domain engine, the repositories, and
//! the messaging adapter. Every status change goes through the lifecycle
//! engine, every write is version-guarded, and side-effect failures (audit,
//! notification) are reported to the caller instead of swallowed.

pub mod assignments;
pub mod export;
pub mod quotes;
pub mod renewals;

pub use assignments::{AssignmentService, AssignmentTemplate, BatchAssignOutcome, PoolEntry};
pub use export::{quotes_to_csv, ExportError};
pub use quotes::{
    IssuedPaymentLink, NewQuoteInput, OperationOutcome, PortalEvent, QuoteService, QuoteUpdate,
};
pub use renewals::{RenewalService, ScanReport};

#[cfg(test)]
pub(crate) mod testing {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use coverdesk_core::domain::customer::{Customer, Vehicle};
    use coverdesk_core::domain::quote::{
        ApprovalState, Quote, QuoteId, QuoteSource, QuoteStatus, RiskFactors,
    };

    pub fn sample_quote(id: &str, status: QuoteStatus) -> Quote {
        let now = Utc::now();
        Quote {
            id: QuoteId(id.to_string()),
            quote_reference: format!("MTR-{id}"),
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
}
