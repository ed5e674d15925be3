//! Deterministic demo dataset for local development and the `seed` command.

use chrono::{Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;

use coverdesk_core::auth::password_digest;
use coverdesk_core::domain::assignment::{
    AssignmentAction, AssignmentHistoryEntry, AssignmentStatus, QuoteAssignment,
};
use coverdesk_core::domain::customer::{Customer, Vehicle};
use coverdesk_core::domain::discount::{allocate_for_staff, DiscountCode};
use coverdesk_core::domain::quote::{
    ApprovalState, Quote, QuoteId, QuoteSource, QuoteStatus, RiskFactors,
};
use coverdesk_core::domain::renewal::{RenewalPolicy, RenewalStatus};
use coverdesk_core::domain::user::{User, UserRole};

use crate::repositories::{
    DiscountCodeRepository, QuoteRepository, RenewalPolicyRepository, RepositoryError,
    SqlDiscountCodeRepository, SqlQuoteRepository, SqlRenewalPolicyRepository,
};
use crate::DbPool;

/// The fixed user table credentials are demo-only.
pub fn demo_users() -> Vec<User> {
    vec![
        User {
            id: "user-1".to_string(),
            username: "sara.ahmed".to_string(),
            display_name: "Sara Ahmed".to_string(),
            phone: "36007788".to_string(),
            roles: vec![UserRole::JuniorAgent],
            password_digest: password_digest("agent123"),
        },
        User {
            id: "user-2".to_string(),
            username: "khalid.rashid".to_string(),
            display_name: "Khalid Rashid".to_string(),
            phone: "36112233".to_string(),
            roles: vec![UserRole::JuniorAgent, UserRole::Supervisor],
            password_digest: password_digest("super123"),
        },
        User {
            id: "user-3".to_string(),
            username: "amal.jaber".to_string(),
            display_name: "Amal Jaber".to_string(),
            phone: "39887766".to_string(),
            roles: vec![UserRole::CreditControl],
            password_digest: password_digest("credit123"),
        },
        User {
            id: "user-4".to_string(),
            username: "dev".to_string(),
            display_name: "Platform Developer".to_string(),
            phone: "36990011".to_string(),
            roles: vec![UserRole::Developer, UserRole::Supervisor],
            password_digest: password_digest("dev123"),
        },
    ]
}

pub struct SeedDataset {
    pub quotes: Vec<Quote>,
    pub policies: Vec<RenewalPolicy>,
    pub discount_codes: Vec<DiscountCode>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub quotes: usize,
    pub policies: usize,
    pub discount_codes: usize,
}

fn demo_quote(
    id: &str,
    reference: &str,
    status: QuoteStatus,
    customer_name: &str,
    days_old: i64,
) -> Quote {
    let created_at = Utc::now() - Duration::days(days_old);
    Quote {
        id: QuoteId(id.to_string()),
        quote_reference: reference.to_string(),
        version: 1,
        status,
        source: QuoteSource::AgentPortal,
        customer: Customer {
            cpr: "870405111".to_string(),
            name: customer_name.to_string(),
            phone: "36005544".to_string(),
            email: "customer@example.com".to_string(),
            credit_eligible: true,
            credit_score: Some(620),
        },
        vehicle: Some(Vehicle {
            plate: "445566".to_string(),
            chassis: "WDB2030461A123456".to_string(),
            make: "Nissan".to_string(),
            model: "Patrol".to_string(),
            year: 2024,
            insured_value: Decimal::new(14_200_000, 3),
            is_financed: true,
            has_modifications: false,
        }),
        travel_criteria: None,
        risk_factors: RiskFactors::default(),
        selected_plan: None,
        assignment: None,
        assignment_history: Vec::new(),
        approval: ApprovalState::default(),
        agent_id: "user-1".to_string(),
        agent_name: "Sara Ahmed".to_string(),
        created_at,
        updated_at: created_at,
    }
}

impl SeedDataset {
    pub fn demo() -> Self {
        let mut draft = demo_quote("QT-2026-0001", "MTR-0001", QuoteStatus::Draft, "Ali Hasan", 1);
        draft.customer.credit_score = Some(590);

        let pending = demo_quote(
            "QT-2026-0002",
            "MTR-0002",
            QuoteStatus::PendingApproval,
            "Huda Mansoor",
            3,
        );

        let mut issued =
            demo_quote("QT-2026-0003", "MTR-0003", QuoteStatus::Issued, "Yousif Karim", 9);
        let assigned_at = Utc::now() - Duration::hours(26);
        let mut assignment =
            QuoteAssignment::new("user-1", "Sara Ahmed", "user-2", "Khalid Rashid", assigned_at);
        assignment.status = AssignmentStatus::Claimed;
        assignment.claimed_at = Some(assigned_at + Duration::hours(2));
        issued.assignment = Some(assignment);
        issued.assignment_history = vec![
            AssignmentHistoryEntry::record(
                AssignmentAction::Assigned,
                "user-2",
                "Khalid Rashid",
                "assigned from pool",
            ),
            AssignmentHistoryEntry::record(
                AssignmentAction::Claimed,
                "user-1",
                "Sara Ahmed",
                "claimed for follow-up",
            ),
        ];

        let today = Utc::now().date_naive();
        let policies = vec![
            demo_policy("POL-7001", "Maryam Isa", today + Duration::days(28)),
            demo_policy("POL-7002", "Ebrahim Saleh", today + Duration::days(12)),
            demo_policy("POL-7003", "Latifa Nasser", today - Duration::days(2)),
        ];

        let mut rng = StdRng::seed_from_u64(2026);
        let mut discount_codes = allocate_for_staff("user-1", 2026, &mut rng);
        discount_codes.extend(allocate_for_staff("user-2", 2026, &mut rng));

        Self { quotes: vec![draft, pending, issued], policies, discount_codes }
    }

    pub async fn apply(self, pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
        let quote_repo = SqlQuoteRepository::new(pool.clone());
        let policy_repo = SqlRenewalPolicyRepository::new(pool.clone());
        let discount_repo = SqlDiscountCodeRepository::new(pool.clone());

        let summary = SeedSummary {
            quotes: self.quotes.len(),
            policies: self.policies.len(),
            discount_codes: self.discount_codes.len(),
        };

        for quote in self.quotes {
            quote_repo.insert(quote).await?;
        }
        for policy in self.policies {
            policy_repo.save(policy).await?;
        }
        for code in self.discount_codes {
            discount_repo.save(code).await?;
        }

        Ok(summary)
    }
}

fn demo_policy(policy_number: &str, customer_name: &str, expiry_date: NaiveDate) -> RenewalPolicy {
    RenewalPolicy {
        policy_number: policy_number.to_string(),
        customer_name: customer_name.to_string(),
        phone: "39991234".to_string(),
        expiry_date,
        status: RenewalStatus::Pending,
        reminders_sent: Vec::new(),
        updated_at: Utc::now(),
    }
}
