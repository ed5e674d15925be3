pub mod audit;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod links;

pub use audit::{AuditAction, AuditEntry};
pub use domain::assignment::{
    classify_urgency, AgentNote, AssignmentAction, AssignmentHistoryEntry, AssignmentStatus,
    QuoteAssignment, RejectionReason, Urgency, REJECTION_REASONS,
};
pub use domain::customer::{Customer, TravelCriteria, Vehicle};
pub use domain::quote::{
    ApprovalState, ApprovalValidity, PlanId, Quote, QuoteId, QuoteSource, QuoteStatus,
    RiskFactors, SelectedPlan,
};
pub use domain::renewal::{renewal_due, ReminderKind, RenewalDue, RenewalPolicy, RenewalStatus};
pub use domain::user::{active_role, User, UserRole};
pub use errors::{DomainError, InterfaceError, WorkflowError};
pub use lifecycle::{
    LifecycleAction, LifecycleDefinition, LifecycleEngine, LifecycleEvent, MotorQuoteLifecycle,
    TransitionError, TransitionOutcome,
};
pub use links::{link_expired, PaymentLinkSigner, LINK_VALIDITY_DAYS};
