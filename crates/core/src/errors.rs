use thiserror::Error;

use crate::domain::assignment::AssignmentStatus;
use crate::domain::quote::QuoteStatus;
use crate::lifecycle::TransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("quote has no assignment to act on")]
    AssignmentMissing,
    #[error("assignment is {status:?}, operation requires {required:?}")]
    AssignmentStateInvalid { status: AssignmentStatus, required: AssignmentStatus },
    #[error("quote already has an active assignment ({status:?})")]
    AlreadyAssigned { status: AssignmentStatus },
    #[error("quote must be issued before completing its assignment (status is {status:?})")]
    QuoteNotIssued { status: QuoteStatus },
    #[error("discount code `{code}` has already been used")]
    DiscountCodeAlreadyUsed { code: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("quote `{quote_id}` not found")]
    NotFound { quote_id: String },
    #[error("quote `{quote_id}` was modified concurrently (expected version {expected})")]
    VersionConflict { quote_id: String, expected: u64 },
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("audit trail unavailable: {0}")]
    AuditUnavailable(String),
    #[error("notification failed: {0}")]
    NotificationFailed(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<TransitionError> for WorkflowError {
    fn from(value: TransitionError) -> Self {
        Self::Domain(DomainError::Transition(value))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested record could not be found.",
            Self::Conflict { .. } => {
                "The record was changed by someone else. Reload it and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl WorkflowError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<WorkflowError> for InterfaceError {
    fn from(value: WorkflowError) -> Self {
        match value {
            WorkflowError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            WorkflowError::NotFound { quote_id } => Self::NotFound {
                message: format!("quote `{quote_id}` not found"),
                correlation_id: "unassigned".to_owned(),
            },
            WorkflowError::VersionConflict { quote_id, expected } => Self::Conflict {
                message: format!(
                    "quote `{quote_id}` was modified concurrently (expected version {expected})"
                ),
                correlation_id: "unassigned".to_owned(),
            },
            WorkflowError::StorageUnavailable(message)
            | WorkflowError::AuditUnavailable(message)
            | WorkflowError::NotificationFailed(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            WorkflowError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::quote::QuoteStatus;
    use crate::errors::{DomainError, InterfaceError, WorkflowError};

    #[test]
    fn domain_errors_map_to_bad_request_with_correlation_id() {
        let interface = WorkflowError::from(DomainError::QuoteNotIssued {
            status: QuoteStatus::Draft,
        })
        .into_interface("req-7");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref correlation_id, .. } if correlation_id == "req-7"
        ));
    }

    #[test]
    fn conflict_and_not_found_stay_distinguishable() {
        let conflict = WorkflowError::VersionConflict {
            quote_id: "QT-1".to_string(),
            expected: 3,
        }
        .into_interface("req-8");
        assert!(matches!(conflict, InterfaceError::Conflict { .. }));
        assert_eq!(
            conflict.user_message(),
            "The record was changed by someone else. Reload it and try again."
        );

        let missing =
            WorkflowError::NotFound { quote_id: "QT-2".to_string() }.into_interface("req-9");
        assert!(matches!(missing, InterfaceError::NotFound { .. }));
    }

    #[test]
    fn infrastructure_failures_map_to_service_unavailable() {
        for error in [
            WorkflowError::StorageUnavailable("database lock timeout".to_owned()),
            WorkflowError::AuditUnavailable("audit insert failed".to_owned()),
            WorkflowError::NotificationFailed("messaging API timeout".to_owned()),
        ] {
            let interface = error.into_interface("req-10");
            assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        }
    }
}
