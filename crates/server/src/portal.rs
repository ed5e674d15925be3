//! Customer-portal callbacks.
//!
//! The portal is the externally driven half of the quote lifecycle: the
//! customer opens a signed payment link, uploads documents, and pays. Every
//! route verifies the link signature before feeding the event to the
//! workflow, so quote identifiers arriving from outside are never trusted
//! bare.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use coverdesk_core::domain::quote::{PlanId, QuoteId};
use coverdesk_core::errors::{InterfaceError, WorkflowError};
use coverdesk_core::links::link_expired;
use coverdesk_workflow::PortalEvent;

use crate::bootstrap::Services;

#[derive(Clone)]
pub struct PortalState {
    services: Services,
}

impl PortalState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkToken {
    plan: String,
    ts: i64,
    sig: String,
}

pub fn router(state: PortalState) -> Router {
    Router::new()
        .route("/portal/pay/{quote_id}", get(open_payment_link))
        .route("/portal/quotes/{quote_id}/documents", post(upload_documents))
        .route("/portal/quotes/{quote_id}/payment", post(start_payment))
        .route("/portal/quotes/{quote_id}/payment/confirm", post(confirm_payment))
        .with_state(state)
}

fn verify_token(
    state: &PortalState,
    quote_id: &QuoteId,
    token: &LinkToken,
) -> Result<(), (StatusCode, Json<Value>)> {
    let issued_at = DateTime::<Utc>::from_timestamp(token.ts, 0).ok_or_else(|| {
        (StatusCode::FORBIDDEN, Json(json!({ "error": "invalid payment link" })))
    })?;

    let plan_id = PlanId(token.plan.clone());
    if !state.services.signer.verify(quote_id, &plan_id, issued_at, &token.sig) {
        return Err((StatusCode::FORBIDDEN, Json(json!({ "error": "invalid payment link" }))));
    }
    if link_expired(issued_at, Utc::now()) {
        return Err((StatusCode::FORBIDDEN, Json(json!({ "error": "payment link expired" }))));
    }

    Ok(())
}

fn error_response(error: WorkflowError) -> (StatusCode, Json<Value>) {
    let correlation_id = Uuid::new_v4().to_string();
    warn!(
        event_name = "portal.request.failed",
        correlation_id = %correlation_id,
        error = %error,
        "portal request failed"
    );

    let interface = error.into_interface(correlation_id.clone());
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(json!({
            "error": interface.user_message(),
            "correlation_id": correlation_id,
        })),
    )
}

async fn apply_portal_event(
    state: &PortalState,
    quote_id: QuoteId,
    event: PortalEvent,
) -> (StatusCode, Json<Value>) {
    match state.services.quotes.record_portal_event(&quote_id, event).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "quote_reference": outcome.quote.quote_reference,
                "status": format!("{:?}", outcome.quote.status),
            })),
        ),
        Err(error) => error_response(error),
    }
}

pub async fn open_payment_link(
    State(state): State<PortalState>,
    Path(quote_id): Path<String>,
    Query(token): Query<LinkToken>,
) -> (StatusCode, Json<Value>) {
    let quote_id = QuoteId(quote_id);
    if let Err(response) = verify_token(&state, &quote_id, &token) {
        return response;
    }
    apply_portal_event(&state, quote_id, PortalEvent::LinkOpened).await
}

pub async fn upload_documents(
    State(state): State<PortalState>,
    Path(quote_id): Path<String>,
    Json(token): Json<LinkToken>,
) -> (StatusCode, Json<Value>) {
    let quote_id = QuoteId(quote_id);
    if let Err(response) = verify_token(&state, &quote_id, &token) {
        return response;
    }
    apply_portal_event(&state, quote_id, PortalEvent::DocumentsUploaded).await
}

pub async fn start_payment(
    State(state): State<PortalState>,
    Path(quote_id): Path<String>,
    Json(token): Json<LinkToken>,
) -> (StatusCode, Json<Value>) {
    let quote_id = QuoteId(quote_id);
    if let Err(response) = verify_token(&state, &quote_id, &token) {
        return response;
    }
    apply_portal_event(&state, quote_id, PortalEvent::PaymentStarted).await
}

pub async fn confirm_payment(
    State(state): State<PortalState>,
    Path(quote_id): Path<String>,
    Json(token): Json<LinkToken>,
) -> (StatusCode, Json<Value>) {
    let quote_id = QuoteId(quote_id);
    if let Err(response) = verify_token(&state, &quote_id, &token) {
        return response;
    }
    apply_portal_event(&state, quote_id, PortalEvent::PaymentConfirmed).await
}
