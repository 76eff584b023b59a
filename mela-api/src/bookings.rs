use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::watch;

use mela_core::booking::BookingForm;
use mela_core::payment::{CheckoutOutcome, CheckoutParams, PaymentConfirmation};
use mela_core::registration::BookingConfirmation;
use mela_core::validation::FieldError;
use mela_order::models::PAYMENT_CANCELLED;
use mela_order::{
    CheckoutOrchestrator, CheckoutState, Notice, OrchestratorError, SubmissionOutcome, TicketPass,
};

use crate::checkout::{HostedCheckout, PendingCheckout, SubmissionTask};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout: Option<CheckoutParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<BookingConfirmation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<TicketPass>,
}

impl BookingResponse {
    fn new(state: &'static str) -> Self {
        Self {
            state,
            error: None,
            notice: None,
            errors: Vec::new(),
            checkout: None,
            confirmation: None,
            pass: None,
        }
    }
}

type BookingReply = (StatusCode, Json<BookingResponse>);

enum Started {
    Finished(SubmissionOutcome),
    AwaitingPayment(CheckoutParams),
    Closed,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{order_id}/payment", post(payment_callback))
        .route("/v1/bookings/{order_id}/dismiss", post(dismiss_callback))
}

async fn create_booking(
    State(state): State<AppState>,
    form: Result<Json<BookingForm>, JsonRejection>,
) -> Result<BookingReply, AppError> {
    let Json(form) = form?;
    let (checkout, outcome_tx) = HostedCheckout::channel();
    let orchestrator = Arc::new(CheckoutOrchestrator::new(
        state.checkout.clone(),
        state.pricing.clone(),
        state.rules.clone(),
        state.gateway.clone(),
        Arc::new(checkout),
        state.registration.clone(),
    ));
    let mut states = orchestrator.subscribe();
    tracing::info!(submission = %orchestrator.id(), "Booking submission started");

    let mut submission: SubmissionTask = tokio::spawn(async move { orchestrator.submit(&form).await });

    let started = tokio::select! {
        finished = &mut submission => Started::Finished(joined(finished)?),
        params = checkout_opened(&mut states) => match params {
            Some(params) => Started::AwaitingPayment(params),
            None => Started::Closed,
        },
    };

    match started {
        Started::Finished(outcome) => Ok(respond(outcome)),
        Started::Closed => Ok(respond(joined(submission.await)?)),
        Started::AwaitingPayment(params) => {
            state.pending.insert(
                params.order_id.clone(),
                PendingCheckout {
                    outcome: outcome_tx,
                    submission,
                },
            );
            tracing::info!(order_id = %params.order_id, "Checkout handed to the browser");

            let mut body = BookingResponse::new("awaiting_payment");
            body.checkout = Some(params);
            Ok((StatusCode::ACCEPTED, Json(body)))
        }
    }
}

async fn payment_callback(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    confirmation: Result<Json<PaymentConfirmation>, JsonRejection>,
) -> Result<BookingReply, AppError> {
    let Json(confirmation) = confirmation?;
    if confirmation.order_id != order_id {
        return Err(AppError::ValidationError(
            "Payment does not belong to this order".to_string(),
        ));
    }

    let pending = take_pending(&state, &order_id)?;
    resolve(pending, CheckoutOutcome::Paid(confirmation)).await
}

async fn dismiss_callback(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<BookingReply, AppError> {
    let pending = take_pending(&state, &order_id)?;
    resolve(pending, CheckoutOutcome::Dismissed).await
}

fn take_pending(state: &AppState, order_id: &str) -> Result<PendingCheckout, AppError> {
    state
        .pending
        .take(order_id)
        .ok_or_else(|| AppError::NotFoundError(format!("No checkout pending for order {}", order_id)))
}

async fn resolve(pending: PendingCheckout, outcome: CheckoutOutcome) -> Result<BookingReply, AppError> {
    if pending.outcome.send(outcome).is_err() {
        tracing::warn!("Submission stopped waiting on the checkout before the callback arrived");
    }
    Ok(respond(joined(pending.submission.await)?))
}

async fn checkout_opened(states: &mut watch::Receiver<CheckoutState>) -> Option<CheckoutParams> {
    let current = states
        .wait_for(|s| matches!(s, CheckoutState::AwaitingPayment { .. }))
        .await
        .ok()?;

    match &*current {
        CheckoutState::AwaitingPayment { params } => Some(params.clone()),
        _ => None,
    }
}

fn joined(
    result: Result<Result<SubmissionOutcome, OrchestratorError>, tokio::task::JoinError>,
) -> Result<SubmissionOutcome, AppError> {
    match result {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(e)) => Err(AppError::ConflictError(e.to_string())),
        Err(e) => Err(AppError::InternalServerError(format!("submission task failed: {}", e))),
    }
}

fn respond(outcome: SubmissionOutcome) -> BookingReply {
    match outcome {
        SubmissionOutcome::Invalid(errors) => {
            let mut body = BookingResponse::new("invalid");
            body.error = Some("Please correct the highlighted fields".to_string());
            body.errors = errors;
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body))
        }
        SubmissionOutcome::Rejected(notice) => {
            (StatusCode::BAD_REQUEST, Json(error_body(notice)))
        }
        SubmissionOutcome::Confirmed {
            confirmation,
            pass,
            notice,
        } => {
            let mut body = BookingResponse::new("confirmed");
            body.notice = Some(notice);
            body.confirmation = Some(confirmation);
            body.pass = Some(pass);
            (StatusCode::OK, Json(body))
        }
        SubmissionOutcome::Failed(notice) => {
            // Closing the modal is the visitor's choice, not an upstream failure.
            let status = if notice.message == PAYMENT_CANCELLED {
                StatusCode::OK
            } else {
                StatusCode::BAD_GATEWAY
            };
            (status, Json(error_body(notice)))
        }
    }
}

fn error_body(notice: Notice) -> BookingResponse {
    let mut body = BookingResponse::new("error");
    body.error = Some(notice.message.clone());
    body.notice = Some(notice);
    body
}
