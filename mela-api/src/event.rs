use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Serialize;

use mela_catalog::PriceQuote;
use mela_core::booking::BookingForm;
use mela_core::validation::{validate, FieldError};

use crate::error::AppError;
use crate::state::{AppState, EventInfo};

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub quote: PriceQuote,
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/event", get(event_info))
        .route("/v1/quote", post(quote))
}

async fn health() -> &'static str {
    "ok"
}

async fn event_info(State(state): State<AppState>) -> Json<EventInfo> {
    Json(state.event.as_ref().clone())
}

/// Live total for a partially filled form. Errors are reported, never enforced here.
async fn quote(
    State(state): State<AppState>,
    form: Result<Json<BookingForm>, JsonRejection>,
) -> Result<Json<QuoteResponse>, AppError> {
    let Json(form) = form?;
    let errors = validate(&form, Local::now().date_naive(), &state.rules)
        .err()
        .unwrap_or_default();

    Ok(Json(QuoteResponse {
        quote: state.pricing.quote_form(&form),
        valid: errors.is_empty(),
        errors,
    }))
}
