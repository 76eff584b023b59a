use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use mela_core::payment::PaymentOrder;

use crate::error::AppError;
use crate::state::AppState;

pub const ORDER_CREATION_FAILED: &str = "Order creation failed";

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Major currency units.
    pub amount: u32,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/razorpay", post(create_order))
}

/// Server-side order creation for the hosted checkout. The key secret never leaves this process.
async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<PaymentOrder>, AppError> {
    // Malformed amounts fail the same way as a gateway refusal.
    let Json(req) = payload.map_err(|rejection| {
        tracing::warn!("Unreadable order request: {}", rejection.body_text());
        AppError::UpstreamError(ORDER_CREATION_FAILED.to_string())
    })?;

    match state.gateway.create_order(req.amount).await {
        Ok(order) => Ok(Json(order)),
        Err(e) => {
            tracing::error!(amount = req.amount, "Order creation failed: {}", e);
            Err(AppError::UpstreamError(ORDER_CREATION_FAILED.to_string()))
        }
    }
}
