use async_trait::async_trait;
use mela_shared::Masked;
use serde::{Deserialize, Serialize};

use crate::CoreResult;

/// An order created with the gateway for a single checkout. Amount is in minor units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order for `amount` major currency units.
    async fn create_order(&self, amount: u32) -> CoreResult<PaymentOrder>;

    /// Check that a checkout confirmation really came from the gateway.
    fn verify_payment(&self, confirmation: &PaymentConfirmation) -> CoreResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prefill {
    pub name: String,
    pub email: Masked<String>,
    pub contact: Masked<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutTheme {
    pub color: String,
}

/// Options handed to the hosted checkout widget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutParams {
    pub key: String,
    pub amount: u64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: String,
    pub prefill: Prefill,
    pub theme: CheckoutTheme,
}

/// What the widget hands back after a successful payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentConfirmation {
    #[serde(rename = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(rename = "razorpay_order_id")]
    pub order_id: String,
    #[serde(rename = "razorpay_signature", default)]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Paid(PaymentConfirmation),
    Dismissed,
    Failed(String),
}

/// The hosted checkout, seen as one awaitable step.
///
/// Implementations resolve once the visitor pays, closes the modal, or the
/// widget reports an error. There is no timeout.
#[async_trait]
pub trait CheckoutWidget: Send + Sync {
    async fn open(&self, params: CheckoutParams) -> CheckoutOutcome;
}
