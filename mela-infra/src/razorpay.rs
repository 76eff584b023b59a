//! Razorpay Orders API over REST (no SDK dependency)

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{error, info};

use mela_core::payment::{PaymentConfirmation, PaymentGateway, PaymentOrder};
use mela_core::{CoreError, CoreResult};

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: u64,
    currency: &'a str,
    receipt: String,
}

/// Major currency units to the gateway's minor units (rupees to paise).
pub fn to_minor_units(amount: u32) -> u64 {
    u64::from(amount) * 100
}

pub fn receipt_id(unix_millis: i64) -> String {
    format!("receipt_order_{}", unix_millis)
}

#[derive(Clone)]
pub struct RazorpayGateway {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
    currency: String,
}

impl RazorpayGateway {
    pub fn new(api_base: &str, key_id: &str, key_secret: &str, currency: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
            currency: currency.to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, amount: u32) -> CoreResult<PaymentOrder> {
        let body = CreateOrderBody {
            amount: to_minor_units(amount),
            currency: &self.currency,
            receipt: receipt_id(chrono::Utc::now().timestamp_millis()),
        };

        let resp = self
            .client
            .post(format!("{}/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::GatewayError(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            error!("Razorpay create_order failed with {}: {}", status, detail);
            return Err(CoreError::GatewayError(format!("gateway responded {}", status)));
        }

        let order: PaymentOrder = resp
            .json()
            .await
            .map_err(|e| CoreError::GatewayError(format!("unreadable order: {}", e)))?;

        info!("Created Razorpay order {} for {} {}", order.id, order.amount, order.currency);
        Ok(order)
    }

    fn verify_payment(&self, confirmation: &PaymentConfirmation) -> CoreResult<()> {
        let signature = confirmation
            .signature
            .as_deref()
            .ok_or_else(|| CoreError::GatewayError("missing payment signature".to_string()))?;

        verify_payment_signature(
            &confirmation.order_id,
            &confirmation.payment_id,
            signature,
            &self.key_secret,
        )
        .map_err(|e| CoreError::GatewayError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("HMAC key error")]
    Key,
    #[error("Invalid signature hex")]
    Malformed,
    #[error("Payment signature mismatch")]
    Mismatch,
}

/// `HMAC-SHA256("<order_id>|<payment_id>", key_secret)`, hex encoded.
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &str,
) -> Result<(), SignatureError> {
    let sig_bytes = hex::decode(signature).map_err(|_| SignatureError::Malformed)?;

    let mac = payment_mac(order_id, payment_id, secret)?;
    // Constant-time comparison
    mac.verify_slice(&sig_bytes)
        .map_err(|_| SignatureError::Mismatch)
}

pub fn sign_payment(order_id: &str, payment_id: &str, secret: &str) -> Result<String, SignatureError> {
    let mac = payment_mac(order_id, payment_id, secret)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn payment_mac(order_id: &str, payment_id: &str, secret: &str) -> Result<Hmac<Sha256>, SignatureError> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Key)?;
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    Ok(mac)
}
