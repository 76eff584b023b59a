use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentOrderCreatedEvent {
    pub submission_id: Uuid,
    pub order_id: String,
    pub amount_minor: u64,
    pub currency: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub submission_id: Uuid,
    pub ticket_id: String,
    pub booking_type: String,
    pub price: u32,
    pub payment_id: Option<String>,
    pub order_id: Option<String>,
    pub timestamp: i64,
}

/// Payment captured by the gateway but the registration service never issued a ticket.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentUnreconciledEvent {
    pub submission_id: Uuid,
    pub payment_id: String,
    pub order_id: String,
    pub price: u32,
    pub reason: String,
    pub timestamp: i64,
}

impl PaymentOrderCreatedEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl BookingConfirmedEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl PaymentUnreconciledEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
