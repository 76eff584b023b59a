use async_trait::async_trait;
use chrono::NaiveDate;
use mela_shared::Masked;
use serde::{Deserialize, Serialize};

use crate::booking::{Birthday, BookingRequest, BookingType, FoodOption, PackageType};
use crate::payment::PaymentConfirmation;
use crate::CoreResult;

pub const REGISTRATION_FAILED: &str = "Registration failed.";

/// Body posted to the remote registration service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
    pub booking_type: BookingType,
    pub adults_count: u32,
    pub kids_count: u32,
    pub food_option: FoodOption,
    pub without_food: bool,
    pub package_type: PackageType,
    pub exit_time: String,
    pub visit_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<Birthday>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_month: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_day: Option<u8>,
    pub price: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl RegistrationPayload {
    pub fn from_booking(booking: &BookingRequest, price: u32) -> Self {
        Self {
            name: booking.contact.name.clone(),
            email: booking.contact.email.clone(),
            phone: booking.contact.phone.clone(),
            booking_type: booking.booking_type(),
            adults_count: booking.adults(),
            kids_count: booking.kids(),
            food_option: booking.food,
            without_food: booking.food == FoodOption::WithoutFood,
            package_type: booking.package,
            exit_time: booking.exit_time.clone(),
            visit_date: booking.visit_date,
            birthday: booking.birthday,
            birth_month: booking.birthday.map(|b| b.month),
            birth_day: booking.birthday.map(|b| b.day),
            price,
            payment_id: None,
            order_id: None,
        }
    }

    pub fn with_payment(mut self, confirmation: &PaymentConfirmation) -> Self {
        self.payment_id = Some(confirmation.payment_id.clone());
        self.order_id = Some(confirmation.order_id.clone());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationData {
    #[serde(default)]
    pub booking: Option<serde_json::Value>,
}

/// Response shape of the registration service. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationBody {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<RegistrationData>,
    #[serde(default)]
    pub booking: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegistrationReply {
    pub status: u16,
    pub body: RegistrationBody,
}

impl RegistrationReply {
    pub fn is_http_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Both the HTTP status and the `success` flag must agree before a ticket counts.
    /// The error carries the message to show the visitor.
    pub fn into_confirmation(self) -> Result<BookingConfirmation, String> {
        if !self.is_http_success() || !self.body.success {
            return Err(self
                .body
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| REGISTRATION_FAILED.to_string()));
        }

        let booking = self
            .body
            .data
            .and_then(|data| data.booking)
            .or(self.body.booking)
            .ok_or_else(|| REGISTRATION_FAILED.to_string())?;

        BookingConfirmation::from_booking(booking).ok_or_else(|| REGISTRATION_FAILED.to_string())
    }
}

/// The booking as echoed back by the registration service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub ticket_id: String,
    pub qr_code_data: Option<String>,
    pub booking: serde_json::Value,
}

impl BookingConfirmation {
    pub fn from_booking(booking: serde_json::Value) -> Option<Self> {
        let ticket_id = ["ticketId", "ticket_id", "_id"]
            .iter()
            .find_map(|key| booking.get(*key).and_then(|v| v.as_str()))
            .filter(|id| !id.is_empty())?
            .to_string();

        let qr_code_data = booking
            .get("qrCodeData")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Some(Self {
            ticket_id,
            qr_code_data,
            booking,
        })
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.booking.get(key).and_then(|v| v.as_str())
    }
}

#[async_trait]
pub trait RegistrationService: Send + Sync {
    /// Post a booking. `Err` means the request never produced a response.
    async fn register(&self, payload: &RegistrationPayload) -> CoreResult<RegistrationReply>;
}
