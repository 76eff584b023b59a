use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use mela_catalog::PriceQuote;
use mela_core::booking::BookingRequest;
use mela_core::registration::BookingConfirmation;

/// The confirmation pass shown once after a booking is registered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TicketPass {
    pub ticket_id: String,
    pub name: String,
    pub visit_date: NaiveDate,
    pub visit_date_label: String,
    pub exit_time: String,
    pub booking_type: String,
    pub adults: u32,
    pub kids: u32,
    pub price: u32,
    pub price_display: String,
    pub qr_code_data: String,
}

impl TicketPass {
    pub fn issue(
        confirmation: &BookingConfirmation,
        booking: &BookingRequest,
        quote: &PriceQuote,
    ) -> Self {
        let name = confirmation
            .field("name")
            .map(str::to_string)
            .unwrap_or_else(|| booking.contact.name.clone());

        // Prefer the code issued by the registration service.
        let qr_code_data = confirmation.qr_code_data.clone().unwrap_or_else(|| {
            qr_payload(
                &confirmation.ticket_id,
                &name,
                booking.visit_date,
                booking.contact.phone_suffix(),
            )
        });

        Self {
            ticket_id: confirmation.ticket_id.clone(),
            name,
            visit_date: booking.visit_date,
            visit_date_label: format_visit_date(booking.visit_date),
            exit_time: booking.exit_time.clone(),
            booking_type: booking.booking_type().as_str().to_string(),
            adults: booking.adults(),
            kids: booking.kids(),
            price: quote.total,
            price_display: quote.display.clone(),
            qr_code_data,
        }
    }
}

/// e.g. `Sat, Jun 21, 2025`
pub fn format_visit_date(date: NaiveDate) -> String {
    date.format("%a, %b %-d, %Y").to_string()
}

/// Ticket id plus the last four phone digits, checked at the gate.
pub fn validation_key(ticket_id: &str, phone_suffix: &str) -> String {
    format!("{}-{}", ticket_id, phone_suffix)
}

pub fn qr_payload(ticket_id: &str, name: &str, visit_date: NaiveDate, phone_suffix: &str) -> String {
    serde_json::json!({
        "ticketId": ticket_id,
        "name": name,
        "visitDate": visit_date,
        "validationKey": validation_key(ticket_id, phone_suffix),
    })
    .to_string()
}
