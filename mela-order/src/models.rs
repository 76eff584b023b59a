use serde::{Deserialize, Serialize};

use mela_core::payment::CheckoutParams;
use mela_core::registration::BookingConfirmation;
use mela_core::validation::FieldError;

use crate::fulfillment::TicketPass;

pub const PAYMENT_INIT_FAILED: &str = "Could not initiate payment.";
pub const PAYMENT_CANCELLED: &str = "Payment was cancelled.";
pub const PAYMENT_FAILED: &str = "Payment could not be completed.";
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong!";
pub const BOOKING_CONFIRMED: &str = "Booking confirmed successfully!";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient, dismissible notification for the visitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Where a single form submission currently stands.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    AwaitingOrder { amount: u32 },
    AwaitingPayment { params: CheckoutParams },
    Submitting,
    Confirmed {
        confirmation: BookingConfirmation,
        pass: TicketPass,
    },
    Error { notice: Notice },
}

impl CheckoutState {
    /// The submit control is disabled in these states.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            CheckoutState::AwaitingOrder { .. }
                | CheckoutState::AwaitingPayment { .. }
                | CheckoutState::Submitting
        )
    }

    pub fn is_editable(&self) -> bool {
        !self.is_in_flight()
    }

    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::AwaitingOrder { .. } => "awaiting_order",
            CheckoutState::AwaitingPayment { .. } => "awaiting_payment",
            CheckoutState::Submitting => "submitting",
            CheckoutState::Confirmed { .. } => "confirmed",
            CheckoutState::Error { .. } => "error",
        }
    }
}

/// How one submission ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Field rules failed; nothing left the form.
    Invalid(Vec<FieldError>),
    /// The paid total was not chargeable; nothing left the form.
    Rejected(Notice),
    Confirmed {
        confirmation: BookingConfirmation,
        pass: TicketPass,
        notice: Notice,
    },
    Failed(Notice),
}

impl SubmissionOutcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            SubmissionOutcome::Invalid(_) => None,
            SubmissionOutcome::Rejected(notice)
            | SubmissionOutcome::Failed(notice)
            | SubmissionOutcome::Confirmed { notice, .. } => Some(notice),
        }
    }
}
