use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use uuid::Uuid;

use mela_catalog::{PriceQuote, PricingEngine, PricingMode};
use mela_core::booking::{BookingForm, BookingRequest};
use mela_core::payment::{
    CheckoutOutcome, CheckoutParams, CheckoutTheme, CheckoutWidget, PaymentConfirmation,
    PaymentGateway, PaymentOrder, Prefill,
};
use mela_core::registration::{RegistrationPayload, RegistrationService};
use mela_core::validation::{validate, ValidationRules};
use mela_shared::models::events::{
    now_timestamp, BookingConfirmedEvent, PaymentOrderCreatedEvent, PaymentUnreconciledEvent,
};

use crate::fulfillment::TicketPass;
use crate::models::{
    CheckoutState, Notice, SubmissionOutcome, BOOKING_CONFIRMED, PAYMENT_CANCELLED, PAYMENT_FAILED,
    PAYMENT_INIT_FAILED, SOMETHING_WENT_WRONG,
};

/// Merchant-facing checkout options. The key is the public gateway key.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub key_id: String,
    pub merchant_name: String,
    pub theme_color: String,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            merchant_name: "EOD Adventure Park".to_string(),
            theme_color: "#2C65EB".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("A submission is already being processed")]
    AlreadyProcessing,
}

/// Drives one booking form from submit to confirmation.
///
/// Each submission makes at most one order call, opens the checkout at most
/// once and posts at most one registration. Nothing is retried.
pub struct CheckoutOrchestrator {
    id: Uuid,
    settings: CheckoutSettings,
    pricing: Arc<PricingEngine>,
    rules: Arc<ValidationRules>,
    gateway: Arc<dyn PaymentGateway>,
    checkout: Arc<dyn CheckoutWidget>,
    registration: Arc<dyn RegistrationService>,
    state: watch::Sender<CheckoutState>,
    processing: AtomicBool,
}

struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CheckoutOrchestrator {
    pub fn new(
        settings: CheckoutSettings,
        pricing: Arc<PricingEngine>,
        rules: Arc<ValidationRules>,
        gateway: Arc<dyn PaymentGateway>,
        checkout: Arc<dyn CheckoutWidget>,
        registration: Arc<dyn RegistrationService>,
    ) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);
        Self {
            id: Uuid::new_v4(),
            settings,
            pricing,
            rules,
            gateway,
            checkout,
            registration,
            state,
            processing: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> CheckoutState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.state.subscribe()
    }

    /// Dismiss the confirmation or error and return to an empty form.
    pub fn reset(&self) -> Result<(), OrchestratorError> {
        if self.processing.load(Ordering::SeqCst) {
            return Err(OrchestratorError::AlreadyProcessing);
        }
        self.transition(CheckoutState::Idle);
        Ok(())
    }

    pub async fn submit(&self, form: &BookingForm) -> Result<SubmissionOutcome, OrchestratorError> {
        self.submit_as_of(form, Local::now().date_naive()).await
    }

    /// Submit with an explicit "today" for the visit date rule.
    pub async fn submit_as_of(
        &self,
        form: &BookingForm,
        today: NaiveDate,
    ) -> Result<SubmissionOutcome, OrchestratorError> {
        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(submission = %self.id, "Submission refused, one is already in flight");
            return Err(OrchestratorError::AlreadyProcessing);
        }
        let _guard = ProcessingGuard(&self.processing);

        self.transition(CheckoutState::Idle);

        let booking = match validate(form, today, &self.rules) {
            Ok(booking) => booking,
            Err(errors) => {
                tracing::warn!(submission = %self.id, fields = errors.len(), "Booking form failed validation");
                return Ok(SubmissionOutcome::Invalid(errors));
            }
        };

        let quote = self.pricing.quote(&booking);
        tracing::info!(
            submission = %self.id,
            booking_type = booking.booking_type().as_str(),
            adults = quote.adults,
            kids = quote.kids,
            total = quote.total,
            "Booking validated"
        );

        match self.pricing.mode() {
            PricingMode::Free => Ok(self.register(&booking, &quote, None).await),
            PricingMode::Paid => Ok(self.pay_and_register(&booking, &quote).await),
        }
    }

    async fn pay_and_register(&self, booking: &BookingRequest, quote: &PriceQuote) -> SubmissionOutcome {
        let amount = match self.pricing.ensure_chargeable(quote) {
            Ok(amount) => amount,
            Err(e) => {
                tracing::warn!(submission = %self.id, total = quote.total, "Booking not chargeable");
                return SubmissionOutcome::Rejected(Notice::error(e.to_string()));
            }
        };

        self.transition(CheckoutState::AwaitingOrder { amount });

        let order = match self.gateway.create_order(amount).await {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(submission = %self.id, amount, "Payment order creation failed: {}", e);
                return self.fail(PAYMENT_INIT_FAILED);
            }
        };

        let event = PaymentOrderCreatedEvent {
            submission_id: self.id,
            order_id: order.id.clone(),
            amount_minor: order.amount,
            currency: order.currency.clone(),
            timestamp: now_timestamp(),
        };
        tracing::info!(event = %event.to_json(), "Payment order created");

        let params = self.checkout_params(booking, &order);
        self.transition(CheckoutState::AwaitingPayment {
            params: params.clone(),
        });

        match self.checkout.open(params).await {
            CheckoutOutcome::Paid(confirmation) if confirmation.order_id == order.id => {
                if let Err(e) = self.gateway.verify_payment(&confirmation) {
                    tracing::error!(
                        submission = %self.id,
                        order_id = %order.id,
                        payment_id = %confirmation.payment_id,
                        "Payment verification failed: {}",
                        e
                    );
                    return self.fail(PAYMENT_FAILED);
                }
                tracing::info!(
                    submission = %self.id,
                    order_id = %order.id,
                    payment_id = %confirmation.payment_id,
                    "Checkout paid"
                );
                self.register(booking, quote, Some(confirmation)).await
            }
            CheckoutOutcome::Paid(confirmation) => {
                tracing::error!(
                    submission = %self.id,
                    expected = %order.id,
                    received = %confirmation.order_id,
                    "Checkout returned a payment for another order"
                );
                self.fail(PAYMENT_FAILED)
            }
            CheckoutOutcome::Dismissed => {
                tracing::info!(submission = %self.id, order_id = %order.id, "Checkout dismissed");
                self.fail(PAYMENT_CANCELLED)
            }
            CheckoutOutcome::Failed(reason) => {
                tracing::warn!(submission = %self.id, order_id = %order.id, "Checkout failed: {}", reason);
                self.fail(PAYMENT_FAILED)
            }
        }
    }

    async fn register(
        &self,
        booking: &BookingRequest,
        quote: &PriceQuote,
        payment: Option<PaymentConfirmation>,
    ) -> SubmissionOutcome {
        self.transition(CheckoutState::Submitting);

        let mut payload = RegistrationPayload::from_booking(booking, quote.total);
        if let Some(confirmation) = &payment {
            payload = payload.with_payment(confirmation);
        }

        let reply = match self.registration.register(&payload).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(submission = %self.id, "Registration request failed: {}", e);
                self.report_unreconciled(payment.as_ref(), quote.total, &e.to_string());
                return self.fail(SOMETHING_WENT_WRONG);
            }
        };

        let status = reply.status;
        let confirmation = match reply.into_confirmation() {
            Ok(confirmation) => confirmation,
            Err(message) => {
                tracing::error!(submission = %self.id, status, "Registration rejected: {}", message);
                self.report_unreconciled(payment.as_ref(), quote.total, &message);
                return self.fail(message);
            }
        };

        let pass = TicketPass::issue(&confirmation, booking, quote);

        let event = BookingConfirmedEvent {
            submission_id: self.id,
            ticket_id: confirmation.ticket_id.clone(),
            booking_type: booking.booking_type().as_str().to_string(),
            price: quote.total,
            payment_id: payment.as_ref().map(|p| p.payment_id.clone()),
            order_id: payment.as_ref().map(|p| p.order_id.clone()),
            timestamp: now_timestamp(),
        };
        tracing::info!(event = %event.to_json(), "Booking confirmed");

        self.transition(CheckoutState::Confirmed {
            confirmation: confirmation.clone(),
            pass: pass.clone(),
        });

        SubmissionOutcome::Confirmed {
            confirmation,
            pass,
            notice: Notice::success(BOOKING_CONFIRMED),
        }
    }

    fn checkout_params(&self, booking: &BookingRequest, order: &PaymentOrder) -> CheckoutParams {
        CheckoutParams {
            key: self.settings.key_id.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            name: self.settings.merchant_name.clone(),
            description: self.pricing.checkout_description(booking).to_string(),
            order_id: order.id.clone(),
            prefill: Prefill {
                name: booking.contact.name.clone(),
                email: booking.contact.email.clone(),
                contact: booking.contact.phone.clone(),
            },
            theme: CheckoutTheme {
                color: self.settings.theme_color.clone(),
            },
        }
    }

    /// Money was taken but no ticket exists. Left for manual reconciliation.
    fn report_unreconciled(&self, payment: Option<&PaymentConfirmation>, price: u32, reason: &str) {
        let Some(payment) = payment else {
            return;
        };
        let event = PaymentUnreconciledEvent {
            submission_id: self.id,
            payment_id: payment.payment_id.clone(),
            order_id: payment.order_id.clone(),
            price,
            reason: reason.to_string(),
            timestamp: now_timestamp(),
        };
        tracing::error!(event = %event.to_json(), "Payment captured without a registered booking");
    }

    fn fail(&self, message: impl Into<String>) -> SubmissionOutcome {
        let notice = Notice::error(message);
        self.transition(CheckoutState::Error {
            notice: notice.clone(),
        });
        SubmissionOutcome::Failed(notice)
    }

    fn transition(&self, next: CheckoutState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(
            submission = %self.id,
            from = previous.name(),
            to = self.state.borrow().name(),
            "Checkout state changed"
        );
    }
}
