use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use mela_catalog::{PricingEngine, PricingMode, RateTable};
use mela_core::payment::PaymentGateway;
use mela_core::registration::RegistrationService;
use mela_core::validation::ValidationRules;
use mela_infra::app_config::Config;
use mela_order::CheckoutSettings;

use crate::checkout::PendingCheckouts;

/// What the booking page needs to render the form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    pub name: String,
    pub mode: PricingMode,
    pub currency: String,
    pub currency_symbol: String,
    pub rates: RateTable,
    pub exit_times: Vec<String>,
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct AppState {
    pub pricing: Arc<PricingEngine>,
    pub rules: Arc<ValidationRules>,
    pub checkout: CheckoutSettings,
    pub event: Arc<EventInfo>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub registration: Arc<dyn RegistrationService>,
    pub pending: Arc<PendingCheckouts>,
}

impl AppState {
    pub fn from_config(
        config: &Config,
        gateway: Arc<dyn PaymentGateway>,
        registration: Arc<dyn RegistrationService>,
    ) -> Self {
        let pricing = config.pricing_config();
        let rules = config.validation_rules();

        let event = EventInfo {
            name: config.event.name.clone(),
            mode: pricing.mode,
            currency: config.event.currency.clone(),
            currency_symbol: pricing.currency_symbol.clone(),
            rates: pricing.rates,
            exit_times: rules.exit_times.clone(),
            window_start: rules.event_window.start,
            window_end: rules.event_window.end,
        };

        Self {
            pricing: Arc::new(PricingEngine::new(pricing)),
            rules: Arc::new(rules),
            checkout: config.checkout_settings(),
            event: Arc::new(event),
            gateway,
            registration,
            pending: Arc::new(PendingCheckouts::new(Duration::from_secs(
                config.event.checkout_abandon_after_secs,
            ))),
        }
    }
}
