use chrono::NaiveDate;
use serde::Deserialize;
use std::env;

use mela_catalog::{PricingConfig, PricingMode, RateTable};
use mela_core::validation::{EventWindow, ValidationRules};
use mela_order::CheckoutSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub event: EventConfig,
    #[serde(default)]
    pub rates: RateTable,
    #[serde(default)]
    pub validation: ValidationConfig,
    pub razorpay: RazorpayConfig,
    pub registration: RegistrationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventConfig {
    pub name: String,
    #[serde(default)]
    pub mode: PricingMode,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_theme_color")]
    pub theme_color: String,
    #[serde(default = "default_exit_times")]
    pub exit_times: Vec<String>,
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
    /// Seconds a started checkout may wait for the widget callback.
    #[serde(default = "default_abandon_after_secs")]
    pub checkout_abandon_after_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ValidationConfig {
    pub allowed_email_domains: Vec<String>,
    pub email_domain_message: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let rules = ValidationRules::default();
        Self {
            allowed_email_domains: rules.allowed_email_domains,
            email_domain_message: rules.email_domain_message,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RazorpayConfig {
    /// Public key, handed to the checkout widget.
    pub key_id: String,
    /// Server-side only.
    pub key_secret: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistrationConfig {
    pub url: String,
}

fn default_currency() -> String { "INR".to_string() }
fn default_currency_symbol() -> String { "₹".to_string() }
fn default_theme_color() -> String { "#2C65EB".to_string() }
fn default_api_base() -> String { "https://api.razorpay.com/v1".to_string() }
fn default_abandon_after_secs() -> u64 { 900 }
fn default_exit_times() -> Vec<String> { ValidationRules::default().exit_times }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `MELA__RAZORPAY__KEY_SECRET=...`
            .add_source(config::Environment::with_prefix("MELA").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.check_required()?;
        Ok(config)
    }

    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.check_required()?;
        Ok(config)
    }

    /// Keys are only checked for presence, never against the gateway.
    pub fn check_required(&self) -> Result<(), config::ConfigError> {
        let mut missing = Vec::new();

        if self.event.mode == PricingMode::Paid {
            if self.razorpay.key_id.trim().is_empty() {
                missing.push("razorpay.key_id");
            }
            if self.razorpay.key_secret.trim().is_empty() {
                missing.push("razorpay.key_secret");
            }
        }
        if self.registration.url.trim().is_empty() {
            missing.push("registration.url");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(config::ConfigError::Message(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn pricing_config(&self) -> PricingConfig {
        PricingConfig {
            rates: self.rates,
            mode: self.event.mode,
            currency_symbol: self.event.currency_symbol.clone(),
        }
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            allowed_email_domains: self.validation.allowed_email_domains.clone(),
            email_domain_message: self.validation.email_domain_message.clone(),
            exit_times: self.event.exit_times.clone(),
            event_window: EventWindow {
                start: self.event.window_start,
                end: self.event.window_end,
            },
        }
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            key_id: self.razorpay.key_id.clone(),
            merchant_name: self.event.name.clone(),
            theme_color: self.event.theme_color.clone(),
        }
    }
}
