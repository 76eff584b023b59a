use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Local};
use serde_json::{json, Value};
use tower::ServiceExt;

use mela_api::checkout::PendingCheckouts;
use mela_api::state::EventInfo;
use mela_api::{app, AppState};
use mela_catalog::{PricingConfig, PricingEngine, PricingMode};
use mela_core::payment::{PaymentConfirmation, PaymentGateway, PaymentOrder};
use mela_core::registration::{
    RegistrationBody, RegistrationPayload, RegistrationReply, RegistrationService,
};
use mela_core::validation::ValidationRules;
use mela_core::{CoreError, CoreResult};
use mela_infra::razorpay::{sign_payment, verify_payment_signature};
use mela_order::CheckoutSettings;

const SECRET: &str = "test_secret";

struct MemoryGateway {
    fail: bool,
    orders: Mutex<Vec<u32>>,
}

impl MemoryGateway {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self { fail, orders: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl PaymentGateway for MemoryGateway {
    async fn create_order(&self, amount: u32) -> CoreResult<PaymentOrder> {
        if self.fail {
            return Err(CoreError::GatewayError("401 Unauthorized".to_string()));
        }
        let mut orders = self.orders.lock().unwrap();
        orders.push(amount);
        Ok(PaymentOrder {
            id: format!("order_{}", orders.len()),
            amount: u64::from(amount) * 100,
            currency: "INR".to_string(),
            receipt: Some("receipt_order_1".to_string()),
        })
    }

    fn verify_payment(&self, confirmation: &PaymentConfirmation) -> CoreResult<()> {
        let signature = confirmation.signature.as_deref().unwrap_or_default();
        verify_payment_signature(&confirmation.order_id, &confirmation.payment_id, signature, SECRET)
            .map_err(|e| CoreError::GatewayError(e.to_string()))
    }
}

struct MemoryRegistration {
    reply: Value,
    payloads: Mutex<Vec<RegistrationPayload>>,
}

impl MemoryRegistration {
    fn accepting() -> Arc<Self> {
        Self::replying(json!({
            "success": true,
            "data": { "booking": { "ticketId": "EOD-2001", "name": "Asha Verma" } }
        }))
    }

    fn replying(reply: Value) -> Arc<Self> {
        Arc::new(Self { reply, payloads: Mutex::new(Vec::new()) })
    }

    fn payloads(&self) -> Vec<RegistrationPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistrationService for MemoryRegistration {
    async fn register(&self, payload: &RegistrationPayload) -> CoreResult<RegistrationReply> {
        self.payloads.lock().unwrap().push(payload.clone());
        let body: RegistrationBody = serde_json::from_value(self.reply.clone()).unwrap();
        let status = if body.success { 201 } else { 409 };
        Ok(RegistrationReply { status, body })
    }
}

fn test_state(
    mode: PricingMode,
    gateway: Arc<MemoryGateway>,
    registration: Arc<MemoryRegistration>,
) -> AppState {
    let pricing = PricingConfig { mode, ..PricingConfig::default() };
    let rules = ValidationRules::default();

    AppState {
        event: Arc::new(EventInfo {
            name: "EOD Adventure Park".to_string(),
            mode,
            currency: "INR".to_string(),
            currency_symbol: pricing.currency_symbol.clone(),
            rates: pricing.rates,
            exit_times: rules.exit_times.clone(),
            window_start: None,
            window_end: None,
        }),
        pricing: Arc::new(PricingEngine::new(pricing)),
        rules: Arc::new(rules),
        checkout: CheckoutSettings {
            key_id: "rzp_test_key".to_string(),
            ..CheckoutSettings::default()
        },
        gateway,
        registration,
        pending: Arc::new(PendingCheckouts::default()),
    }
}

fn school_booking() -> Value {
    json!({
        "name": "Asha Verma",
        "email": "asha@gmail.com",
        "phone": "9876543210",
        "bookingType": "school",
        "adultsCount": 10,
        "kidsCount": 0,
        "exitTime": "18:00",
        "visitDate": (Local::now().date_naive() + Duration::days(7)).format("%Y-%m-%d").to_string(),
    })
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn paid_callback(order_id: &str, payment_id: &str) -> Value {
    json!({
        "razorpay_payment_id": payment_id,
        "razorpay_order_id": order_id,
        "razorpay_signature": sign_payment(order_id, payment_id, SECRET).unwrap(),
    })
}

#[tokio::test]
async fn test_health_and_event_info() {
    let state = test_state(PricingMode::Paid, MemoryGateway::new(false), MemoryRegistration::accepting());
    let router = app(state);

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(Request::builder().uri("/v1/event").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let event: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(event["mode"], "paid");
    assert_eq!(event["rates"]["school"]["adult"], 349);
    assert_eq!(event["exitTimes"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_quote_reports_total_and_errors() {
    let state = test_state(PricingMode::Paid, MemoryGateway::new(false), MemoryRegistration::accepting());
    let router = app(state);

    let (status, body) = post(&router, "/v1/quote", school_booking()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quote"]["total"], 3490);
    assert_eq!(body["valid"], true);

    let mut partial = school_booking();
    partial["phone"] = json!("12345");
    let (status, body) = post(&router, "/v1/quote", partial).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["errors"][0]["field"], "phone");
    assert_eq!(body["quote"]["total"], 3490);
}

#[tokio::test]
async fn test_order_proxy_converts_to_minor_units() {
    let gateway = MemoryGateway::new(false);
    let state = test_state(PricingMode::Paid, gateway.clone(), MemoryRegistration::accepting());

    let (status, body) = post(&app(state), "/api/razorpay", json!({ "amount": 3490 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], 349000);
    assert_eq!(body["currency"], "INR");
}

#[tokio::test]
async fn test_order_proxy_failure_body() {
    let state = test_state(PricingMode::Paid, MemoryGateway::new(true), MemoryRegistration::accepting());

    let (status, body) = post(&app(state), "/api/razorpay", json!({ "amount": 3490 })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Order creation failed" }));
}

#[tokio::test]
async fn test_paid_school_booking_end_to_end() {
    let gateway = MemoryGateway::new(false);
    let registration = MemoryRegistration::accepting();
    let state = test_state(PricingMode::Paid, gateway.clone(), registration.clone());
    let router = app(state.clone());

    let (status, body) = post(&router, "/v1/bookings", school_booking()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["state"], "awaiting_payment");
    assert_eq!(body["checkout"]["amount"], 349000);
    assert_eq!(body["checkout"]["description"], "School Package Booking");
    assert_eq!(body["checkout"]["key"], "rzp_test_key");
    let order_id = body["checkout"]["order_id"].as_str().unwrap().to_string();
    assert_eq!(state.pending.len(), 1);
    assert!(registration.payloads().is_empty());

    let (status, body) = post(
        &router,
        &format!("/v1/bookings/{}/payment", order_id),
        paid_callback(&order_id, "pay_77"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "confirmed");
    assert_eq!(body["notice"]["message"], "Booking confirmed successfully!");
    assert_eq!(body["pass"]["ticketId"], "EOD-2001");
    assert_eq!(body["pass"]["price"], 3490);
    assert!(state.pending.is_empty());

    let payloads = registration.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].price, 3490);
    assert_eq!(payloads[0].payment_id.as_deref(), Some("pay_77"));
    assert_eq!(payloads[0].order_id.as_deref(), Some(order_id.as_str()));
    assert_eq!(*gateway.orders.lock().unwrap(), vec![3490]);
}

#[tokio::test]
async fn test_free_booking_confirms_immediately() {
    let gateway = MemoryGateway::new(false);
    let registration = MemoryRegistration::accepting();
    let state = test_state(PricingMode::Free, gateway.clone(), registration.clone());

    let (status, body) = post(&app(state), "/v1/bookings", school_booking()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "confirmed");
    assert_eq!(body["pass"]["priceDisplay"], "Free");
    assert!(gateway.orders.lock().unwrap().is_empty());

    let payloads = registration.payloads();
    assert_eq!(payloads[0].price, 0);
    assert!(payloads[0].payment_id.is_none());
}

#[tokio::test]
async fn test_dismissed_checkout_is_cancelled() {
    let registration = MemoryRegistration::accepting();
    let state = test_state(PricingMode::Paid, MemoryGateway::new(false), registration.clone());
    let router = app(state);

    let (_, body) = post(&router, "/v1/bookings", school_booking()).await;
    let order_id = body["checkout"]["order_id"].as_str().unwrap().to_string();

    let (status, body) = post(&router, &format!("/v1/bookings/{}/dismiss", order_id), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "error");
    assert_eq!(body["notice"]["message"], "Payment was cancelled.");
    assert!(registration.payloads().is_empty());

    // The callback is single-use.
    let (status, _) = post(&router, &format!("/v1/bookings/{}/dismiss", order_id), Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_forged_signature_is_not_registered() {
    let registration = MemoryRegistration::accepting();
    let state = test_state(PricingMode::Paid, MemoryGateway::new(false), registration.clone());
    let router = app(state);

    let (_, body) = post(&router, "/v1/bookings", school_booking()).await;
    let order_id = body["checkout"]["order_id"].as_str().unwrap().to_string();

    let mut callback = paid_callback(&order_id, "pay_77");
    callback["razorpay_payment_id"] = json!("pay_other");

    let (status, body) = post(&router, &format!("/v1/bookings/{}/payment", order_id), callback).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Payment could not be completed.");
    assert!(registration.payloads().is_empty());
}

#[tokio::test]
async fn test_invalid_form_lists_field_errors() {
    let gateway = MemoryGateway::new(false);
    let state = test_state(PricingMode::Paid, gateway.clone(), MemoryRegistration::accepting());

    let mut form = school_booking();
    form["name"] = json!("A");
    form["email"] = json!("asha@example.com");

    let (status, body) = post(&app(state), "/v1/bookings", form).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["state"], "invalid");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "email"]);
    assert!(gateway.orders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_order_failure_surfaces_notice() {
    let state = test_state(PricingMode::Paid, MemoryGateway::new(true), MemoryRegistration::accepting());

    let (status, body) = post(&app(state.clone()), "/v1/bookings", school_booking()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["notice"]["message"], "Could not initiate payment.");
    assert!(state.pending.is_empty());
}

#[tokio::test]
async fn test_registration_rejection_message_is_shown() {
    let registration = MemoryRegistration::replying(json!({
        "success": false,
        "message": "Email already registered"
    }));
    let state = test_state(PricingMode::Free, MemoryGateway::new(false), registration);

    let (status, body) = post(&app(state), "/v1/bookings", school_booking()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let state = test_state(PricingMode::Paid, MemoryGateway::new(false), MemoryRegistration::accepting());

    let (status, body) = post(
        &app(state),
        "/v1/bookings/order_missing/payment",
        paid_callback("order_missing", "pay_1"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("order_missing"));
}

#[tokio::test]
async fn test_order_proxy_rejects_fractional_amount_with_error_body() {
    let gateway = MemoryGateway::new(false);
    let state = test_state(PricingMode::Paid, gateway.clone(), MemoryRegistration::accepting());

    let (status, body) = post(&app(state), "/api/razorpay", json!({ "amount": 349.5 })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Order creation failed" }));
    assert!(gateway.orders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_mistyped_booking_field_returns_json_error() {
    let gateway = MemoryGateway::new(false);
    let state = test_state(PricingMode::Paid, gateway.clone(), MemoryRegistration::accepting());
    let router = app(state);

    let mut form = school_booking();
    form["adultsCount"] = json!("ten");

    let (status, body) = post(&router, "/v1/bookings", form.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("adultsCount"));
    assert!(gateway.orders.lock().unwrap().is_empty());

    let (status, body) = post(&router, "/v1/quote", form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_abandoned_checkouts_are_evicted() {
    let registration = MemoryRegistration::accepting();
    let mut state = test_state(PricingMode::Paid, MemoryGateway::new(false), registration.clone());
    state.pending = Arc::new(PendingCheckouts::new(StdDuration::ZERO));
    let router = app(state.clone());

    let (status, first) = post(&router, "/v1/bookings", school_booking()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let first_order = first["checkout"]["order_id"].as_str().unwrap().to_string();

    let (status, _) = post(&router, "/v1/bookings", school_booking()).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // Parking the second checkout swept out the first.
    assert_eq!(state.pending.len(), 1);
    let (status, _) = post(
        &router,
        &format!("/v1/bookings/{}/payment", first_order),
        paid_callback(&first_order, "pay_late"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(state.pending.sweep(), 1);
    assert!(state.pending.is_empty());
    assert!(registration.payloads().is_empty());
}
