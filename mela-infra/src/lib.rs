pub mod app_config;
pub mod razorpay;
pub mod registration;

pub use razorpay::RazorpayGateway;
pub use registration::HttpRegistrationService;
