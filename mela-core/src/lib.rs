pub mod booking;
pub mod validation;
pub mod payment;
pub mod registration;

pub use booking::{BookingForm, BookingRequest, BookingType, FoodOption, PackageType, Party};
pub use validation::{validate, FieldError, ValidationRules};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("Registration service error: {0}")]
    RegistrationError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
