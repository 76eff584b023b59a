pub mod models;
pub mod fulfillment;
pub mod orchestrator;

pub use models::{CheckoutState, Notice, NoticeLevel, SubmissionOutcome};
pub use fulfillment::TicketPass;
pub use orchestrator::{CheckoutOrchestrator, CheckoutSettings, OrchestratorError};
