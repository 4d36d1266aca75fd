use std::time::Duration;

pub mod callbacks;
pub mod controller;

pub use callbacks::{FlowCallbacks, FlowOutcome};
pub use controller::PaymentFlowController;

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

pub const VERIFICATION_TIMEOUT: Duration = Duration::from_secs(300);
