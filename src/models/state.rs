use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::{Invoice, InvoiceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    InvoiceCreationFailed,
    Expired,
    Timeout,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvoiceCreationFailed => "invoice-creation-failed",
            FailureReason::Expired => "expired",
            FailureReason::Timeout => "timeout",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            FailureReason::InvoiceCreationFailed => "Failed to create payment invoice",
            FailureReason::Expired => "Payment expired",
            FailureReason::Timeout => "Payment verification timeout",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentFlowState {
    Idle,
    CreatingInvoice,
    AwaitingPayment,
    Verifying,
    Succeeded,
    Failed(FailureReason),
}

impl PaymentFlowState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PaymentFlowState::CreatingInvoice
                | PaymentFlowState::AwaitingPayment
                | PaymentFlowState::Verifying
        )
    }
}

impl fmt::Display for PaymentFlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentFlowState::Idle => f.write_str("idle"),
            PaymentFlowState::CreatingInvoice => f.write_str("creating-invoice"),
            PaymentFlowState::AwaitingPayment => f.write_str("awaiting-payment"),
            PaymentFlowState::Verifying => f.write_str("verifying"),
            PaymentFlowState::Succeeded => f.write_str("succeeded"),
            PaymentFlowState::Failed(reason) => write!(f, "failed({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationAttempt {
    pub attempt_number: u32,
    pub observed_status: InvoiceStatus,
    pub observed_at: DateTime<Utc>,
}

impl VerificationAttempt {
    pub fn new(attempt_number: u32, observed_status: InvoiceStatus) -> Self {
        Self {
            attempt_number,
            observed_status,
            observed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub flow_id: Uuid,
    pub generation: u64,
    pub state: PaymentFlowState,
    pub invoice: Option<Invoice>,
    pub attempts: u32,
    pub last_attempt: Option<VerificationAttempt>,
    pub last_error: Option<String>,
}

impl FlowSnapshot {
    pub fn idle(flow_id: Uuid) -> Self {
        Self {
            flow_id,
            generation: 0,
            state: PaymentFlowState::Idle,
            invoice: None,
            attempts: 0,
            last_attempt: None,
            last_error: None,
        }
    }

    pub fn payment_url(&self) -> Option<&str> {
        self.invoice.as_ref().map(|i| i.payment_url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reasons_are_machine_readable() {
        assert_eq!(
            FailureReason::InvoiceCreationFailed.to_string(),
            "invoice-creation-failed"
        );
        assert_eq!(FailureReason::Expired.to_string(), "expired");
        assert_eq!(FailureReason::Timeout.to_string(), "timeout");
        assert_eq!(
            serde_json::to_value(FailureReason::InvoiceCreationFailed).unwrap(),
            "invoice-creation-failed"
        );
    }

    #[test]
    fn only_in_flight_states_are_active() {
        use PaymentFlowState::*;

        for state in [CreatingInvoice, AwaitingPayment, Verifying] {
            assert!(state.is_active());
        }
        for state in [Succeeded, Failed(FailureReason::Timeout)] {
            assert!(!state.is_active());
        }
        assert!(!Idle.is_active());
    }
}
