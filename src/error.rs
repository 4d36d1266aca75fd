use crate::models::PaymentFlowState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayError {
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),

    #[error("Cannot {action} a payment flow in state {state}")]
    InvalidTransition {
        action: &'static str,
        state: PaymentFlowState,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PayError {
    pub fn invalid_transition(action: &'static str, state: PaymentFlowState) -> Self {
        PayError::InvalidTransition { action, state }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            PayError::Api { status, .. } => Some(*status),
            PayError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureReason;

    #[test]
    fn transition_error_names_action_and_state() {
        let err = PayError::invalid_transition("retry", PaymentFlowState::Verifying);
        assert_eq!(
            err.to_string(),
            "Cannot retry a payment flow in state verifying"
        );

        let err = PayError::invalid_transition(
            "cancel",
            PaymentFlowState::Failed(FailureReason::Expired),
        );
        assert_eq!(
            err.to_string(),
            "Cannot cancel a payment flow in state failed(expired)"
        );
    }

    #[test]
    fn api_error_exposes_status() {
        let err = PayError::Api {
            status: 422,
            message: "Amount too low".to_string(),
        };
        assert_eq!(err.status_code(), Some(422));
        assert_eq!(err.to_string(), "API error (422): Amount too low");
        assert_eq!(PayError::InvalidRequest("x".into()).status_code(), None);
    }
}
