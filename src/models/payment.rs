use crate::error::PayError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::InvoiceStatusResponse;

pub const DEFAULT_CURRENCY: &str = "USDC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    currency: String,
    purpose: String,
    wallet_address: String,
}

impl PaymentRequest {
    pub fn new(
        amount: Decimal,
        currency: impl Into<String>,
        purpose: impl Into<String>,
        wallet_address: impl Into<String>,
    ) -> Result<Self, PayError> {
        let request = Self {
            amount,
            currency: currency.into().trim().to_string(),
            purpose: purpose.into().trim().to_string(),
            wallet_address: wallet_address.into().trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> Result<(), PayError> {
        if self.amount <= Decimal::ZERO {
            return Err(PayError::InvalidRequest(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }

        for (field, value) in [
            ("currency", &self.currency),
            ("purpose", &self.purpose),
            ("wallet address", &self.wallet_address),
        ] {
            if value.is_empty() {
                return Err(PayError::InvalidRequest(format!("{} is required", field)));
            }
        }

        Ok(())
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    pub fn abbreviated_wallet(&self) -> String {
        let chars: Vec<char> = self.wallet_address.chars().collect();
        if chars.len() <= 10 {
            return self.wallet_address.clone();
        }

        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_id: String,
    pub payment_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledPayment {
    pub request: PaymentRequest,
    pub invoice: Invoice,
    pub receipt: serde_json::Value,
    pub attempts: u32,
    pub settled_at: DateTime<Utc>,
}

impl SettledPayment {
    pub fn new(
        request: PaymentRequest,
        invoice: Invoice,
        response: InvoiceStatusResponse,
        attempts: u32,
    ) -> Self {
        Self {
            request,
            invoice,
            receipt: response.body,
            attempts,
            settled_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentSurface {
    AgentExecution { agent_name: String },
    BountyFunding { bounty_title: String },
    TreasuryFunding,
}

impl PaymentSurface {
    pub fn purpose(&self) -> String {
        match self {
            PaymentSurface::AgentExecution { agent_name } => {
                format!("AI Task Execution: {}", agent_name)
            }
            PaymentSurface::BountyFunding { bounty_title } => {
                format!("Bounty Funding: {}", bounty_title)
            }
            PaymentSurface::TreasuryFunding => "Agent Treasury Funding".to_string(),
        }
    }

    pub fn request(
        &self,
        amount: Decimal,
        wallet_address: impl Into<String>,
    ) -> Result<PaymentRequest, PayError> {
        PaymentRequest::new(amount, DEFAULT_CURRENCY, self.purpose(), wallet_address)
    }
}
