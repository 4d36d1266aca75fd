use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Expired,
    #[default]
    Unknown,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Expired => "expired",
            InvoiceStatus::Unknown => "unknown",
        }
    }
}

impl From<&str> for InvoiceStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => InvoiceStatus::Pending,
            "paid" => InvoiceStatus::Paid,
            "expired" => InvoiceStatus::Expired,
            _ => InvoiceStatus::Unknown,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceStatusResponse {
    pub status: InvoiceStatus,
    pub body: Value,
}

impl InvoiceStatusResponse {
    pub fn new(status: InvoiceStatus) -> Self {
        Self {
            status,
            body: serde_json::json!({ "status": status.as_str() }),
        }
    }

    pub fn from_body(body: Value) -> Self {
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .map(InvoiceStatus::from)
            .unwrap_or_default();

        Self { status, body }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_and_unknown_statuses() {
        assert_eq!(InvoiceStatus::from("paid"), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::from("PENDING"), InvoiceStatus::Pending);
        assert_eq!(InvoiceStatus::from(" expired "), InvoiceStatus::Expired);
        assert_eq!(InvoiceStatus::from("processing"), InvoiceStatus::Unknown);
    }

    #[test]
    fn status_response_keeps_full_body() {
        let response = InvoiceStatusResponse::from_body(json!({
            "status": "paid",
            "txHash": "0xabc",
            "amount": 100,
        }));
        assert_eq!(response.status, InvoiceStatus::Paid);
        assert_eq!(response.body["txHash"], "0xabc");
    }

    #[test]
    fn missing_status_is_unknown() {
        let response = InvoiceStatusResponse::from_body(json!({ "message": "ok" }));
        assert_eq!(response.status, InvoiceStatus::Unknown);
    }

    #[test]
    fn error_body_uses_only_the_message_field() {
        let body: ApiErrorBody =
            serde_json::from_value(json!({ "message": "Invoice not found", "error": "x" }))
                .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invoice not found"));

        let body: ApiErrorBody = serde_json::from_value(json!({ "error": "Bad Request" })).unwrap();
        assert_eq!(body.into_message(), None);

        let body: ApiErrorBody = serde_json::from_value(json!({ "message": "  " })).unwrap();
        assert_eq!(body.into_message(), None);

        assert_eq!(ApiErrorBody::default().into_message(), None);
    }
}
