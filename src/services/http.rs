use crate::{
    config::Config,
    error::PayError,
    models::{ApiErrorBody, Invoice, InvoiceStatusResponse, PaymentRequest},
    services::InvoiceService,
};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, RequestBuilder, Url};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;

const FALLBACK_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Clone)]
pub struct HttpInvoiceService {
    base_url: Url,
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpInvoiceService {
    pub fn new(base_url: impl AsRef<str>, request_timeout: Duration) -> Result<Self, PayError> {
        let raw = base_url.as_ref().trim();
        let base_url = Url::parse(raw).map_err(|e| {
            PayError::ConfigError(format!("invalid API base URL {:?}: {}", raw, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(PayError::ConfigError(format!(
                "API base URL {:?} cannot carry a path",
                raw
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            base_url,
            client,
            token: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, PayError> {
        let service = Self::new(config.api_base_url.clone(), config.request_timeout())?;

        Ok(match &config.api_token {
            Some(token) => service.with_token(token.clone()),
            None => service,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    // Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, PayError> {
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(ApiErrorBody::into_message)
                .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());

            tracing::debug!(status = status.as_u16(), %message, "API request rejected");
            return Err(PayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl InvoiceService for HttpInvoiceService {
    async fn create_invoice(&self, request: &PaymentRequest) -> Result<Invoice, PayError> {
        #[derive(Serialize)]
        struct CreateInvoiceRequest<'a> {
            #[serde(with = "rust_decimal::serde::float")]
            amount: Decimal,
            currency: &'a str,
            purpose: &'a str,
        }

        let body = CreateInvoiceRequest {
            amount: request.amount(),
            currency: request.currency(),
            purpose: request.purpose(),
        };

        let invoice: Invoice = self
            .send(
                self.client
                    .post(self.endpoint(&["x402", "invoice"]))
                    .json(&body),
            )
            .await?;

        tracing::debug!(invoice_id = %invoice.invoice_id, "Invoice created");
        Ok(invoice)
    }

    async fn get_invoice_status(
        &self,
        invoice_id: &str,
    ) -> Result<InvoiceStatusResponse, PayError> {
        let body: Value = self
            .send(
                self.client
                    .get(self.endpoint(&["x402", "verify", invoice_id]))
                    .header(CONTENT_TYPE, "application/json"),
            )
            .await?;

        Ok(InvoiceStatusResponse::from_body(body))
    }
}
