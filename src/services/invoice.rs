use crate::error::PayError;
use crate::models::{Invoice, InvoiceStatusResponse, PaymentRequest};
use async_trait::async_trait;

/// The external service that issues invoices and reports their settlement.
#[async_trait]
pub trait InvoiceService: Send + Sync {
    async fn create_invoice(&self, request: &PaymentRequest) -> Result<Invoice, PayError>;

    async fn get_invoice_status(&self, invoice_id: &str)
        -> Result<InvoiceStatusResponse, PayError>;
}
