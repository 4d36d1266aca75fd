#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use x402_pay::{
    error::PayError,
    flow::{FlowCallbacks, FlowOutcome, PaymentFlowController},
    models::{Invoice, InvoiceStatus, InvoiceStatusResponse, PaymentRequest, PaymentSurface},
    services::InvoiceService,
};

pub const WALLET: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

pub fn invoice(id: &str) -> Invoice {
    Invoice {
        invoice_id: id.to_string(),
        payment_url: format!("https://pay/{}", id),
    }
}

pub fn treasury_request() -> PaymentRequest {
    PaymentSurface::TreasuryFunding
        .request(Decimal::from(100), WALLET)
        .unwrap()
}

pub fn api_error(status: u16) -> PayError {
    PayError::Api {
        status,
        message: "Service unavailable".to_string(),
    }
}

/// One scripted answer to a status request.
pub enum StatusStep {
    Status(InvoiceStatus),
    Fail(u16),
}

/// In-memory invoice service that replays scripted answers. Status requests
/// past the end of the script answer `pending`.
#[derive(Default)]
pub struct ScriptedService {
    invoices: Mutex<VecDeque<Result<Invoice, PayError>>>,
    statuses: Mutex<VecDeque<StatusStep>>,
    create_gate: Mutex<Option<Arc<Notify>>>,
    create_hook: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
    create_calls: AtomicU32,
    status_calls: AtomicU32,
    status_requests: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invoice(self, invoice: Invoice) -> Self {
        self.invoices.lock().unwrap().push_back(Ok(invoice));
        self
    }

    pub fn with_invoice_error(self, error: PayError) -> Self {
        self.invoices.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_statuses(self, statuses: impl IntoIterator<Item = InvoiceStatus>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .extend(statuses.into_iter().map(StatusStep::Status));
        self
    }

    pub fn with_status_error(self, status: u16) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .push_back(StatusStep::Fail(status));
        self
    }

    /// Holds `create_invoice` until the returned `Notify` is signalled.
    pub fn gate_creation(self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        *self.create_gate.lock().unwrap() = Some(gate.clone());
        (self, gate)
    }

    /// Runs `hook` inside `create_invoice`, just before the invoice is returned.
    pub fn on_create(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.create_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn status_requests(&self) -> Vec<String> {
        self.status_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvoiceService for ScriptedService {
    async fn create_invoice(&self, _request: &PaymentRequest) -> Result<Invoice, PayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.create_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(hook) = self.create_hook.lock().unwrap().as_ref() {
            hook();
        }

        self.invoices
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(api_error(500)))
    }

    async fn get_invoice_status(
        &self,
        invoice_id: &str,
    ) -> Result<InvoiceStatusResponse, PayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_requests
            .lock()
            .unwrap()
            .push(invoice_id.to_string());

        match self.statuses.lock().unwrap().pop_front() {
            Some(StatusStep::Status(status)) => Ok(InvoiceStatusResponse::new(status)),
            Some(StatusStep::Fail(code)) => Err(api_error(code)),
            None => Ok(InvoiceStatusResponse::new(InvoiceStatus::Pending)),
        }
    }
}

pub fn controller(
    service: Arc<ScriptedService>,
) -> (PaymentFlowController, mpsc::UnboundedReceiver<FlowOutcome>) {
    let (callbacks, outcomes) = FlowCallbacks::channel();
    let controller = PaymentFlowController::new(treasury_request(), service, callbacks);
    (controller, outcomes)
}

/// Every outcome delivered so far, without waiting.
pub fn drain(outcomes: &mut mpsc::UnboundedReceiver<FlowOutcome>) -> Vec<FlowOutcome> {
    let mut delivered = Vec::new();
    while let Ok(outcome) = outcomes.try_recv() {
        delivered.push(outcome);
    }
    delivered
}
