use crate::{
    error::PayError,
    flow::{FlowCallbacks, POLL_INTERVAL, VERIFICATION_TIMEOUT},
    models::{
        FailureReason, FlowSnapshot, Invoice, InvoiceStatus, PaymentFlowState, PaymentRequest,
        SettledPayment, VerificationAttempt,
    },
    services::InvoiceService,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Drives one payment request from invoice creation to settlement.
///
/// `start`, `retry` and `cancel` return immediately; the invoice call and the
/// polling loop run on a spawned Tokio task, so they must be called from
/// within a Tokio runtime. Every write the task makes is keyed by the run's
/// generation: once `cancel` or `retry` bumps the generation, results of the
/// old run are dropped instead of applied.
pub struct PaymentFlowController {
    request: PaymentRequest,
    service: Arc<dyn InvoiceService>,
    callbacks: Arc<FlowCallbacks>,
    shared: Arc<Shared>,
}

struct Shared {
    flow_id: Uuid,
    inner: Mutex<FlowInner>,
    snapshots: watch::Sender<FlowSnapshot>,
}

struct FlowInner {
    state: PaymentFlowState,
    generation: u64,
    invoice: Option<Invoice>,
    attempts: Vec<VerificationAttempt>,
    last_error: Option<String>,
    task: Option<JoinHandle<()>>,
}

impl FlowInner {
    fn new() -> Self {
        Self {
            state: PaymentFlowState::Idle,
            generation: 0,
            invoice: None,
            attempts: Vec::new(),
            last_error: None,
            task: None,
        }
    }

    fn clear_run(&mut self) {
        self.invoice = None;
        self.attempts.clear();
        self.last_error = None;
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn snapshot(&self, flow_id: Uuid) -> FlowSnapshot {
        FlowSnapshot {
            flow_id,
            generation: self.generation,
            state: self.state,
            invoice: self.invoice.clone(),
            attempts: self.attempts.len() as u32,
            last_attempt: self.attempts.last().cloned(),
            last_error: self.last_error.clone(),
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, FlowInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &FlowInner) {
        self.snapshots.send_replace(inner.snapshot(self.flow_id));
    }

    fn apply<R>(&self, generation: u64, f: impl FnOnce(&mut FlowInner) -> R) -> Option<R> {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(
                generation,
                current = inner.generation,
                "Discarding result of superseded payment run"
            );
            return None;
        }

        let result = f(&mut inner);
        self.publish(&inner);
        Some(result)
    }
}

impl PaymentFlowController {
    pub fn new(
        request: PaymentRequest,
        service: Arc<dyn InvoiceService>,
        callbacks: FlowCallbacks,
    ) -> Self {
        let flow_id = Uuid::new_v4();
        let (snapshots, _) = watch::channel(FlowSnapshot::idle(flow_id));

        Self {
            request,
            service,
            callbacks: Arc::new(callbacks),
            shared: Arc::new(Shared {
                flow_id,
                inner: Mutex::new(FlowInner::new()),
                snapshots,
            }),
        }
    }

    pub fn start(&self) -> Result<(), PayError> {
        let mut inner = self.shared.lock();
        if inner.state != PaymentFlowState::Idle {
            return Err(PayError::invalid_transition("start", inner.state));
        }

        self.launch(&mut inner);
        Ok(())
    }

    pub fn retry(&self) -> Result<(), PayError> {
        let mut inner = self.shared.lock();
        let PaymentFlowState::Failed(reason) = inner.state else {
            return Err(PayError::invalid_transition("retry", inner.state));
        };

        info!(flow_id = %self.shared.flow_id, %reason, "Retrying payment");
        self.launch(&mut inner);
        Ok(())
    }

    pub fn cancel(&self) -> Result<(), PayError> {
        let mut inner = self.shared.lock();
        if !inner.state.is_active() {
            return Err(PayError::invalid_transition("cancel", inner.state));
        }

        inner.generation += 1;
        inner.abort_task();
        inner.clear_run();
        inner.state = PaymentFlowState::Idle;
        self.shared.publish(&inner);

        info!(flow_id = %self.shared.flow_id, "Payment cancelled");
        Ok(())
    }

    fn launch(&self, inner: &mut FlowInner) {
        inner.generation += 1;
        inner.abort_task();
        inner.clear_run();
        inner.state = PaymentFlowState::CreatingInvoice;
        self.shared.publish(inner);

        let run = FlowRun {
            generation: inner.generation,
            request: self.request.clone(),
            service: self.service.clone(),
            callbacks: self.callbacks.clone(),
            shared: self.shared.clone(),
        };
        let span = info_span!(
            "payment_flow",
            flow_id = %self.shared.flow_id,
            generation = inner.generation
        );

        inner.task = Some(tokio::spawn(run.execute().instrument(span)));
    }

    pub fn flow_id(&self) -> Uuid {
        self.shared.flow_id
    }

    pub fn request(&self) -> &PaymentRequest {
        &self.request
    }

    pub fn state(&self) -> PaymentFlowState {
        self.shared.lock().state
    }

    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    pub fn invoice(&self) -> Option<Invoice> {
        self.shared.lock().invoice.clone()
    }

    pub fn payment_url(&self) -> Option<String> {
        self.shared
            .lock()
            .invoice
            .as_ref()
            .map(|i| i.payment_url.clone())
    }

    pub fn attempts(&self) -> Vec<VerificationAttempt> {
        self.shared.lock().attempts.clone()
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        self.shared.lock().snapshot(self.shared.flow_id)
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.shared.snapshots.subscribe()
    }
}

impl Drop for PaymentFlowController {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.generation += 1;
        inner.abort_task();
    }
}

struct FlowRun {
    generation: u64,
    request: PaymentRequest,
    service: Arc<dyn InvoiceService>,
    callbacks: Arc<FlowCallbacks>,
    shared: Arc<Shared>,
}

enum Verification {
    Paid(Box<SettledPayment>),
    Expired,
    TimedOut,
    Superseded,
}

impl FlowRun {
    async fn execute(self) {
        let invoice = match self.service.create_invoice(&self.request).await {
            Ok(invoice) => invoice,
            Err(e) => {
                warn!(error = %e, "Failed to create payment invoice");
                self.fail(FailureReason::InvoiceCreationFailed, e.to_string());
                return;
            }
        };

        info!(
            invoice_id = %invoice.invoice_id,
            payment_url = %invoice.payment_url,
            "Invoice created, awaiting payment"
        );

        let awaiting = self.shared.apply(self.generation, |inner| {
            inner.invoice = Some(invoice.clone());
            inner.state = PaymentFlowState::AwaitingPayment;
        });
        if awaiting.is_none() {
            return;
        }

        let verifying = self.shared.apply(self.generation, |inner| {
            inner.state = PaymentFlowState::Verifying;
        });
        if verifying.is_none() {
            return;
        }

        match self.verify(invoice).await {
            Verification::Paid(payment) => self.succeed(*payment),
            Verification::Expired => {
                self.fail(FailureReason::Expired, "Payment expired".to_string())
            }
            Verification::TimedOut => self.fail(
                FailureReason::Timeout,
                "Payment verification timeout".to_string(),
            ),
            Verification::Superseded => {}
        }
    }

    async fn verify(&self, invoice: Invoice) -> Verification {
        let deadline = Instant::now() + VERIFICATION_TIMEOUT;
        let mut ticker = time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempt_number = 0u32;

        info!(invoice_id = %invoice.invoice_id, "Verifying payment");

        loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => {}
                _ = time::sleep_until(deadline) => {
                    warn!(attempts = attempt_number, "Payment verification timed out");
                    return Verification::TimedOut;
                }
            }

            attempt_number += 1;
            let outcome = match time::timeout_at(
                deadline,
                self.service.get_invoice_status(&invoice.invoice_id),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        attempt_number,
                        "Payment verification timed out during status request"
                    );
                    return Verification::TimedOut;
                }
            };

            let observed = match &outcome {
                Ok(response) => response.status,
                Err(_) => InvoiceStatus::Unknown,
            };
            let error = outcome.as_ref().err().map(ToString::to_string);
            let recorded = self.shared.apply(self.generation, |inner| {
                inner
                    .attempts
                    .push(VerificationAttempt::new(attempt_number, observed));
                if error.is_some() {
                    inner.last_error = error.clone();
                }
            });
            if recorded.is_none() {
                return Verification::Superseded;
            }

            match outcome {
                Ok(response) => match response.status {
                    InvoiceStatus::Paid => {
                        return Verification::Paid(Box::new(SettledPayment::new(
                            self.request.clone(),
                            invoice,
                            response,
                            attempt_number,
                        )));
                    }
                    InvoiceStatus::Expired => return Verification::Expired,
                    InvoiceStatus::Pending | InvoiceStatus::Unknown => {
                        debug!(attempt_number, status = %response.status, "Payment not settled yet");
                    }
                },
                Err(e) => {
                    warn!(attempt_number, error = %e, "Payment verification error, polling continues");
                }
            }
        }
    }

    fn succeed(&self, payment: SettledPayment) {
        let accepted = self.shared.apply(self.generation, |inner| {
            inner.state = PaymentFlowState::Succeeded;
            inner.last_error = None;
        });

        if accepted.is_some() {
            info!(
                invoice_id = %payment.invoice.invoice_id,
                attempts = payment.attempts,
                "Payment settled"
            );
            self.callbacks.succeeded(payment);
        }
    }

    fn fail(&self, reason: FailureReason, detail: String) {
        let accepted = self.shared.apply(self.generation, |inner| {
            inner.state = PaymentFlowState::Failed(reason);
            inner.last_error = Some(detail);
        });

        if accepted.is_some() {
            warn!(%reason, "Payment failed");
            self.callbacks.failed(reason);
        }
    }
}
