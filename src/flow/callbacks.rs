use crate::models::{FailureReason, SettledPayment};
use tokio::sync::mpsc;

type SuccessFn = dyn Fn(SettledPayment) + Send + Sync;
type ErrorFn = dyn Fn(FailureReason) + Send + Sync;

pub struct FlowCallbacks {
    on_success: Box<SuccessFn>,
    on_error: Box<ErrorFn>,
}

#[derive(Debug, Clone)]
pub enum FlowOutcome {
    Settled(SettledPayment),
    Failed(FailureReason),
}

impl FlowCallbacks {
    pub fn new(
        on_success: impl Fn(SettledPayment) + Send + Sync + 'static,
        on_error: impl Fn(FailureReason) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FlowOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let error_tx = tx.clone();

        let callbacks = Self::new(
            move |payment| {
                let _ = tx.send(FlowOutcome::Settled(payment));
            },
            move |reason| {
                let _ = error_tx.send(FlowOutcome::Failed(reason));
            },
        );

        (callbacks, rx)
    }

    pub(crate) fn succeeded(&self, payment: SettledPayment) {
        (self.on_success)(payment)
    }

    pub(crate) fn failed(&self, reason: FailureReason) {
        (self.on_error)(reason)
    }
}

impl std::fmt::Debug for FlowCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowCallbacks").finish_non_exhaustive()
    }
}
