use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use x402_pay::{
    config::Config,
    flow::{FlowCallbacks, FlowOutcome, PaymentFlowController},
    models::{FlowSnapshot, PaymentFlowState, PaymentRequest, PaymentSurface},
    services::HttpInvoiceService,
};

#[derive(Parser, Debug)]
#[command(
    name = "x402-pay",
    version,
    about = "Pay for an AgentVerse action with x402 and wait for settlement"
)]
struct Cli {
    /// Amount to pay
    #[arg(long)]
    amount: Decimal,

    /// Currency, defaults to DEFAULT_CURRENCY
    #[arg(long)]
    currency: Option<String>,

    /// Paying wallet address
    #[arg(long)]
    wallet: String,

    #[command(flatten)]
    target: Target,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Target {
    /// Pay for a task run by this agent
    #[arg(long)]
    agent: Option<String>,

    /// Fund the bounty with this title
    #[arg(long)]
    bounty: Option<String>,

    /// Fund the agent treasury
    #[arg(long)]
    treasury: bool,

    /// Free-text purpose
    #[arg(long)]
    purpose: Option<String>,
}

impl Target {
    fn purpose(self) -> Result<String> {
        let surface = if let Some(agent_name) = self.agent {
            PaymentSurface::AgentExecution { agent_name }
        } else if let Some(bounty_title) = self.bounty {
            PaymentSurface::BountyFunding { bounty_title }
        } else if self.treasury {
            PaymentSurface::TreasuryFunding
        } else if let Some(purpose) = self.purpose {
            return Ok(purpose);
        } else {
            bail!("A payment target is required");
        };

        Ok(surface.purpose())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("x402_pay=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing::debug!("Environment: {:?}", config.environment);

    let service = Arc::new(
        HttpInvoiceService::from_config(&config).context("Failed to build API client")?,
    );
    let request = PaymentRequest::new(
        cli.amount,
        cli.currency.unwrap_or_else(|| config.default_currency.clone()),
        cli.target.purpose()?,
        cli.wallet,
    )?;

    println!("x402 Payment");
    println!("============");
    println!(
        "Pay {} {} for {}",
        request.amount(),
        request.currency(),
        request.purpose()
    );
    println!("Wallet: {}", request.abbreviated_wallet());
    println!("API: {}", service.base_url());
    println!();

    let (callbacks, mut outcomes) = FlowCallbacks::channel();
    let controller = PaymentFlowController::new(request, service, callbacks);
    let mut snapshots = controller.subscribe();

    controller.start()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut progress = Progress::default();
    let mut interrupted = false;

    let outcome = loop {
        tokio::select! {
            outcome = outcomes.recv() => break outcome,
            changed = snapshots.changed() => {
                if changed.is_ok() {
                    progress.report(&snapshots.borrow_and_update());
                }
            }
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if controller.cancel().is_ok() {
                    println!();
                    println!("[CANCELLED] Payment cancelled");
                    std::process::exit(130);
                }
            }
        }
    };

    match outcome {
        Some(FlowOutcome::Settled(payment)) => {
            println!();
            println!("[SUCCESS] Your payment has been processed successfully!");
            println!("{}", serde_json::to_string_pretty(&payment)?);
            Ok(())
        }
        Some(FlowOutcome::Failed(reason)) => {
            println!();
            println!("[FAILED] {} ({})", reason.user_message(), reason);
            if let Some(detail) = controller.snapshot().last_error {
                println!("   {}", detail);
            }
            std::process::exit(1);
        }
        None => bail!("Payment flow ended without an outcome"),
    }
}

#[derive(Default)]
struct Progress {
    url_shown: bool,
    attempts_shown: u32,
}

impl Progress {
    fn report(&mut self, snapshot: &FlowSnapshot) {
        if snapshot.state == PaymentFlowState::CreatingInvoice {
            println!("Setting up your payment...");
        }

        if !self.url_shown {
            if let Some(url) = snapshot.payment_url() {
                println!("Complete your payment at:");
                println!("   {}", url);
                println!();
                self.url_shown = true;
            }
        }

        if snapshot.attempts > self.attempts_shown {
            self.attempts_shown = snapshot.attempts;
            if let Some(attempt) = &snapshot.last_attempt {
                println!(
                    "   Verification attempt {}... ({})",
                    attempt.attempt_number, attempt.observed_status
                );
            }
        }
    }
}
