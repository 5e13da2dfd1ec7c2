use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use walletpay::application::controller::PaymentFlowController;
use walletpay::config::{FlowSettings, SessionConfig};
use walletpay::domain::money::Amount;
use walletpay::domain::ports::{PaymentViewRef, SettlementBackendRef};
use walletpay::domain::session::Stage;
use walletpay::infrastructure::in_memory::{ObserverEvent, RecordingObserver};
use walletpay::infrastructure::simulated::SimulatedSettlement;
use walletpay::interfaces::console::ConsoleView;
use walletpay::interfaces::csv::details_reader::DetailsReader;

/// Line typed to back out while a free-text answer (username, passcode) is expected.
const CANCEL_COMMAND: &str = "/cancel";

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "Input is read from stdin, one line per step. On the purchase review \
                  type `next` or `cancel`. At the username and passcode prompts type \
                  `/cancel` to abort; any other line is taken literally."
)]
struct Cli {
    /// JSON session description (username, purchase_details, amounts)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Logged-in username; when absent the flow asks for one
    #[arg(long)]
    username: Option<String>,

    /// Purchase total before charges
    #[arg(long)]
    total: Option<Amount>,

    /// Wallet balance available for the payment
    #[arg(long)]
    balance: Option<Amount>,

    /// Fixed transaction charge
    #[arg(long)]
    surcharge: Option<Amount>,

    /// CSV file of `key,value` purchase details
    #[arg(long)]
    details: Option<PathBuf>,

    /// Simulated settlement latency in milliseconds
    #[arg(long, default_value_t = 1500)]
    latency_ms: u64,

    /// Seed for the simulated failure reason
    #[arg(long)]
    seed: Option<u64>,

    /// Print the finished session as JSON after the outcome
    #[arg(long)]
    summary: bool,
}

impl Cli {
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_json_file(path).into_diagnostic()?,
            None => SessionConfig::default(),
        };
        if let Some(username) = &self.username {
            config = config.username(username.clone());
        }
        if let Some(total) = self.total {
            config.total_amount = total;
        }
        if let Some(balance) = self.balance {
            config.wallet_balance = balance;
        }
        if let Some(surcharge) = self.surcharge {
            config = config.surcharge(surcharge);
        }
        if let Some(path) = &self.details {
            let file = File::open(path).into_diagnostic()?;
            let details = DetailsReader::new(file).read_all().into_diagnostic()?;
            config = config.details(details);
        }
        Ok(config)
    }

    fn settings(&self) -> FlowSettings {
        FlowSettings {
            settlement_latency: Duration::from_millis(self.latency_ms),
            seed: self.seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = cli.session_config()?;

    let view: PaymentViewRef = Arc::new(ConsoleView::stdout());
    let backend: SettlementBackendRef = Arc::new(SimulatedSettlement::from_settings(&cli.settings()));
    let observer = Arc::new(RecordingObserver::new());
    let controller = PaymentFlowController::with_observer(view, backend, &observer);
    let mut stages = controller.subscribe();

    controller.start(config).await.into_diagnostic()?;

    // Drive the flow from stdin, one line per user action
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let stage = controller.stage();
        if stage.is_terminal() {
            break;
        }
        if stage == Stage::Processing {
            stages.wait_for(Stage::is_terminal).await.into_diagnostic()?;
            continue;
        }

        let Some(line) = lines.next_line().await.into_diagnostic()? else {
            // Input closed before the flow finished
            controller.cancel().await.into_diagnostic()?;
            continue;
        };
        let input = line.trim();

        let handled = match stage {
            _ if input == CANCEL_COMMAND => controller.cancel().await,
            Stage::AwaitingLogin => controller.submit_username(input).await,
            Stage::ReviewingPurchase => match input.to_ascii_lowercase().as_str() {
                "" | "next" | "y" | "yes" => controller.confirm().await,
                "cancel" => controller.cancel().await,
                _ => {
                    println!("Type `next` to continue or `cancel` to abort.");
                    continue;
                }
            },
            Stage::ReviewingBreakdown => {
                if input.is_empty() {
                    println!("Enter Passcode:");
                }
                controller.submit_passcode(input).await
            }
            _ => break,
        };
        handled.into_diagnostic()?;
    }

    if cli.summary
        && let Some(snapshot) = controller.session_snapshot().await
    {
        println!("{}", serde_json::to_string_pretty(&snapshot).into_diagnostic()?);
    }

    match observer.last() {
        Some(ObserverEvent::Failure(reason)) => Err(miette::miette!("payment failed: {reason}")),
        _ => Ok(()),
    }
}

fn init_logging() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();
}
