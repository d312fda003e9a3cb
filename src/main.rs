use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use xchain_checkout::application::session::CheckoutSession;
use xchain_checkout::config::{
    CheckoutConfig, DEFAULT_DESTINATION_CHAIN_SELECTOR, DEFAULT_RELAY_PAYMENT_TOKEN,
};
use xchain_checkout::domain::amount::{BaseUnits, DEFAULT_DECIMALS, MAX_DECIMALS};
use xchain_checkout::domain::catalog::{Catalog, ItemId};
use xchain_checkout::domain::network::{Address, ChainSelector, NetworkId};
use xchain_checkout::domain::outcome::PaymentPath;
use xchain_checkout::domain::ports::{Operation, SigningContextRef};
use xchain_checkout::infrastructure::simulated::{Fault, SimulatedLedger, SimulatedWallet};
use xchain_checkout::interfaces::csv::catalog_reader::CatalogReader;
use xchain_checkout::interfaces::csv::catalog_writer::CatalogWriter;

const DEFAULT_WALLET_ACCOUNT: &str = "0x00000000000000000000000000000000000a11ce";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Catalog CSV file (id,name,description,price). Defaults to the built-in lab tests.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Decimal places of the payment token (at most 38).
    #[arg(
        long,
        env = "TOKEN_DECIMALS",
        default_value_t = DEFAULT_DECIMALS,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_DECIMALS)),
        global = true
    )]
    token_decimals: u32,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the catalog as CSV.
    Catalog,
    /// Select items and pay for them against an in-memory ledger.
    Checkout(CheckoutArgs),
}

#[derive(Args)]
struct CheckoutArgs {
    /// Toggle selection of an item (repeatable).
    #[arg(long = "select")]
    select: Vec<u32>,

    /// Toggle the description panel of an item (repeatable).
    #[arg(long = "expand")]
    expand: Vec<u32>,

    /// Network the wallet is connected to. Without it no signer is attached.
    #[arg(long)]
    wallet_network: Option<u64>,

    /// Account the wallet signs with.
    #[arg(long, default_value = DEFAULT_WALLET_ACCOUNT)]
    wallet_account: Address,

    /// Token balance minted to the wallet before checkout.
    #[arg(long, default_value = "10")]
    balance: String,

    /// Force a failure at this step.
    #[arg(long, value_enum)]
    fail_step: Option<Step>,

    /// How the forced failure manifests.
    #[arg(long, value_enum, default_value = "revert")]
    fault: FaultKind,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args)]
struct ConfigArgs {
    /// Chain id of the network hosting the settlement contract.
    #[arg(long, env = "DESTINATION_NETWORK_IDENTITY")]
    destination_network: u64,

    #[arg(long, env = "SETTLEMENT_CONTRACT_ADDRESS")]
    settlement_contract: Option<Address>,

    #[arg(long, env = "PAYMENT_TOKEN_ADDRESS")]
    payment_token: Option<Address>,

    #[arg(long, env = "RELAY_CONTRACT_ADDRESS")]
    relay_contract: Option<Address>,

    #[arg(long, env = "RELAY_PAYMENT_TOKEN_ADDRESS", default_value = DEFAULT_RELAY_PAYMENT_TOKEN)]
    relay_payment_token: Address,

    #[arg(long, env = "DESTINATION_CHAIN_SELECTOR", default_value_t = DEFAULT_DESTINATION_CHAIN_SELECTOR.0)]
    destination_chain_selector: u64,
}

impl ConfigArgs {
    fn into_config(self, token_decimals: u32) -> CheckoutConfig {
        CheckoutConfig {
            destination_network: NetworkId(self.destination_network),
            settlement_contract: self.settlement_contract,
            payment_token: self.payment_token,
            relay_contract: self.relay_contract,
            relay_payment_token: Some(self.relay_payment_token),
            destination_chain_selector: ChainSelector(self.destination_chain_selector),
            token_decimals,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Step {
    Approve,
    Transfer,
    SelectItems,
    SendMessage,
}

impl From<Step> for Operation {
    fn from(step: Step) -> Self {
        match step {
            Step::Approve => Operation::Approve,
            Step::Transfer => Operation::Transfer,
            Step::SelectItems => Operation::SelectItems,
            Step::SendMessage => Operation::SendMessage,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FaultKind {
    Decline,
    Reject,
    Revert,
}

impl From<FaultKind> for Fault {
    fn from(kind: FaultKind) -> Self {
        match kind {
            FaultKind::Decline => Fault::Decline,
            FaultKind::Reject => Fault::RejectSubmission,
            FaultKind::Revert => Fault::Revert,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let catalog = load_catalog(cli.catalog.as_deref(), cli.token_decimals)?;

    match cli.command {
        Command::Catalog => {
            let stdout = io::stdout();
            let mut writer = CatalogWriter::new(stdout.lock());
            writer
                .write_catalog(&catalog, cli.token_decimals)
                .into_diagnostic()?;
            Ok(())
        }
        Command::Checkout(args) => checkout(catalog, args, cli.token_decimals).await,
    }
}

fn load_catalog(path: Option<&Path>, decimals: u32) -> Result<Catalog> {
    match path {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            CatalogReader::new(file, decimals)
                .read_catalog()
                .into_diagnostic()
        }
        None => Ok(Catalog::lab_tests()),
    }
}

async fn checkout(catalog: Catalog, args: CheckoutArgs, decimals: u32) -> Result<()> {
    let config = args.config.into_config(decimals);
    for path in [PaymentPath::Local, PaymentPath::Relayed] {
        let missing = config.missing_for(path);
        if !missing.is_empty() {
            warn!(?path, ?missing, "Payment path is not fully configured");
        }
    }

    let balance = BaseUnits::parse_units(&args.balance, decimals).into_diagnostic()?;
    let ledger = SimulatedLedger::new();
    if let (Some(settlement), Some(token)) = (&config.settlement_contract, &config.payment_token) {
        ledger
            .deploy_settlement(settlement.clone(), token.clone(), &catalog)
            .await;
        ledger.mint(token, &args.wallet_account, balance).await;
    }
    if let (Some(relay), Some(token)) = (&config.relay_contract, &config.relay_payment_token) {
        ledger.deploy_relay(relay.clone(), token.clone()).await;
        ledger.mint(token, &args.wallet_account, balance).await;
    }
    if let Some(step) = args.fail_step {
        ledger.inject_fault(step.into(), args.fault.into()).await;
    }

    let session = CheckoutSession::new(Arc::new(catalog), config);
    for id in args.select {
        session.toggle_selection(ItemId(id)).await;
    }
    for id in args.expand {
        session.toggle_description(ItemId(id)).await;
    }

    if let Some(network) = args.wallet_network {
        let wallet: SigningContextRef = Arc::new(SimulatedWallet::new(
            ledger.clone(),
            args.wallet_account,
            NetworkId(network),
        ));
        let identity = session.attach_signer(Some(wallet)).await;
        info!(?identity, "Wallet attached");
    }

    let outcome = session.submit().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&outcome).into_diagnostic()?
    );

    if outcome.is_success() {
        Ok(())
    } else {
        let reason = outcome
            .failure_reason
            .map(|r| format!("{r:?}"))
            .unwrap_or_default();
        Err(miette!("checkout failed: {reason}"))
    }
}
