use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use payrecon::application::engine::PaymentEngine;
use payrecon::config::{DEFAULT_MAX_ATTEMPTS, GatewayConfig, ReconcileConfig};
use payrecon::domain::order::{Order, OrderId};
use payrecon::domain::ports::OrderStoreBox;
use payrecon::infrastructure::clock::TokioClock;
use payrecon::infrastructure::http_gateway::HttpGatewayClient;
use payrecon::infrastructure::in_memory::InMemoryOrderStore;
#[cfg(feature = "storage-rocksdb")]
use payrecon::infrastructure::rocksdb::RocksDbOrderStore;
use payrecon::interfaces::csv::order_reader::OrderReader;
use payrecon::interfaces::csv::order_writer::OrderWriter;
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Orders CSV file to import before running the command
    #[arg(long)]
    orders: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Base URL of the payment gateway
    #[arg(
        long,
        env = "PAYRECON_GATEWAY_URL",
        default_value = "https://api.externalintegration.payex.com"
    )]
    gateway_url: String,

    /// Merchant access token
    #[arg(long, env = "PAYRECON_ACCESS_TOKEN", default_value = "", hide_env_values = true)]
    access_token: String,

    /// Gateway request timeout in milliseconds
    #[arg(long, env = "PAYRECON_TIMEOUT_MS", default_value_t = 30_000)]
    timeout_ms: u64,

    /// Attempt ceiling of the failed-order reconciliation loop
    #[arg(long, env = "PAYRECON_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Wait before each reconciliation attempt, in milliseconds
    #[arg(long, env = "PAYRECON_POLL_INTERVAL_MS", default_value_t = 1_000)]
    poll_interval_ms: u64,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture an authorized payment
    Capture(AmountArgs),
    /// Cancel an authorized payment
    Cancel(AmountArgs),
    /// Refund a captured payment
    Refund(AmountArgs),
    /// Abort a payment the payer has not completed
    Abort { order_id: String },
    /// Fetch the payment's transactions and apply them to the order
    Sync {
        order_id: String,
        /// Only apply this transaction number
        #[arg(long)]
        transaction: Option<u64>,
    },
    /// Poll the gateway until a failed order is authorized
    Reconcile { order_id: String },
}

#[derive(Args)]
struct AmountArgs {
    order_id: String,

    /// Amount in major units. Defaults to the order amount.
    #[arg(long)]
    amount: Option<Decimal>,

    /// Vat amount in major units
    #[arg(long)]
    vat_amount: Option<Decimal>,
}

/// The order store selected on the command line, kept concrete so orders can be imported.
enum Storage {
    InMemory(InMemoryOrderStore),
    #[cfg(feature = "storage-rocksdb")]
    RocksDb(RocksDbOrderStore),
}

impl Storage {
    fn open(db_path: Option<&Path>) -> Result<Self> {
        match db_path {
            #[cfg(feature = "storage-rocksdb")]
            Some(path) => Ok(Storage::RocksDb(
                RocksDbOrderStore::open(path).into_diagnostic()?,
            )),
            #[cfg(not(feature = "storage-rocksdb"))]
            Some(_) => {
                eprintln!(
                    "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
                );
                Ok(Storage::InMemory(InMemoryOrderStore::new()))
            }
            None => Ok(Storage::InMemory(InMemoryOrderStore::new())),
        }
    }

    async fn import(&self, order: Order) -> Result<()> {
        match self {
            Storage::InMemory(store) => store.insert_order(order).await,
            #[cfg(feature = "storage-rocksdb")]
            Storage::RocksDb(store) => store.put_order(&order).into_diagnostic()?,
        }
        Ok(())
    }

    fn boxed(&self) -> OrderStoreBox {
        match self {
            Storage::InMemory(store) => Box::new(store.clone()),
            #[cfg(feature = "storage-rocksdb")]
            Storage::RocksDb(store) => Box::new(store.clone()),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let storage = Storage::open(cli.db_path.as_deref())?;

    if let Some(path) = &cli.orders {
        let file = File::open(path).into_diagnostic()?;
        for order_result in OrderReader::new(file).orders() {
            match order_result {
                Ok(order) => storage.import(order).await?,
                Err(e) => warn!(error = %e, "Error reading order"),
            }
        }
    }

    let gateway_config = GatewayConfig::new(cli.gateway_url, cli.access_token)
        .with_timeout(Duration::from_millis(cli.timeout_ms));
    let gateway = HttpGatewayClient::new(&gateway_config).into_diagnostic()?;

    let engine = PaymentEngine::new(Box::new(gateway), storage.boxed(), Box::new(TokioClock))
        .with_reconcile_config(ReconcileConfig {
            max_attempts: cli.max_attempts,
            poll_interval: Duration::from_millis(cli.poll_interval_ms),
        });

    let order_id = match cli.command {
        Command::Capture(args) => {
            let order_id = OrderId::new(args.order_id);
            engine
                .capture(&order_id, args.amount, args.vat_amount)
                .await
                .into_diagnostic()?;
            order_id
        }
        Command::Cancel(args) => {
            let order_id = OrderId::new(args.order_id);
            engine
                .cancel(&order_id, args.amount, args.vat_amount)
                .await
                .into_diagnostic()?;
            order_id
        }
        Command::Refund(args) => {
            let order_id = OrderId::new(args.order_id);
            engine
                .refund(&order_id, args.amount, args.vat_amount)
                .await
                .into_diagnostic()?;
            order_id
        }
        Command::Abort { order_id } => {
            let order_id = OrderId::new(order_id);
            engine.abort(&order_id).await.into_diagnostic()?;
            order_id
        }
        Command::Sync {
            order_id,
            transaction,
        } => {
            let order_id = OrderId::new(order_id);
            let summary = engine
                .fetch_transactions_and_update_order(&order_id, transaction)
                .await
                .into_diagnostic()?;
            info!(order_id = %order_id, processed = summary.processed, failed = summary.failed, "Transactions applied");
            order_id
        }
        Command::Reconcile { order_id } => {
            let order_id = OrderId::new(order_id);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = shutdown_tx.send(true);
                }
            });

            let outcome = engine
                .reconcile_failed_order(&order_id, shutdown_rx)
                .await
                .into_diagnostic()?;
            info!(order_id = %order_id, ?outcome, "Reconciliation finished");
            order_id
        }
    };

    // Output final state
    let order = engine.get_order(&order_id).await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer.write_orders([&order]).into_diagnostic()?;

    Ok(())
}
