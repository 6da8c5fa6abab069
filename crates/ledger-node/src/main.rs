mod api;

use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use ledger_core::{constants, Ledger, LedgerConfig};
use ledger_storage::SledStore;
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Data directory for sled
    #[arg(long, default_value = "./data")]
    data_dir: String,

    /// Leading hex zeros required in block hashes
    #[arg(long, default_value_t = constants::DEFAULT_DIFFICULTY)]
    difficulty: usize,

    /// Pending transactions that trigger a seal
    #[arg(long, default_value_t = constants::DEFAULT_SEAL_THRESHOLD)]
    seal_threshold: usize,

    /// Nonces tried before a seal is abandoned
    #[arg(long, default_value_t = constants::DEFAULT_MAX_MINING_ATTEMPTS)]
    max_mining_attempts: u64,

    /// Search nonces on all cores
    #[arg(long)]
    parallel_mining: bool,

    /// Issuer name bound into certificates
    #[arg(long, default_value = constants::DEFAULT_ISSUER)]
    issuer: String,
}

impl Args {
    fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty: self.difficulty,
            seal_threshold: self.seal_threshold.max(1),
            max_mining_attempts: self.max_mining_attempts,
            parallel_mining: self.parallel_mining,
            issuer: self.issuer.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = args.ledger_config();
    info!(?config, data_dir = %args.data_dir, "starting ledger-node");

    let store = Arc::new(SledStore::open(&args.data_dir)?);
    let ledger = Arc::new(tokio::task::spawn_blocking(move || Ledger::open(store, config)).await??);

    let app = api::router(api::AppState {
        ledger: ledger.clone(),
    });

    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ledger.close()?;
    info!("ledger-node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
