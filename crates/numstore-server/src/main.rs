//! Number Store Server
//!
//! TCP server for the numstore decimal store.

use clap::Parser;
use numstore::{Dispatcher, ExpirationSweeper, NumberStore, StoreConfig};
use numstore_server::NumberServer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "numstore-server")]
#[command(about = "Expiring store of named decimals over JSON-RPC")]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:9999")]
    bind: SocketAddr,

    /// Entry time-to-live in seconds, reset by every set
    #[arg(long, default_value = "300")]
    ttl_secs: u64,

    /// Expiration sweep interval in seconds
    #[arg(long, default_value = "600")]
    sweep_interval_secs: u64,

    /// Number of lock shards for the store
    #[arg(short, long, default_value = "256")]
    shards: usize,

    /// Significant digits kept by division (1-100)
    #[arg(long, default_value = "50")]
    div_precision: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = StoreConfig::new()
        .with_ttl(Duration::from_secs(args.ttl_secs))
        .with_sweep_interval(Duration::from_secs(args.sweep_interval_secs))
        .with_shards(args.shards);

    info!("Starting number store on {}", args.bind);
    info!(
        "Shards: {}, TTL: {:?}, sweep interval: {:?}",
        config.num_shards, config.ttl, config.sweep_interval
    );

    let store = Arc::new(NumberStore::with_config(&config));
    let sweeper = ExpirationSweeper::spawn(store.clone(), config.sweep_interval);

    let dispatcher = Dispatcher::new(store).with_div_precision(args.div_precision);
    info!("Division precision: {} significant digits", dispatcher.div_precision());

    let server = NumberServer::new(dispatcher).bind(args.bind).await?;

    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    server_task.abort();
    sweeper.shutdown();
    info!("Server shutdown complete");

    Ok(())
}
