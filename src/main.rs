use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use dogsearch::config::{self, ServiceConfig};
use dogsearch::db::{DbPools, PgBackend};
use dogsearch::http::HttpServer;
use dogsearch::lifecycle::Shutdown;
use dogsearch::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "dogsearch")]
#[command(about = "Cancelable-query demo service", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/dogsearch.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let args = Args::parse();
    let config = if args.config.exists() {
        config::load_config(&args.config)?
    } else {
        tracing::warn!(path = %args.config.display(), "Config file not found, using defaults");
        ServiceConfig::default()
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        pool_max = config.database.pool_max,
        fallback_pool_max = config.database.fallback_pool_max,
        result_limit = config.search.result_limit,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let pools = DbPools::connect(&config.database)?;
    let backend = Arc::new(PgBackend::new(pools));
    backend.ensure_schema().await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    shutdown.trigger_on_signals();

    let server = HttpServer::new(&config, backend);
    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
