//! Inventory Service
//!
//! Boots the inventory service: database pool and broker consumers come up
//! first, then the HTTP listener; on SIGINT/SIGTERM the listener drains and
//! the subsystems are released in reverse order.
//!
//! ```text
//!                ┌──────────────────────────────────────────────┐
//!   Client  ───▶ │ CORS → request id → trace → timeout → router │
//!                │          /health   {prefix}/openapi.json     │
//!                │          {prefix}/inventory/...              │
//!                └──────────────────────────────────────────────┘
//!                ┌──────────────────────────────────────────────┐
//!                │ lifecycle coordinator                        │
//!                │   startup:  database.initialize              │
//!                │             broker.start_consumers           │
//!                │   shutdown: broker.close                     │
//!                │             database.close                   │
//!                └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use inventory_service::config::{load_config, validate_config_or_err};
use inventory_service::http::inventory;
use inventory_service::lifecycle::{signals, LifecycleCoordinator, Service};
use inventory_service::observability::{logging, metrics};
use inventory_service::subsystems::{LoggingHandler, PostgresDatabase, RedisStreamsBroker};

#[derive(Parser)]
#[command(name = "inventory-service")]
#[command(about = "Inventory Service API", long_about = None)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,

    /// Load and validate the configuration, print it, and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.service.port = port;
        validate_config_or_err(&config)?;
    }

    logging::init_logging(&config.observability);
    tracing::info!("inventory-service v{} starting", env!("CARGO_PKG_VERSION"));

    if cli.check_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::info!(
        bind_address = %config.service.bind_address(),
        api_prefix = %config.service.api_prefix,
        consumers = config.broker.consumers.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let database = Arc::new(PostgresDatabase::new(config.database.clone()));
    let broker = Arc::new(RedisStreamsBroker::new(
        config.broker.clone(),
        Arc::new(LoggingHandler),
    )?);
    let coordinator = Arc::new(LifecycleCoordinator::standard(
        database,
        broker,
        &config.lifecycle,
    ));

    let api = inventory::router(coordinator.subscribe());
    let report = Service::new(config, coordinator)
        .run(api, signals::shutdown_signal())
        .await?;

    if !report.is_clean() {
        tracing::warn!(failed_steps = ?report.failed_steps(), "Shutdown finished with errors");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
