//! Payrec Server
//!
//! A headless payment-result reconciliation service: accepts gateway
//! responses for shop transactions, drives the transaction state machine,
//! and notifies the shop backend about final states.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use payrec_core::events::{EventSenders, notify_event_channel};
use payrec_core::gateway::GatewayClient;
use payrec_core::processors::NotifySender;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Payrec - Headless payment-result reconciliation service
#[derive(Parser, Debug)]
#[command(name = "payrec-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./payrec-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting payrec-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Get database URL from environment
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Run migrations if requested
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Event channel between the reconciliation flow and the NotifySender
    let (notify_tx, notify_rx) = notify_event_channel();
    let event_senders = EventSenders {
        notify_event: notify_tx,
    };

    // Shutdown signal for background processors
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Spawn the notification processor
    let shop_secret = loaded_config
        .shop
        .secret
        .clone()
        .into_bytes()
        .into_boxed_slice();
    let notify_sender = NotifySender::new(db_pool.clone(), notify_rx, shutdown_rx, shop_secret);
    let notify_handle = tokio::spawn(notify_sender.run());

    // Outbound gateway client
    let gateway = Arc::new(GatewayClient::new(
        loaded_config.gateway.base_url.clone(),
        loaded_config.gateway.api_key.clone(),
        loaded_config.gateway.merchant_account.clone(),
    ));

    // Create application state
    let state = AppState::new(db_pool.clone(), loaded_config, event_senders, gateway);

    // Spawn config reload handler (listens for SIGHUP)
    let shutdown_notify = spawn_config_reload_handler(state.clone(), config_loader);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Signal the config reload handler and processors to stop
    shutdown_notify.notify_one();
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("All shutdown receivers already dropped");
    }
    if let Err(e) = notify_handle.await {
        tracing::error!("NotifySender task panicked: {}", e);
    }

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
