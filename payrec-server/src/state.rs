//! Application state shared across all request handlers.

use crate::config::file::FileConfig;
use payrec_core::events::EventSenders;
use payrec_core::gateway::GatewayClient;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Runtime configuration (can be reloaded via SIGHUP).
    pub config: Arc<RwLock<FileConfig>>,
    /// Senders for the background event channels.
    pub event_senders: EventSenders,
    /// Outbound client for the payment gateway.
    pub gateway: Arc<GatewayClient>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: FileConfig,
        event_senders: EventSenders,
        gateway: Arc<GatewayClient>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(RwLock::new(config)),
            event_senders,
            gateway,
        }
    }

    /// Get a read lock on the configuration.
    pub async fn config(&self) -> tokio::sync::RwLockReadGuard<'_, FileConfig> {
        self.config.read().await
    }
}
