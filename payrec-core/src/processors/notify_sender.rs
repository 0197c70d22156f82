//! NotifySender processor.
//!
//! The NotifySender is responsible for:
//! - Receiving `NotifyEvent` from the queue
//! - Looking up the transaction's notify URL
//! - Sending HTTP POST requests with an HMAC-signed body
//! - Handling retries with exponential backoff (2^0 to 2^11 seconds)
//! - Updating `notify_retry_count` and `notify_last_tried_at` in the
//!   database

use crate::entities::TransactionState;
use crate::entities::transaction_records::{GetTransactionRecordById, TransactionRecord};
use crate::events::{NotifyEvent, NotifyEventReceiver};
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use payrec_sdk::objects::{PaymentStateChangedPayload, TransactionState as SdkTransactionState};
use payrec_sdk::signature::{SIGNATURE_HEADER, SignedObject};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Maximum retry attempts (2^11 = 2048 seconds max backoff)
const MAX_RETRY_COUNT: u32 = 11;

/// Errors that can occur during notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Transaction not found
    #[error("transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// Delivery failed (non-2xx status)
    #[error("notification delivery failed with status {status}: {body}")]
    DeliveryFailed { status: u16, body: String },

    /// Payload serialization error
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Delivers transaction state-change notifications to the shop backend.
pub struct NotifySender {
    pool: PgPool,
    notify_rx: NotifyEventReceiver,
    shutdown_rx: watch::Receiver<bool>,
    shop_secret: Box<[u8]>,
    http_client: reqwest::Client,
}

impl NotifySender {
    pub fn new(
        pool: PgPool,
        notify_rx: NotifyEventReceiver,
        shutdown_rx: watch::Receiver<bool>,
        shop_secret: Box<[u8]>,
    ) -> Self {
        Self {
            pool,
            notify_rx,
            shutdown_rx,
            shop_secret,
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Run the NotifySender until shutdown.
    pub async fn run(mut self) {
        info!("NotifySender started");

        let pool = self.pool.clone();
        let http_client = self.http_client.clone();
        let shop_secret = self.shop_secret.clone();
        let mut retry_shutdown_rx = self.shutdown_rx.clone();

        let retry_handle = tokio::spawn(async move {
            Self::retry_loop(pool, http_client, shop_secret, &mut retry_shutdown_rx).await;
        });

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("NotifySender received shutdown signal");
                        break;
                    }
                }

                Some(event) = self.notify_rx.recv() => {
                    debug!(event = ?event, "Received NotifyEvent");

                    if let Err(e) = self.process_event(event).await {
                        error!(error = %e, "Failed to process NotifyEvent");
                    }
                }

                else => {
                    info!("NotifyEvent channel closed");
                    break;
                }
            }
        }

        let _ = retry_handle.await;

        info!("NotifySender shutdown complete");
    }

    async fn process_event(&self, event: NotifyEvent) -> Result<(), NotifyError> {
        match event {
            NotifyEvent::PaymentStateChanged {
                transaction_id,
                new_state,
            } => self.send_state_notification(transaction_id, new_state).await,
        }
    }

    async fn send_state_notification(
        &self,
        transaction_id: Uuid,
        new_state: TransactionState,
    ) -> Result<(), NotifyError> {
        let processor = DatabaseProcessor {
            pool: self.pool.clone(),
        };
        let Some(record) = processor
            .process(GetTransactionRecordById { transaction_id })
            .await?
        else {
            return Err(NotifyError::TransactionNotFound(transaction_id));
        };

        let result = Self::deliver(
            &self.http_client,
            &self.shop_secret,
            &record,
            new_state.into(),
        )
        .await;

        match &result {
            Ok(()) => {
                TransactionRecord::mark_notify_success(&self.pool, transaction_id).await?;
                info!(transaction_id = %transaction_id, "Notification delivered");
            }
            Err(e) => {
                warn!(
                    transaction_id = %transaction_id,
                    error = %e,
                    retry_count = record.notify_retry_count,
                    "Notification delivery failed"
                );
                TransactionRecord::increment_notify_retry_count(&self.pool, transaction_id).await?;
            }
        }

        result
    }

    /// Build, sign, and POST one notification.
    async fn deliver(
        http_client: &reqwest::Client,
        shop_secret: &[u8],
        record: &TransactionRecord,
        state: SdkTransactionState,
    ) -> Result<(), NotifyError> {
        let payload = PaymentStateChangedPayload {
            event_type: "payment_state_changed".to_string(),
            transaction_id: record.transaction_id,
            merchant_reference: record.merchant_reference.clone(),
            state,
            amount: record.amount.to_string(),
            timestamp: time::OffsetDateTime::now_utc().unix_timestamp(),
        };

        let signed = SignedObject::new(payload, shop_secret)?;

        let response = http_client
            .post(&record.notify_url)
            .header("Content-Type", "application/json")
            .header(SIGNATURE_HEADER, signed.to_header())
            .body(signed.json)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::DeliveryFailed {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Background loop retrying undelivered notifications.
    async fn retry_loop(
        pool: PgPool,
        http_client: reqwest::Client,
        shop_secret: Box<[u8]>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) {
        info!("Notification retry loop started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Notification retry loop shutting down");
                        break;
                    }
                }

                _ = tokio::time::sleep(std::time::Duration::from_secs(10)) => {
                    if let Err(e) =
                        Self::retry_pending(&pool, &http_client, &shop_secret).await
                    {
                        error!(error = %e, "Failed to retry notifications");
                    }
                }
            }
        }
    }

    /// Retry notifications that are due for another attempt.
    async fn retry_pending(
        pool: &PgPool,
        http_client: &reqwest::Client,
        shop_secret: &[u8],
    ) -> Result<(), NotifyError> {
        let due = TransactionRecord::get_for_notify_retry(pool, MAX_RETRY_COUNT as i32, 10).await?;

        for record in due {
            let state: SdkTransactionState = record.state.into();
            match Self::deliver(http_client, shop_secret, &record, state).await {
                Ok(()) => {
                    TransactionRecord::mark_notify_success(pool, record.transaction_id).await?;
                    info!(
                        transaction_id = %record.transaction_id,
                        retry_count = record.notify_retry_count,
                        "Notification retry successful"
                    );
                }
                Err(e) => {
                    TransactionRecord::increment_notify_retry_count(pool, record.transaction_id)
                        .await?;
                    warn!(
                        transaction_id = %record.transaction_id,
                        error = %e,
                        retry_count = record.notify_retry_count + 1,
                        "Notification retry failed"
                    );
                }
            }
        }

        Ok(())
    }
}

/// Calculate the next retry delay based on retry count.
///
/// Uses exponential backoff: 2^retry_count seconds, capped at 2^11.
pub fn calculate_retry_delay(retry_count: u32) -> std::time::Duration {
    let seconds = 2u64.pow(retry_count.min(MAX_RETRY_COUNT));
    std::time::Duration::from_secs(seconds)
}
