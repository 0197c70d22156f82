//! Production host-platform adapter.
//!
//! Implements the capability traits over Postgres: transitions update the
//! transaction row and final states emit a [`NotifyEvent`] for the
//! notification processor. Also provides the per-transaction advisory lock
//! the ingestion callers use to serialize reconciliation (the state read
//! and the transition write are not atomic, see the reconciler docs).

use super::state_machine::{CustomFieldsStore, StoreError, TransactionTransitions, TransitionError};
use crate::entities::TransactionState;
use crate::entities::transaction_records::{TransactionRecord, UpdateTransactionState};
use crate::events::{NotifyEvent, NotifyEventSender};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;
use tracing::{error, warn};
use uuid::Uuid;

/// Host adapter holding the pool and the notify channel.
#[derive(Clone)]
pub struct HostPlatform {
    pool: PgPool,
    notify_tx: NotifyEventSender,
}

impl HostPlatform {
    pub fn new(pool: PgPool, notify_tx: NotifyEventSender) -> Self {
        Self { pool, notify_tx }
    }

    async fn set_state(
        &self,
        transaction_id: Uuid,
        state: TransactionState,
    ) -> Result<(), TransitionError> {
        let processor = DatabaseProcessor {
            pool: self.pool.clone(),
        };
        processor
            .process(UpdateTransactionState {
                transaction_id,
                state,
            })
            .await?;
        Ok(())
    }

    /// Emit a state-change notification; delivery failures never fail the
    /// transition (the retry loop picks the transaction up later).
    async fn emit(&self, transaction_id: Uuid, new_state: TransactionState) {
        let event = NotifyEvent::PaymentStateChanged {
            transaction_id,
            new_state,
        };
        if let Err(e) = self.notify_tx.send(event).await {
            error!(
                transaction_id = %transaction_id,
                error = %e,
                "Failed to emit PaymentStateChanged event"
            );
        }
    }
}

#[async_trait]
impl TransactionTransitions for HostPlatform {
    async fn paid(&self, transaction_id: Uuid) -> Result<(), TransitionError> {
        self.set_state(transaction_id, TransactionState::Paid).await?;
        self.emit(transaction_id, TransactionState::Paid).await;
        Ok(())
    }

    async fn fail(&self, transaction_id: Uuid) -> Result<(), TransitionError> {
        self.set_state(transaction_id, TransactionState::Failed)
            .await?;
        self.emit(transaction_id, TransactionState::Failed).await;
        Ok(())
    }

    async fn process(&self, transaction_id: Uuid) -> Result<(), TransitionError> {
        // In-flight; the shop is only notified about final states.
        self.set_state(transaction_id, TransactionState::InProgress)
            .await
    }
}

#[async_trait]
impl CustomFieldsStore for HostPlatform {
    async fn write_custom_fields(
        &self,
        transaction_id: Uuid,
        custom_fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), StoreError> {
        TransactionRecord::replace_custom_fields(
            &self.pool,
            transaction_id,
            serde_json::Value::Object(custom_fields),
        )
        .await?;
        Ok(())
    }
}

/// Session-scoped Postgres advisory lock keyed on a transaction id.
///
/// Holds a dedicated pooled connection for the lock's lifetime. Callers
/// must call [`release`](Self::release); dropping the guard returns the
/// connection to the pool without unlocking, and the lock then lingers
/// until that session ends.
pub struct TransactionLock {
    conn: sqlx::pool::PoolConnection<sqlx::Postgres>,
    key: i64,
}

impl TransactionLock {
    /// Block until the per-transaction lock is acquired.
    pub async fn acquire(pool: &PgPool, transaction_id: Uuid) -> Result<Self, sqlx::Error> {
        let key = advisory_key(transaction_id);
        let mut conn = pool.acquire().await?;
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(key)
            .execute(&mut *conn)
            .await?;
        Ok(Self { conn, key })
    }

    /// Release the lock and return the connection to the pool.
    pub async fn release(mut self) {
        if let Err(e) = sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(self.key)
            .execute(&mut *self.conn)
            .await
        {
            warn!(key = self.key, error = %e, "Failed to release advisory lock");
        }
    }
}

/// Fold a 128-bit transaction id into the 64-bit advisory lock keyspace.
fn advisory_key(transaction_id: Uuid) -> i64 {
    let (high, low) = transaction_id.as_u64_pair();
    (high ^ low) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisory_key_is_deterministic() {
        let id = Uuid::from_u128(0xdead_beef_cafe);
        assert_eq!(advisory_key(id), advisory_key(id));
    }

    #[test]
    fn test_advisory_key_separates_transactions() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        assert_ne!(advisory_key(a), advisory_key(b));
    }
}
