//! Capability traits toward the host platform.
//!
//! The reconciler never talks to the host order workflow or its storage
//! directly; it depends on these two traits so tests can substitute
//! in-memory fakes. The production implementation is
//! [`super::host::HostPlatform`].

use async_trait::async_trait;
use uuid::Uuid;

/// Errors raised by a state-machine transition.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The host refused the transition.
    #[error("transition rejected: {0}")]
    Rejected(String),
}

/// Errors raised by the custom-fields store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The host order/transaction state machine, consumed as an abstract
/// capability.
///
/// Each operation is synchronous from the core's perspective and is
/// invoked at most once per reconciliation call; the implementations own
/// their persistence.
#[async_trait]
pub trait TransactionTransitions: Send + Sync {
    /// Mark the transaction as paid.
    async fn paid(&self, transaction_id: Uuid) -> Result<(), TransitionError>;

    /// Mark the transaction as failed.
    async fn fail(&self, transaction_id: Uuid) -> Result<(), TransitionError>;

    /// Mark the transaction as in progress (awaiting shopper interaction
    /// or asynchronous confirmation).
    async fn process(&self, transaction_id: Uuid) -> Result<(), TransitionError>;
}

/// Write access to a transaction's custom-field document.
///
/// Whole-document writes only; the caller supplies the already-merged map.
#[async_trait]
pub trait CustomFieldsStore: Send + Sync {
    async fn write_custom_fields(
        &self,
        transaction_id: Uuid,
        custom_fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), StoreError>;
}
