//! Notification payloads delivered to the shop backend.

use super::transaction::TransactionState;
use crate::signature::Signature;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload for transaction state-change notifications.
///
/// Delivered as a signed POST to the transaction's notify URL whenever the
/// host state machine reaches a final state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStateChangedPayload {
    pub event_type: String,
    pub transaction_id: Uuid,
    pub merchant_reference: String,
    pub state: TransactionState,
    pub amount: String,
    pub timestamp: i64,
}

impl Signature for PaymentStateChangedPayload {}
