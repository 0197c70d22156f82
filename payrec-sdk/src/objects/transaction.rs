//! Transaction DTOs for the payments API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction state for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `payrec-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Open,
    InProgress,
    Paid,
    Failed,
    Cancelled,
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Open => write!(f, "open"),
            TransactionState::InProgress => write!(f, "in_progress"),
            TransactionState::Paid => write!(f, "paid"),
            TransactionState::Failed => write!(f, "failed"),
            TransactionState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Request body for `POST /payments/transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    /// Merchant-side order reference.
    pub merchant_reference: String,
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// URL that receives signed state-change notifications.
    pub notify_url: String,
}

/// Transaction as returned by the payments API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub transaction_id: Uuid,
    pub merchant_reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub state: TransactionState,
    /// Raw result code of the most recent stored gateway response, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result_code: Option<String>,
    /// Unix timestamp of transaction creation.
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TransactionState::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(TransactionState::Paid.to_string(), "paid");
    }
}
