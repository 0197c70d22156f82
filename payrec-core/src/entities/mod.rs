pub mod payment_responses;
pub mod transaction_records;

use payrec_sdk::objects::TransactionState as SdkTransactionState;

/// Transaction state for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `payrec_sdk::objects::TransactionState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "transaction_state")]
pub enum TransactionState {
    Open,
    InProgress,
    Paid,
    Failed,
    Cancelled,
}

impl From<TransactionState> for SdkTransactionState {
    fn from(value: TransactionState) -> Self {
        match value {
            TransactionState::Open => SdkTransactionState::Open,
            TransactionState::InProgress => SdkTransactionState::InProgress,
            TransactionState::Paid => SdkTransactionState::Paid,
            TransactionState::Failed => SdkTransactionState::Failed,
            TransactionState::Cancelled => SdkTransactionState::Cancelled,
        }
    }
}

impl From<SdkTransactionState> for TransactionState {
    fn from(value: SdkTransactionState) -> Self {
        match value {
            SdkTransactionState::Open => TransactionState::Open,
            SdkTransactionState::InProgress => TransactionState::InProgress,
            SdkTransactionState::Paid => TransactionState::Paid,
            SdkTransactionState::Failed => TransactionState::Failed,
            SdkTransactionState::Cancelled => TransactionState::Cancelled,
        }
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkTransactionState::from(*self).fmt(f)
    }
}
