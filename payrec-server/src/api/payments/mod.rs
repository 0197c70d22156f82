//! Payments API handlers.
//!
//! These endpoints are called by the shop backend and by the checkout
//! frontend's return flow.
//!
//! # Endpoints
//!
//! - `POST /transactions`                           – create a transaction
//! - `GET  /transactions/{transaction_id}`          – poll transaction status
//! - `POST /transactions/{transaction_id}/result`   – submit a raw gateway response
//! - `POST /transactions/{transaction_id}/details`  – forward checkout details to the gateway
//!
//! The two submission endpoints converge on [`apply_gateway_response`]:
//! persist the raw payload, normalize it, reconcile the transaction state
//! machine under a per-transaction advisory lock, and project the outcome
//! back to the caller.

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use kanau::processor::Processor;
use payrec_core::entities::payment_responses::InsertPaymentResponse;
use payrec_core::entities::transaction_records::{GetTransactionRecordById, TransactionRecord};
use payrec_core::framework::DatabaseProcessor;
use payrec_core::gateway::GatewayError;
use payrec_core::reconcile::{
    HostPlatform, ReconcileError, ReconcileOutcome, TransactionLock, TransactionReconciler,
    normalize, project,
};
use payrec_sdk::objects::{GatewayResponse, PaymentResultResponse, TransactionResponse};
use uuid::Uuid;

use crate::state::AppState;

mod create_transaction;
mod get_status;
mod submit_details;
mod submit_result;

/// Build the Payments API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            post(create_transaction::create_transaction),
        )
        .route(
            "/transactions/{transaction_id}",
            get(get_status::get_status),
        )
        .route(
            "/transactions/{transaction_id}/result",
            post(submit_result::submit_result),
        )
        .route(
            "/transactions/{transaction_id}/details",
            post(submit_details::submit_details),
        )
}

/// Convert a `TransactionRecord` (DB model) into a `TransactionResponse`
/// (API model).
fn to_response(record: &TransactionRecord, last_result_code: Option<String>) -> TransactionResponse {
    TransactionResponse {
        transaction_id: record.transaction_id,
        merchant_reference: record.merchant_reference.clone(),
        amount: record.amount,
        currency: record.currency.clone(),
        state: record.state.into(),
        last_result_code,
        created_at: record.created_at.assume_utc().unix_timestamp(),
    }
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in Payments API handlers.
#[derive(Debug)]
enum PaymentApiError {
    /// A database query failed.
    Database(sqlx::Error),
    /// The requested transaction was not found.
    NotFound,
    /// The request body is not a usable gateway response.
    InvalidBody(serde_json::Error),
    /// The notify URL is not a valid absolute URL.
    InvalidNotifyUrl,
    /// The result submission carried no signature but one is required.
    MissingSignature,
    /// The result submission signature did not verify.
    InvalidSignature,
    /// The outbound gateway call failed.
    Gateway(GatewayError),
    /// Reconciliation failed in one of the host collaborators.
    Reconcile(ReconcileError),
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            PaymentApiError::Database(e) => {
                tracing::error!(error = %e, "Payments API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            PaymentApiError::NotFound => {
                (StatusCode::NOT_FOUND, "transaction not found").into_response()
            }
            PaymentApiError::InvalidBody(e) => {
                (StatusCode::BAD_REQUEST, format!("invalid request body: {e}")).into_response()
            }
            PaymentApiError::InvalidNotifyUrl => {
                (StatusCode::BAD_REQUEST, "notifyUrl must be an absolute URL").into_response()
            }
            PaymentApiError::MissingSignature => {
                (StatusCode::UNAUTHORIZED, "missing signature header").into_response()
            }
            PaymentApiError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "invalid signature").into_response()
            }
            PaymentApiError::Gateway(e) => {
                tracing::error!(error = %e, "Gateway call failed");
                (StatusCode::BAD_GATEWAY, "gateway call failed").into_response()
            }
            PaymentApiError::Reconcile(e) => {
                tracing::error!(error = %e, "Reconciliation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared reconciliation flow
// ---------------------------------------------------------------------------

/// Persist one gateway response, reconcile the transaction, and project the
/// result for the caller.
///
/// Serializes concurrent submissions for the same transaction with a
/// per-transaction advisory lock: the state read and the transition write
/// inside the reconciler are not atomic.
async fn apply_gateway_response(
    state: &AppState,
    transaction_id: Uuid,
    response: GatewayResponse,
) -> Result<PaymentResultResponse, PaymentApiError> {
    let lock = TransactionLock::acquire(&state.db, transaction_id)
        .await
        .map_err(PaymentApiError::Database)?;

    let result = reconcile_locked(state, transaction_id, response).await;

    lock.release().await;
    result
}

/// The lock-holding section of [`apply_gateway_response`].
async fn reconcile_locked(
    state: &AppState,
    transaction_id: Uuid,
    response: GatewayResponse,
) -> Result<PaymentResultResponse, PaymentApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let record = processor
        .process(GetTransactionRecordById { transaction_id })
        .await
        .map_err(PaymentApiError::Database)?
        .ok_or(PaymentApiError::NotFound)?;

    // Store the raw payload first so it survives whatever happens next.
    let raw_response =
        serde_json::to_value(&response).map_err(PaymentApiError::InvalidBody)?;
    processor
        .process(InsertPaymentResponse {
            transaction_id,
            result_code: response.result_code.clone(),
            raw_response,
        })
        .await
        .map_err(PaymentApiError::Database)?;

    let normalized = normalize(&response);

    let host = HostPlatform::new(state.db.clone(), state.event_senders.notify_event.clone());
    let reconciler = TransactionReconciler::new(host.clone(), host);

    let outcome = reconciler
        .reconcile(
            transaction_id,
            &normalized,
            record.state,
            &record.custom_fields_map(),
        )
        .await
        .map_err(PaymentApiError::Reconcile)?;

    match &outcome {
        ReconcileOutcome::Applied { transition } => {
            tracing::info!(
                transaction_id = %transaction_id,
                transition = ?transition,
                "Gateway response applied"
            );
        }
        ReconcileOutcome::AlreadyHandled => {
            tracing::debug!(
                transaction_id = %transaction_id,
                result_code = %normalized.result_code,
                "Gateway response already handled"
            );
        }
        ReconcileOutcome::Halted { reason, .. } => {
            tracing::warn!(
                transaction_id = %transaction_id,
                reason = %reason,
                "Payment workflow halted"
            );
        }
    }

    Ok(project(&normalized))
}
