use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use kanau::processor::Processor;
use payrec_core::entities::transaction_records::InsertTransactionRecord;
use payrec_core::framework::DatabaseProcessor;
use payrec_sdk::objects::CreateTransactionRequest;
use url::Url;

use super::{PaymentApiError, to_response};
use crate::state::AppState;

/// `POST /transactions` — create a transaction in the `open` state.
///
/// The shop backend registers a transaction here before sending the
/// shopper into the checkout flow; the returned id is what all later
/// result submissions address.
pub(super) async fn create_transaction(
    state: State<AppState>,
    Json(body): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    // Notifications are delivered by POST, so the URL must be absolute.
    if Url::parse(&body.notify_url).is_err() {
        return Err(PaymentApiError::InvalidNotifyUrl);
    }

    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let record = processor
        .process(InsertTransactionRecord {
            merchant_reference: body.merchant_reference,
            amount: body.amount,
            currency: body.currency,
            notify_url: body.notify_url,
        })
        .await
        .map_err(PaymentApiError::Database)?;

    tracing::info!(
        transaction_id = %record.transaction_id,
        merchant_reference = %record.merchant_reference,
        "Transaction created"
    );

    Ok((StatusCode::CREATED, Json(to_response(&record, None))))
}
