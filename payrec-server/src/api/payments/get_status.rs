use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use payrec_core::entities::payment_responses::GetLatestPaymentResponse;
use payrec_core::entities::transaction_records::GetTransactionRecordById;
use payrec_core::framework::DatabaseProcessor;
use uuid::Uuid;

use super::{PaymentApiError, to_response};
use crate::state::AppState;

/// `GET /transactions/{transaction_id}` — poll transaction status.
pub(super) async fn get_status(
    state: State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let record = processor
        .process(GetTransactionRecordById { transaction_id })
        .await
        .map_err(PaymentApiError::Database)?
        .ok_or(PaymentApiError::NotFound)?;

    let last_result_code = processor
        .process(GetLatestPaymentResponse { transaction_id })
        .await
        .map_err(PaymentApiError::Database)?
        .map(|response| response.result_code);

    Ok(Json(to_response(&record, last_result_code)))
}
