use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use payrec_sdk::objects::state_data::retain_approved_keys;
use uuid::Uuid;

use super::{PaymentApiError, apply_gateway_response};
use crate::state::AppState;

/// `POST /transactions/{transaction_id}/details` — forward checkout
/// details (redirect returns, 3DS challenge results) to the gateway.
///
/// The body is filtered against the approved state-data key allowlist
/// before leaving the server; whatever the shopper's browser appended
/// beyond those keys is dropped. The gateway's answer then runs through
/// the same reconciliation flow as a direct result submission.
pub(super) async fn submit_details(
    state: State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(body): Json<serde_json::Map<String, serde_json::Value>>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let details = retain_approved_keys(&body);

    let response = state
        .gateway
        .payment_details(details)
        .await
        .map_err(PaymentApiError::Gateway)?;

    let projection = apply_gateway_response(&state, transaction_id, response).await?;

    Ok(Json(projection))
}
