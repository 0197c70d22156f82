use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use payrec_sdk::objects::GatewayResponse;
use payrec_sdk::signature::{SIGNATURE_HEADER, verify_raw_body};
use uuid::Uuid;

use super::{PaymentApiError, apply_gateway_response};
use crate::state::AppState;

/// `POST /transactions/{transaction_id}/result` — submit a raw gateway
/// response for reconciliation.
///
/// The body is the gateway's JSON payload verbatim. When a gateway HMAC
/// key is configured, the `Payrec-Signature` header must verify against
/// the raw body bytes before anything is deserialized.
pub(super) async fn submit_result(
    state: State<AppState>,
    Path(transaction_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, PaymentApiError> {
    if let Some(hmac_key) = state.config().await.gateway.hmac_key.as_deref() {
        let header_value = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(PaymentApiError::MissingSignature)?;

        verify_raw_body(header_value, &body, hmac_key.as_bytes()).map_err(|e| {
            tracing::warn!(
                transaction_id = %transaction_id,
                error = %e,
                "Rejected result submission with bad signature"
            );
            PaymentApiError::InvalidSignature
        })?;
    }

    let response: GatewayResponse =
        serde_json::from_slice(&body).map_err(PaymentApiError::InvalidBody)?;

    let projection = apply_gateway_response(&state, transaction_id, response).await?;

    Ok(Json(projection))
}
