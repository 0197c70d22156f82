//! Response classification.
//!
//! Turns a raw [`GatewayResponse`] into a [`NormalizedResult`] and performs
//! the side-effect-free diagnostics logging for the unhappy result codes.

use payrec_sdk::objects::{GatewayResponse, ResultCode};
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Normalized view of one gateway response.
///
/// Constructed once per inbound response and immutable afterwards; values
/// that must outlive the reconciliation call are copied into the
/// transaction's custom fields by the reconciler, never kept here.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    /// Always set; unrecognized gateway strings become
    /// [`ResultCode::Unsupported`].
    pub result_code: ResultCode,
    /// Empty string means "not provided" — there is no null/empty
    /// distinction.
    pub psp_reference: String,
    /// Opaque gateway action payload, passed through untouched.
    pub action: Option<serde_json::Value>,
    /// Opaque gateway additional data, passed through untouched.
    pub additional_data: Option<BTreeMap<String, String>>,
}

/// Classify a gateway response.
///
/// Never fails: unknown result codes map to [`ResultCode::Unsupported`].
/// Refused responses are logged with the merchant reference; Error and
/// Unsupported responses are logged with the full raw payload.
pub fn normalize(response: &GatewayResponse) -> NormalizedResult {
    let result_code = ResultCode::from_gateway(&response.result_code);

    match result_code {
        ResultCode::Refused => {
            error!(
                merchant_reference = response.merchant_reference.as_deref().unwrap_or(""),
                "Payment was refused by the gateway"
            );
        }
        ResultCode::Error => {
            error!(
                raw_response = ?response,
                "Gateway reported a payment error"
            );
        }
        ResultCode::Unsupported => {
            error!(
                result_code = %response.result_code,
                raw_response = ?response,
                "Unsupported result code in gateway response"
            );
        }
        _ => {
            debug!(result_code = %result_code, "Classified gateway response");
        }
    }

    NormalizedResult {
        result_code,
        psp_reference: response.psp_reference.clone().unwrap_or_default(),
        action: response.action.clone(),
        additional_data: response.additional_data.clone(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn response(json: serde_json::Value) -> GatewayResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_all_recognized_codes_pass_through() {
        for raw in [
            "Authorised",
            "Refused",
            "RedirectShopper",
            "IdentifyShopper",
            "ChallengeShopper",
            "Received",
            "PresentToShopper",
            "Error",
            "Canceled",
        ] {
            let normalized = normalize(&response(serde_json::json!({"resultCode": raw})));
            assert_eq!(normalized.result_code.as_str(), raw);
        }
    }

    #[test]
    fn test_unknown_code_becomes_unsupported() {
        let normalized = normalize(&response(serde_json::json!({"resultCode": "WeirdCode123"})));
        assert_eq!(normalized.result_code, ResultCode::Unsupported);
    }

    #[test]
    fn test_missing_psp_reference_is_empty_string() {
        let normalized = normalize(&response(serde_json::json!({"resultCode": "Authorised"})));
        assert_eq!(normalized.psp_reference, "");
    }

    #[test]
    fn test_action_and_additional_data_pass_through_untouched() {
        let normalized = normalize(&response(serde_json::json!({
            "resultCode": "RedirectShopper",
            "pspReference": "881574",
            "action": {"type": "redirect", "url": "https://x"},
            "additionalData": {"paymentMethod": "scheme"}
        })));
        assert_eq!(normalized.psp_reference, "881574");
        assert_eq!(
            normalized.action,
            Some(serde_json::json!({"type": "redirect", "url": "https://x"}))
        );
        assert_eq!(
            normalized
                .additional_data
                .as_ref()
                .and_then(|data| data.get("paymentMethod"))
                .map(String::as_str),
            Some("scheme")
        );
    }
}
