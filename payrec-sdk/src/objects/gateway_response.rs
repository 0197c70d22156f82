//! Raw payment-gateway response payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An asynchronous payment response as delivered by the gateway.
///
/// The payload is loosely typed: only `resultCode` is required (a payload
/// without it is rejected at deserialization — callers must validate before
/// handing it to the core). All unknown keys are preserved in `extra` so
/// the full content survives for diagnostics and raw persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    /// Raw result code string; mapping to [`super::ResultCode`] happens in
    /// the classifier.
    pub result_code: String,
    /// Gateway-assigned opaque transaction identifier, if provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psp_reference: Option<String>,
    /// Merchant-side order reference echoed back by the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_reference: Option<String>,
    /// Gateway-defined next-step payload (redirect, challenge, voucher, ...).
    /// Passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<serde_json::Value>,
    /// Gateway-defined additional data. Passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<BTreeMap<String, String>>,
    /// Any keys the core does not read.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_minimal_response() {
        let response: GatewayResponse =
            serde_json::from_str(r#"{"resultCode": "Authorised"}"#).unwrap();
        assert_eq!(response.result_code, "Authorised");
        assert!(response.psp_reference.is_none());
        assert!(response.action.is_none());
        assert!(response.extra.is_empty());
    }

    #[test]
    fn test_missing_result_code_is_rejected() {
        let err = serde_json::from_str::<GatewayResponse>(r#"{"pspReference": "881"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_unknown_keys_are_preserved() {
        let response: GatewayResponse = serde_json::from_str(
            r#"{
                "resultCode": "RedirectShopper",
                "pspReference": "881574",
                "action": {"type": "redirect", "url": "https://x"},
                "fraudResult": {"accountScore": 50}
            }"#,
        )
        .unwrap();
        assert_eq!(response.psp_reference.as_deref(), Some("881574"));
        assert!(response.extra.contains_key("fraudResult"));
    }
}
