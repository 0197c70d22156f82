//! Caller-facing payment result projection.

use super::ResultCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The minimal response returned to the frontend or API caller after a
/// gateway result has been ingested.
///
/// `is_final` tells the caller whether the payment flow is over or another
/// shopper interaction (redirect, challenge, voucher presentation) is still
/// pending. `action` and `additional_data` are only present for the result
/// codes that carry them; the projection rules live in
/// `payrec-core::reconcile::projector`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResultResponse {
    pub is_final: bool,
    pub result_code: ResultCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<BTreeMap<String, String>>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_absent_fields_are_not_serialized() {
        let response = PaymentResultResponse {
            is_final: true,
            result_code: ResultCode::Authorised,
            action: None,
            additional_data: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"isFinal": true, "resultCode": "Authorised"})
        );
    }

    #[test]
    fn test_action_serializes_untouched() {
        let action = serde_json::json!({"type": "redirect", "url": "https://x"});
        let response = PaymentResultResponse {
            is_final: false,
            result_code: ResultCode::RedirectShopper,
            action: Some(action.clone()),
            additional_data: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["action"], action);
        assert_eq!(json["isFinal"], serde_json::json!(false));
    }
}
