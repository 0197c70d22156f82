//! Caller-facing response projection.

use super::classifier::NormalizedResult;
use payrec_sdk::objects::{PaymentResultResponse, ResultCode};

/// Derive the minimal caller-facing response from a normalized result.
///
/// Pure function, independent of reconciliation: the internal
/// [`NormalizedResult`] keeps `Unsupported`, but the caller-facing code is
/// normalized to `Error` for anything outside the known final and
/// in-flight sets.
pub fn project(normalized: &NormalizedResult) -> PaymentResultResponse {
    match normalized.result_code {
        ResultCode::Authorised | ResultCode::Refused | ResultCode::Error => PaymentResultResponse {
            is_final: true,
            result_code: normalized.result_code,
            action: None,
            additional_data: None,
        },
        ResultCode::RedirectShopper
        | ResultCode::IdentifyShopper
        | ResultCode::ChallengeShopper
        | ResultCode::PresentToShopper => PaymentResultResponse {
            is_final: false,
            result_code: normalized.result_code,
            action: normalized.action.clone(),
            additional_data: None,
        },
        ResultCode::Received => PaymentResultResponse {
            is_final: true,
            result_code: ResultCode::Received,
            action: None,
            additional_data: normalized.additional_data.clone(),
        },
        ResultCode::Canceled | ResultCode::Unsupported => PaymentResultResponse {
            is_final: true,
            result_code: ResultCode::Error,
            action: None,
            additional_data: None,
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::BTreeMap;

    fn normalized(result_code: ResultCode) -> NormalizedResult {
        NormalizedResult {
            result_code,
            psp_reference: "psp-1".to_string(),
            action: Some(serde_json::json!({"type": "redirect", "url": "https://x"})),
            additional_data: Some(BTreeMap::from([(
                "paymentMethod".to_string(),
                "scheme".to_string(),
            )])),
        }
    }

    #[test]
    fn test_final_codes_carry_the_code_only() {
        for code in [ResultCode::Authorised, ResultCode::Refused, ResultCode::Error] {
            // Even when the normalized result carries action and
            // additional data, the final projection drops both.
            let response = project(&normalized(code));
            assert!(response.is_final);
            assert_eq!(response.result_code, code);
            assert!(response.action.is_none());
            assert!(response.additional_data.is_none());
        }
    }

    #[test]
    fn test_in_flight_codes_carry_the_action() {
        for code in [
            ResultCode::RedirectShopper,
            ResultCode::IdentifyShopper,
            ResultCode::ChallengeShopper,
            ResultCode::PresentToShopper,
        ] {
            let response = project(&normalized(code));
            assert!(!response.is_final);
            assert_eq!(response.result_code, code);
            assert!(response.action.is_some());
            assert!(response.additional_data.is_none());
        }
    }

    #[test]
    fn test_received_is_final_with_additional_data() {
        let response = project(&normalized(ResultCode::Received));
        assert!(response.is_final);
        assert_eq!(response.result_code, ResultCode::Received);
        assert!(response.action.is_none());
        assert_eq!(
            response
                .additional_data
                .as_ref()
                .and_then(|data| data.get("paymentMethod"))
                .map(String::as_str),
            Some("scheme")
        );
    }

    #[test]
    fn test_unsupported_projects_as_error() {
        for code in [ResultCode::Unsupported, ResultCode::Canceled] {
            let response = project(&normalized(code));
            assert!(response.is_final);
            assert_eq!(response.result_code, ResultCode::Error);
            assert!(response.action.is_none());
            assert!(response.additional_data.is_none());
        }
    }

    #[test]
    fn test_redirect_scenario_round_trip() {
        let normalized = NormalizedResult {
            result_code: ResultCode::RedirectShopper,
            psp_reference: String::new(),
            action: Some(serde_json::json!({"type": "redirect", "url": "https://x"})),
            additional_data: None,
        };
        let json = serde_json::to_value(project(&normalized)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "isFinal": false,
                "resultCode": "RedirectShopper",
                "action": {"type": "redirect", "url": "https://x"}
            })
        );
    }
}
