//! Gateway result codes.

use serde::{Deserialize, Serialize};

/// Result code assigned by the payment gateway to an asynchronous payment
/// response.
///
/// The set is closed: every gateway string the core does not recognize maps
/// to [`ResultCode::Unsupported`] instead of failing, so downstream matches
/// can stay exhaustive without a catch-all arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    Authorised,
    Refused,
    RedirectShopper,
    IdentifyShopper,
    ChallengeShopper,
    Received,
    PresentToShopper,
    Error,
    Canceled,
    /// Any gateway string not listed above.
    #[serde(other)]
    Unsupported,
}

impl ResultCode {
    /// Map a raw gateway string to a result code.
    ///
    /// Unrecognized strings become [`ResultCode::Unsupported`]; this never
    /// fails.
    pub fn from_gateway(raw: &str) -> Self {
        match raw {
            "Authorised" => ResultCode::Authorised,
            "Refused" => ResultCode::Refused,
            "RedirectShopper" => ResultCode::RedirectShopper,
            "IdentifyShopper" => ResultCode::IdentifyShopper,
            "ChallengeShopper" => ResultCode::ChallengeShopper,
            "Received" => ResultCode::Received,
            "PresentToShopper" => ResultCode::PresentToShopper,
            "Error" => ResultCode::Error,
            "Canceled" => ResultCode::Canceled,
            _ => ResultCode::Unsupported,
        }
    }

    /// The gateway wire string for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Authorised => "Authorised",
            ResultCode::Refused => "Refused",
            ResultCode::RedirectShopper => "RedirectShopper",
            ResultCode::IdentifyShopper => "IdentifyShopper",
            ResultCode::ChallengeShopper => "ChallengeShopper",
            ResultCode::Received => "Received",
            ResultCode::PresentToShopper => "PresentToShopper",
            ResultCode::Error => "Error",
            ResultCode::Canceled => "Canceled",
            ResultCode::Unsupported => "Unsupported",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_recognized_codes_round_trip() {
        let codes = [
            ResultCode::Authorised,
            ResultCode::Refused,
            ResultCode::RedirectShopper,
            ResultCode::IdentifyShopper,
            ResultCode::ChallengeShopper,
            ResultCode::Received,
            ResultCode::PresentToShopper,
            ResultCode::Error,
            ResultCode::Canceled,
        ];
        for code in codes {
            assert_eq!(ResultCode::from_gateway(code.as_str()), code);
        }
    }

    #[test]
    fn test_unknown_string_maps_to_unsupported() {
        assert_eq!(
            ResultCode::from_gateway("WeirdCode123"),
            ResultCode::Unsupported
        );
        assert_eq!(ResultCode::from_gateway(""), ResultCode::Unsupported);
        // Case matters on the wire.
        assert_eq!(
            ResultCode::from_gateway("authorised"),
            ResultCode::Unsupported
        );
    }

    #[test]
    fn test_serde_uses_gateway_strings() {
        let json = serde_json::to_string(&ResultCode::RedirectShopper).unwrap();
        assert_eq!(json, "\"RedirectShopper\"");

        let parsed: ResultCode = serde_json::from_str("\"SomethingNew\"").unwrap();
        assert_eq!(parsed, ResultCode::Unsupported);
    }
}
