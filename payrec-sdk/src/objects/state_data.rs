//! Checkout state-data key allowlist.
//!
//! Client-collected `stateData` is forwarded to the gateway verbatim except
//! that only approved root keys survive. Anything else a compromised or
//! buggy frontend adds to the payload is dropped before it leaves the
//! server.

/// Root keys allowed in a checkout `stateData` payload.
pub const STATE_DATA_ROOT_KEYS: &[&str] = &[
    "paymentMethod",
    "billingAddress",
    "deliveryAddress",
    "riskData",
    "shopperName",
    "dateOfBirth",
    "telephoneNumber",
    "shopperEmail",
    "countryCode",
    "socialSecurityNumber",
    "browserInfo",
    "installments",
    "storePaymentMethod",
    "conversionId",
    "paymentData",
    "details",
    "origin",
    "billieData",
];

/// Return a copy of `state_data` containing only approved root keys.
///
/// Nested values under approved keys are kept untouched.
pub fn retain_approved_keys(
    state_data: &serde_json::Map<String, serde_json::Value>,
) -> serde_json::Map<String, serde_json::Value> {
    state_data
        .iter()
        .filter(|(key, _)| STATE_DATA_ROOT_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
