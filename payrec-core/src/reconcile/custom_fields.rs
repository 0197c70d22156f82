//! First-writer-wins merge of response metadata into transaction custom
//! fields.
//!
//! The custom-field document is shared with other collaborators; this
//! module only stages its three well-known keys and never disturbs the
//! rest of the document.

use super::classifier::NormalizedResult;

/// Custom-field key for the first-seen PSP reference.
pub const ORIGINAL_PSP_REFERENCE_KEY: &str = "originalPspReference";
/// Custom-field key for the first-seen gateway action payload.
pub const ACTION_KEY: &str = "action";
/// Custom-field key for the first-seen additional data.
pub const ADDITIONAL_DATA_KEY: &str = "additionalData";

/// Source of the staged `additionalData` custom field.
///
/// The upstream implementation populates `additionalData` from the *action*
/// accessor, which looks like a copy-paste slip but has never been
/// confirmed as one. The literal behavior is therefore the default, and
/// the corrected reading is available as an explicitly opt-in variant —
/// do not switch the default without a product decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdditionalDataPolicy {
    /// Stage `additionalData` from the action payload (upstream-literal).
    #[default]
    MirrorAction,
    /// Stage `additionalData` from the actual additional-data mapping.
    FromAdditionalData,
}

/// Stage first-writer-wins updates and merge them onto the stored document.
///
/// Returns `None` when nothing needs writing: every key of interest is
/// either already set in `stored` or absent from the normalized result.
/// When `Some`, the returned document is the *full* stored document with
/// the staged keys added — unrelated keys are never dropped.
pub fn stage_custom_fields(
    normalized: &NormalizedResult,
    stored: &serde_json::Map<String, serde_json::Value>,
    policy: AdditionalDataPolicy,
) -> Option<serde_json::Map<String, serde_json::Value>> {
    let mut merged = stored.clone();
    let mut changed = false;

    if slot_is_empty(stored, ORIGINAL_PSP_REFERENCE_KEY) && !normalized.psp_reference.is_empty() {
        merged.insert(
            ORIGINAL_PSP_REFERENCE_KEY.to_string(),
            serde_json::Value::String(normalized.psp_reference.clone()),
        );
        changed = true;
    }

    if slot_is_empty(stored, ACTION_KEY) {
        if let Some(action) = non_empty(normalized.action.as_ref()) {
            merged.insert(ACTION_KEY.to_string(), action.clone());
            changed = true;
        }
    }

    if slot_is_empty(stored, ADDITIONAL_DATA_KEY) {
        let staged = match policy {
            AdditionalDataPolicy::MirrorAction => non_empty(normalized.action.as_ref()).cloned(),
            AdditionalDataPolicy::FromAdditionalData => normalized
                .additional_data
                .as_ref()
                .filter(|data| !data.is_empty())
                .map(|data| {
                    serde_json::Value::Object(
                        data.iter()
                            .map(|(key, value)| {
                                (key.clone(), serde_json::Value::String(value.clone()))
                            })
                            .collect(),
                    )
                }),
        };
        if let Some(value) = staged {
            merged.insert(ADDITIONAL_DATA_KEY.to_string(), value);
            changed = true;
        }
    }

    changed.then_some(merged)
}

/// A slot counts as empty when the key is absent or holds an empty value.
fn slot_is_empty(stored: &serde_json::Map<String, serde_json::Value>, key: &str) -> bool {
    non_empty(stored.get(key)).is_none()
}

fn non_empty(value: Option<&serde_json::Value>) -> Option<&serde_json::Value> {
    value.filter(|value| match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Object(map) => !map.is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        _ => true,
    })
}
