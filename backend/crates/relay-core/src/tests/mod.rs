
use crate::Payload;

/// Build a payload from a `serde_json::json!` literal
pub(crate) fn payload(value: serde_json::Value) -> Payload {
    Payload::from(value)
}
