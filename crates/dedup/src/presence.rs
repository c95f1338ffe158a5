//! Presence testing for raw record values.
//!
//! A value is absent when it is JSON `null`, an empty string, an empty array,
//! or the configured "recorded as none" sentinel. Everything else, including
//! `0` and `false`, is present.

use serde_json::Value;

/// Default "recorded as none" marker used by the upstream extractors.
pub const DEFAULT_ABSENT_SENTINEL: &str = "无";

pub fn is_absent_text(text: &str, sentinel: &str) -> bool {
    text.is_empty() || text == sentinel
}

pub fn is_absent(value: &Value, sentinel: &str) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => is_absent_text(s, sentinel),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
