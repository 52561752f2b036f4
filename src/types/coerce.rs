// src/types/coerce.rs
//! Tolerant readers for model-produced JSON. Models send `null`, numbers as
//! strings and mixed lists; each reader maps what it can and leaves the rest
//! to the caller's default.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

pub(crate) fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(|s| s.trim().to_string()))
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

// ===== serde field adapters =====

/// Number field that falls back to 0 on `null` or unreadable text
pub(crate) fn number_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(coerce_number(&Value::deserialize(deserializer)?).unwrap_or(0.0))
}

/// Score on the 1-10 scale; unreadable values land on the neutral 5
pub(crate) fn score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(coerce_number(&Value::deserialize(deserializer)?).unwrap_or(5.0))
}

pub(crate) fn list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(string_list(&Value::deserialize(deserializer)?))
}

pub(crate) fn text_or_unknown<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    Ok(non_empty_str(&Value::deserialize(deserializer)?).unwrap_or_else(|| "Unknown".to_string()))
}
