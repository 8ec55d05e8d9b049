//! Lenient readers for agent-extracted parameters.
//!
//! The agent delivers numbers as doubles, but slot values typed by users can
//! arrive as strings, so every reader accepts both.

use serde_json::{Map, Value};

use crate::store::model::number_text;

pub type Parameters = Map<String, Value>;

/// Finite numeric parameter, or `None` if missing, null, or unparseable.
pub fn number(params: &Parameters, key: &str) -> Option<f64> {
    match params.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Numeric parameter defaulting to 0.
pub fn number_or_zero(params: &Parameters, key: &str) -> f64 {
    number(params, key).unwrap_or(0.0)
}

/// Boolean parameter; anything unrecognised is false.
pub fn flag(params: &Parameters, key: &str) -> bool {
    match params.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "si" | "sí" | "yes" | "1"
        ),
        _ => false,
    }
}

/// Non-empty string parameter. Numbers are rendered as text, whole numbers
/// without a fraction.
pub fn text(params: &Parameters, key: &str) -> Option<String> {
    let value = match params.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => number_text(n),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

/// A person name: either a plain string or a `{"name": ...}` person entity.
pub fn person_name(params: &Parameters, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::Object(entity) => text(entity, "name"),
        _ => text(params, key),
    }
}
