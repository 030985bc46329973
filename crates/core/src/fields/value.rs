//! Helpers for working with dynamically typed field values.

use serde_json::{Number, Value};

/// Exact type-and-value equality without coercion.
///
/// Numbers compare by numeric value so `1` equals `1.0`; containers compare
/// element-wise with the same rule.
pub fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| strict_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| strict_eq(v, w)))
        }
        _ => left == right,
    }
}

/// Whether a value counts as "not filled in" for required checks.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Build a JSON number, preferring the integer representation.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Interpret a value as a positive integer record id.
pub fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(id) if id > 0 => Some(id),
            Some(_) => None,
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f > 0.0)
                .map(|f| f as u64),
        },
        _ => None,
    }
}

/// Parse a string holding a number, tolerating surrounding whitespace.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Decode a JSON-encoded string when its decoded form passes `accept`.
///
/// Anything else is returned unchanged so validators can report it.
pub fn decode_json_string(value: Value, accept: fn(&Value) -> bool) -> Value {
    match &value {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(decoded) if accept(&decoded) => decoded,
            _ => value,
        },
        _ => value,
    }
}

/// Plain-text rendering used for keywords.
pub fn to_plain_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
