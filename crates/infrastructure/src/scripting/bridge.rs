//! Conversion between JSON values and Rhai values.
//!
//! Variable bags cross the sandbox boundary as JSON. Integers that do not fit
//! an `i64` travel as [`BigNumber`] so their decimal digits survive a round
//! trip. Functions and host objects have no JSON form and are dropped.

use std::fmt;

use rhai::{Array, Dynamic, ImmutableString, Map};
use serde_json::{Number, Value};

/// An integer too large for Rhai's `INT`, kept as its exact decimal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigNumber(pub String);

impl fmt::Display for BigNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// JSON to Rhai.
pub fn to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from_bool(*b),
        Value::Number(n) => number_to_dynamic(n),
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(items) => Dynamic::from_array(items.iter().map(to_dynamic).collect()),
        Value::Object(entries) => {
            let map: Map = entries
                .iter()
                .map(|(k, v)| (k.as_str().into(), to_dynamic(v)))
                .collect();
            Dynamic::from_map(map)
        }
    }
}

fn number_to_dynamic(number: &Number) -> Dynamic {
    if let Some(i) = number.as_i64() {
        return Dynamic::from_int(i);
    }
    let text = number.to_string();
    if !text.contains(['.', 'e', 'E']) {
        return Dynamic::from(BigNumber(text));
    }
    number
        .as_f64()
        .map_or_else(|| Dynamic::from(BigNumber(text)), Dynamic::from_float)
}

/// Rhai to JSON. Returns `None` for values with no JSON form.
pub fn to_json(value: &Dynamic) -> Option<Value> {
    if value.is_unit() {
        return Some(Value::Null);
    }
    if let Ok(b) = value.as_bool() {
        return Some(Value::Bool(b));
    }
    if let Ok(i) = value.as_int() {
        return Some(Value::from(i));
    }
    if let Ok(f) = value.as_float() {
        return Some(Number::from_f64(f).map_or(Value::Null, Value::Number));
    }
    if let Ok(c) = value.as_char() {
        return Some(Value::String(c.to_string()));
    }
    if let Some(s) = value.read_lock::<ImmutableString>() {
        return Some(Value::String(s.to_string()));
    }
    if let Some(big) = value.read_lock::<BigNumber>() {
        return big.0.parse::<Number>().ok().map(Value::Number);
    }
    if let Some(items) = value.read_lock::<Array>() {
        return Some(Value::Array(
            items
                .iter()
                .map(|item| to_json(item).unwrap_or(Value::Null))
                .collect(),
        ));
    }
    if let Some(entries) = value.read_lock::<Map>() {
        return Some(Value::Object(
            entries
                .iter()
                .filter_map(|(k, v)| Some((k.to_string(), to_json(v)?)))
                .collect(),
        ));
    }
    None
}

/// Text form used by the console and by string comparisons: strings as-is,
/// everything else as compact JSON.
pub fn render(value: &Dynamic) -> String {
    if let Some(s) = value.read_lock::<ImmutableString>() {
        return s.to_string();
    }
    match to_json(value) {
        Some(json) => json.to_string(),
        None => value.to_string(),
    }
}

/// Structural equality over JSON values, treating `1` and `1.0` as equal.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ if x.to_string() == y.to_string() => true,
            _ => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
                _ => false,
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| json_equal(v, other)))
        }
        _ => a == b,
    }
}
