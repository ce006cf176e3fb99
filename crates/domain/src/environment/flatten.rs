//! Dot/bracket path expansion of variable groups.

use std::collections::HashMap;

use serde_json::Value;

use super::VariableMap;

/// A flattened variable group: every reachable path mapped to its text form.
pub type FlatScope = HashMap<String, String>;

/// Text form of a JSON value as substituted into templates.
///
/// Strings are emitted raw; everything else uses its compact JSON form.
#[must_use]
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flattens a group into `FlatScope`.
///
/// `{"user": {"name": "X"}, "items": [1]}` yields `user`, `user.name`,
/// `items` and `items[0]`. Containers keep their compact JSON at their own key.
#[must_use]
pub fn flatten(map: &VariableMap) -> FlatScope {
    let mut out = FlatScope::new();
    flatten_into(map, None, &mut out);
    out
}

/// Flattens `map` into `out` with every key prefixed by `prefix`.
pub fn flatten_into(map: &VariableMap, prefix: Option<&str>, out: &mut FlatScope) {
    for (key, value) in map {
        let path = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        visit(&path, value, out);
    }
}

fn visit(path: &str, value: &Value, out: &mut FlatScope) {
    out.insert(path.to_string(), value_to_text(value));
    match value {
        Value::Object(children) => {
            for (key, child) in children {
                visit(&format!("{path}.{key}"), child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                visit(&format!("{path}[{index}]"), child, out);
            }
        }
        _ => {}
    }
}
