//! Dotted-path access into JSON documents
//!
//! The direct-mapping strategy reads fields straight out of a parsed JSON
//! value. Lookups never fail: a missing key or null yields an empty string,
//! and arrays fan the remaining path across their elements, joining the
//! non-empty results with the multi-value delimiter.

use crate::entry::VALUE_DELIMITER;
use serde_json::Value;

/// Resolve a path of keys against a JSON value and render it as a field
/// string.
pub fn map_value(value: &Value, path: &[&str]) -> String {
    match path.split_first() {
        None => render(value),
        Some((key, rest)) => match value {
            Value::Object(map) => map
                .get(*key)
                .map(|inner| map_value(inner, rest))
                .unwrap_or_default(),
            Value::Array(items) => join(items.iter().map(|item| map_value(item, path))),
            _ => String::new(),
        },
    }
}

/// Convenience form taking a dotted path string.
pub fn map_value_path(value: &Value, dotted: &str) -> String {
    let parts: Vec<&str> = dotted.split('.').filter(|p| !p.is_empty()).collect();
    map_value(value, &parts)
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => join(items.iter().map(render)),
        // bare objects have no sensible string form
        Value::Object(_) => String::new(),
    }
}

fn join(parts: impl Iterator<Item = String>) -> String {
    parts
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(VALUE_DELIMITER)
}
