//! Lenient field extraction from JSON objects.
//!
//! The upstream services are inconsistent about scalar types: ids arrive as
//! numbers in some deployments and as numeric strings in others. These
//! helpers accept either.

use serde_json::{Map, Value};

/// Read an integer that may be encoded as a JSON number or a numeric string.
pub(crate) fn int(obj: &Map<String, Value>, name: &str) -> Option<i64> {
    match obj.get(name)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a scalar as text. Numbers and booleans are rendered as-is.
pub(crate) fn text(obj: &Map<String, Value>, name: &str) -> Option<String> {
    match obj.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn int_accepts_numbers_and_numeric_strings() {
        let obj = object(json!({"a": 7, "b": "12", "c": "x", "d": null, "e": 1.5}));
        assert_eq!(int(&obj, "a"), Some(7));
        assert_eq!(int(&obj, "b"), Some(12));
        assert_eq!(int(&obj, "c"), None);
        assert_eq!(int(&obj, "d"), None);
        assert_eq!(int(&obj, "e"), None);
        assert_eq!(int(&obj, "missing"), None);
    }

    #[test]
    fn text_renders_scalars() {
        let obj = object(json!({"a": "ops", "b": 3, "c": true, "d": {}}));
        assert_eq!(text(&obj, "a").as_deref(), Some("ops"));
        assert_eq!(text(&obj, "b").as_deref(), Some("3"));
        assert_eq!(text(&obj, "c").as_deref(), Some("true"));
        assert_eq!(text(&obj, "d"), None);
    }
}
