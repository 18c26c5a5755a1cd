//! Attribute marshalling between typed records and attribute bags.
//!
//! Attributes are JSON-like values under string keys. The map preserves
//! insertion order (serde_json's `preserve_order` feature), which the
//! canonical fingerprint relies on. Encoding follows omit-empty semantics;
//! decoding is lenient: missing keys yield zero values and type mismatches
//! fall back to the zero value rather than failing.

use serde_json::Value;

/// Insertion-ordered attribute bag.
pub type AttrMap = serde_json::Map<String, Value>;

/// Record types that marshal to and from an attribute bag.
///
/// Implementations must uphold the round-trip law
/// `T::from_attributes(&x.to_attributes()) == x` for records whose fields
/// are consistent with their omit-empty behaviour.
pub trait AttributeRecord: Sized {
    fn to_attributes(&self) -> AttrMap;
    fn from_attributes(attrs: &AttrMap) -> Self;
}

/// Insert a string value, omitting the key when empty.
pub fn put_string(map: &mut AttrMap, key: &str, value: &str) {
    if !value.is_empty() {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
}

/// Insert a boolean, omitting the key when false.
pub fn put_bool(map: &mut AttrMap, key: &str, value: bool) {
    if value {
        map.insert(key.to_string(), Value::Bool(true));
    }
}

/// Insert a float unconditionally.
pub fn put_f64(map: &mut AttrMap, key: &str, value: f64) {
    if let Some(n) = serde_json::Number::from_f64(value) {
        map.insert(key.to_string(), Value::Number(n));
    }
}

/// Insert an optional float; absent values are omitted.
pub fn put_opt_f64(map: &mut AttrMap, key: &str, value: Option<f64>) {
    if let Some(v) = value {
        put_f64(map, key, v);
    }
}

/// Insert a string sequence, omitting the key when empty.
pub fn put_string_vec(map: &mut AttrMap, key: &str, values: &[String]) {
    if !values.is_empty() {
        map.insert(
            key.to_string(),
            Value::Array(values.iter().map(|s| Value::String(s.clone())).collect()),
        );
    }
}

/// Insert an optional string sequence; `None` is omitted.
pub fn put_opt_string_vec(map: &mut AttrMap, key: &str, values: Option<&Vec<String>>) {
    if let Some(v) = values {
        put_string_vec(map, key, v);
    }
}

/// Read a string; missing or non-string yields the empty string.
pub fn get_string(map: &AttrMap, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Read a boolean; missing or non-boolean yields false.
pub fn get_bool(map: &AttrMap, key: &str) -> bool {
    matches!(map.get(key), Some(Value::Bool(true)))
}

/// Read a float, coercing integers; missing or non-numeric yields None.
pub fn get_opt_f64(map: &AttrMap, key: &str) -> Option<f64> {
    match map.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

/// Read a float with a zero fallback.
pub fn get_f64(map: &AttrMap, key: &str) -> f64 {
    get_opt_f64(map, key).unwrap_or(0.0)
}

/// Read an integer, coercing floats by truncation; zero fallback.
pub fn get_i64(map: &AttrMap, key: &str) -> i64 {
    match map.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// Read a string sequence, coercing a generic array element-wise: strings
/// pass through, numbers and booleans render to their display form, other
/// values are skipped. Missing or non-array yields the empty vec.
pub fn get_string_vec(map: &AttrMap, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Read an optional string sequence: `None` when the key is absent,
/// `Some(coerced)` otherwise.
pub fn get_opt_string_vec(map: &AttrMap, key: &str) -> Option<Vec<String>> {
    map.get(key).map(|_| get_string_vec(map, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn omit_empty_semantics() {
        let mut map = AttrMap::new();
        put_string(&mut map, "label", "");
        put_bool(&mut map, "deprecated", false);
        put_string_vec(&mut map, "fields", &[]);
        put_opt_f64(&mut map, "opacity", None);
        assert!(map.is_empty());

        put_string(&mut map, "label", "Person");
        put_bool(&mut map, "deprecated", true);
        put_opt_f64(&mut map, "opacity", Some(0.5));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn insertion_order_preserved() {
        let mut map = AttrMap::new();
        put_string(&mut map, "zebra", "1");
        put_string(&mut map, "alpha", "2");
        put_string(&mut map, "mid", "3");
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["zebra", "alpha", "mid"]);
    }

    #[test]
    fn lenient_decoding() {
        let mut map = AttrMap::new();
        map.insert("count".into(), json!(3.9));
        map.insert("name".into(), json!(42));
        map.insert("tags".into(), json!(["a", 1, true, {"x": 1}]));

        // float -> int truncates
        assert_eq!(get_i64(&map, "count"), 3);
        // type mismatch falls back to zero value
        assert_eq!(get_string(&map, "name"), "");
        // missing key never fails
        assert_eq!(get_f64(&map, "absent"), 0.0);
        assert_eq!(get_opt_f64(&map, "absent"), None);
        // generic sequence coerces to strings
        assert_eq!(get_string_vec(&map, "tags"), vec!["a", "1", "true"]);
    }

    #[test]
    fn opt_string_vec_distinguishes_absent() {
        let mut map = AttrMap::new();
        assert_eq!(get_opt_string_vec(&map, "fields"), None);
        map.insert("fields".into(), json!([]));
        assert_eq!(get_opt_string_vec(&map, "fields"), Some(vec![]));
    }
}
