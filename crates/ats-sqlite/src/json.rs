//! JSON and timestamp conversion helpers for SQLite columns.
//!
//! PCSA sequences and attribute bags are stored as JSON text; the attribute
//! codec preserves key insertion order (serde_json `preserve_order`), which
//! keeps the canonical signing fingerprint identical across backends.

use ats_core::attrs::AttrMap;

use crate::error::Result;

/// Serialize a string sequence for storage.
pub fn serialize_string_vec(vec: &[String]) -> Result<String> {
    Ok(serde_json::to_string(vec)?)
}

/// Deserialize a string sequence column.
pub fn deserialize_string_vec(json: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(json)?)
}

/// Serialize an attribute bag; empty bags store as NULL.
pub fn serialize_attributes(attrs: &AttrMap) -> Result<Option<String>> {
    if attrs.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(attrs)?))
    }
}

/// Deserialize an attribute bag column.
pub fn deserialize_attributes(json: Option<String>) -> Result<AttrMap> {
    match json {
        Some(json_str) => Ok(serde_json::from_str(&json_str)?),
        None => Ok(AttrMap::new()),
    }
}

/// Convert Unix milliseconds to the stored RFC3339 form.
pub fn timestamp_to_sql(timestamp_ms: i64) -> String {
    let secs = timestamp_ms.div_euclid(1000);
    let nanos = (timestamp_ms.rem_euclid(1000) * 1_000_000) as u32;

    match chrono::DateTime::from_timestamp(secs, nanos) {
        Some(dt) => dt.to_rfc3339(),
        None => chrono::Utc::now().to_rfc3339(),
    }
}

/// Convert a stored RFC3339 string back to Unix milliseconds.
pub fn sql_to_timestamp(datetime_str: &str) -> Result<i64> {
    let dt = chrono::DateTime::parse_from_rfc3339(datetime_str).map_err(|e| {
        crate::error::SqliteError::Migration(format!("invalid datetime '{}': {}", datetime_str, e))
    })?;
    Ok(dt.timestamp_millis())
}
