//! Open-ended record shape
//!
//! Records are plain JSON objects. The schema only orders fields for
//! presentation; storage decides what it accepts.

use serde_json::{Map, Value};

/// Field name to scalar value
pub type Record = Map<String, Value>;

/// Label used when a record has neither a `name` nor an identity
pub const UNNAMED_RECORD: &str = "Unnamed Record";

/// Identity of `record` under `key_field`, stringified
///
/// Strings and numbers count as identities; empty strings, null and other
/// shapes do not.
pub fn record_key(record: &Record, key_field: &str) -> Option<String> {
    match record.get(key_field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Overlay `patch` onto `base`; patch values win on collision
pub fn merge_records(base: &Record, patch: &Record) -> Record {
    let mut merged = base.clone();
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Human-facing label: `name`, then the identity, then a placeholder
pub fn display_label(record: &Record, key_field: &str) -> String {
    match record.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => record_key(record, key_field).unwrap_or_else(|| UNNAMED_RECORD.to_string()),
    }
}

/// Display text for a single value (strings unquoted, null empty)
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_record_key_string_and_number() {
        assert_eq!(
            record_key(&record(json!({"id": "m1"})), "id"),
            Some("m1".to_string())
        );
        assert_eq!(
            record_key(&record(json!({"id": 42})), "id"),
            Some("42".to_string())
        );
        assert_eq!(record_key(&record(json!({"id": ""})), "id"), None);
        assert_eq!(record_key(&record(json!({"id": null})), "id"), None);
        assert_eq!(record_key(&record(json!({"name": "x"})), "id"), None);
    }

    #[test]
    fn test_merge_patch_wins_and_preserves_rest() {
        let base = record(json!({"id": "1", "name": "old", "status": "active"}));
        let patch = record(json!({"name": "new", "extra": true}));

        let merged = merge_records(&base, &patch);
        assert_eq!(
            Value::Object(merged),
            json!({"id": "1", "name": "new", "status": "active", "extra": true})
        );
    }

    #[test]
    fn test_display_label_fallbacks() {
        assert_eq!(display_label(&record(json!({"name": "Ann", "id": "1"})), "id"), "Ann");
        assert_eq!(display_label(&record(json!({"id": "1"})), "id"), "1");
        assert_eq!(display_label(&Record::new(), "id"), UNNAMED_RECORD);
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!("a")), "a");
        assert_eq!(value_text(&json!(3)), "3");
        assert_eq!(value_text(&Value::Null), "");
    }
}
