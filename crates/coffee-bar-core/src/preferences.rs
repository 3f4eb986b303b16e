use serde_json::{Map, Value};
use tracing::warn;

use crate::validation::{FieldError, FormField};

/// Key/value preferences of a single workspace, kept in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceMap {
    entries: Map<String, Value>,
}

impl PreferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the serialized blob stored by the gateway. Missing, malformed, or
    /// non-object blobs yield an empty map.
    pub fn parse_blob(blob: Option<&str>) -> Self {
        let Some(raw) = blob.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(entries)) => Self { entries },
            Ok(other) => {
                warn!(kind = value_kind(&other), "preference blob is not an object; starting empty");
                Self::default()
            }
            Err(error) => {
                warn!(error = %error, "failed to parse preference blob; starting empty");
                Self::default()
            }
        }
    }

    pub fn to_blob(&self) -> String {
        Value::Object(self.entries.clone()).to_string()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Adds a new entry. The key is trimmed, required, and must not already exist
    /// (exact, case-sensitive match).
    pub fn add(&mut self, key: &str, raw_value: &str) -> Result<(), FieldError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(FieldError::new(FormField::PreferenceKey, "Key is required"));
        }
        if self.entries.contains_key(key) {
            return Err(FieldError::new(FormField::PreferenceKey, "Key already exists"));
        }
        self.entries
            .insert(key.to_owned(), parse_preference_value(raw_value));
        Ok(())
    }

    /// Replaces the value of an existing entry, keeping its position.
    pub fn update(&mut self, key: &str, raw_value: &str) -> Result<(), FieldError> {
        match self.entries.get_mut(key) {
            Some(slot) => {
                *slot = parse_preference_value(raw_value);
                Ok(())
            }
            None => Err(FieldError::new(
                FormField::PreferenceKey,
                format!("Key `{key}` does not exist"),
            )),
        }
    }

    /// Sets a key whether or not it exists.
    pub fn upsert(&mut self, key: &str, raw_value: &str) -> Result<(), FieldError> {
        if self.entries.contains_key(key.trim()) {
            self.update(key.trim(), raw_value)
        } else {
            self.add(key, raw_value)
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }
}

/// Interprets operator input as JSON, falling back to the literal text.
pub fn parse_preference_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

/// Objects and arrays render as pretty JSON; scalars render bare.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_parse_as_json_or_fall_back_to_text() {
        assert_eq!(parse_preference_value("true"), json!(true));
        assert_eq!(parse_preference_value("42"), json!(42));
        assert_eq!(parse_preference_value(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_preference_value("hello world"), json!("hello world"));
    }

    #[test]
    fn malformed_blob_yields_empty_map() {
        assert!(PreferenceMap::parse_blob(Some("{not json")).is_empty());
        assert!(PreferenceMap::parse_blob(Some("[1,2]")).is_empty());
        assert!(PreferenceMap::parse_blob(None).is_empty());
    }

    #[test]
    fn blob_keeps_server_key_order() {
        let map = PreferenceMap::parse_blob(Some(r#"{"zeta":1,"alpha":"x"}"#));
        let keys: Vec<_> = map.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, ["zeta", "alpha"]);
        assert_eq!(map.to_blob(), r#"{"zeta":1,"alpha":"x"}"#);
    }

    #[test]
    fn add_rejects_blank_and_duplicate_keys() {
        let mut map = PreferenceMap::parse_blob(Some(r#"{"theme":"dark"}"#));

        let error = map.add("  ", "x").expect_err("blank key");
        assert_eq!(error.message, "Key is required");

        let error = map.add("theme", "light").expect_err("duplicate key");
        assert_eq!(error.message, "Key already exists");

        map.add("Theme", "light").expect("keys are case sensitive");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn update_and_remove_edit_in_place() {
        let mut map = PreferenceMap::parse_blob(Some(r#"{"a":1,"b":2}"#));
        map.update("a", "[1,2]").expect("update existing");
        assert!(map.update("missing", "1").is_err());
        assert_eq!(map.remove("b"), Some(json!(2)));
        assert_eq!(map.to_blob(), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn format_value_pretty_prints_structures() {
        assert_eq!(format_value(&json!("plain")), "plain");
        assert_eq!(format_value(&json!(false)), "false");
        assert_eq!(format_value(&json!({"a": 1})), "{\n  \"a\": 1\n}");
    }
}
