//! The internal record shape for anything read from or written to TestRail.
//!
//! TestRail does not enforce integer-vs-string typing on its fields, so the
//! accessors here tolerate both (`"12"` and `12` are the same id).

use serde_json::Value;

use super::kind::ArtifactKind;

/// Field-name to value mapping, exactly as TestRail returns it.
pub type Fields = serde_json::Map<String, Value>;

/// A TestRail record tagged with its kind.
///
/// Constructed fresh for every remote call and never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub fields: Fields,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, fields: Fields) -> Self {
        Self { kind, fields }
    }

    /// Wrap a decoded response. Non-object values become an empty record.
    pub fn from_value(kind: ArtifactKind, value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { kind, fields },
            _ => Self {
                kind,
                fields: Fields::new(),
            },
        }
    }

    /// Field lookup by name; names are matched lowercased.
    ///
    /// A JSON `null` reads as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let value = match self.fields.get(name) {
            Some(v) => Some(v),
            None => self.fields.get(&name.to_lowercase()),
        };
        value.filter(|v| !v.is_null())
    }

    /// Whether the field holds a non-null value.
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Integer view of a field, accepting numeric strings.
    pub fn int_field(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(value_as_i64)
    }

    /// The record's remote identity.
    pub fn id(&self) -> Option<i64> {
        self.int_field("id")
    }

    /// Identifier as shown in the TestRail UI, for log lines only.
    ///
    /// This is computed, never stored in `fields`, so it cannot leak into an
    /// update payload.
    pub fn display_id(&self) -> String {
        let id = self
            .get("id")
            .map_or_else(|| "?".to_string(), value_to_string);
        match self.kind {
            ArtifactKind::Result => {
                let test_id = self
                    .get("test_id")
                    .map_or_else(|| "?".to_string(), value_to_string);
                format!("(id='{id}' test_id='{test_id}')")
            }
            kind => match kind.display_prefix() {
                Some(prefix) => format!("{prefix}{id}"),
                None => id,
            },
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Integer view of a loosely-typed JSON value.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// String view of a JSON value, without quotes for strings.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact(kind: ArtifactKind, value: Value) -> Artifact {
        Artifact::from_value(kind, value)
    }

    #[test]
    fn test_null_reads_as_absent() {
        let a = artifact(ArtifactKind::Case, json!({"id": 3, "custom_extid": null}));
        assert!(!a.is_set("custom_extid"));
        assert!(a.is_set("id"));
        assert!(!a.is_set("missing"));
    }

    #[test]
    fn test_lookup_falls_back_to_lowercase() {
        let a = artifact(ArtifactKind::Case, json!({"title": "Login"}));
        assert_eq!(a.get("Title"), Some(&json!("Login")));
    }

    #[test]
    fn test_ids_tolerate_string_typing() {
        let a = artifact(ArtifactKind::Test, json!({"id": "77", "case_id": 12}));
        assert_eq!(a.id(), Some(77));
        assert_eq!(a.int_field("case_id"), Some(12));
    }

    #[test]
    fn test_display_ids() {
        assert_eq!(artifact(ArtifactKind::Case, json!({"id": 12})).display_id(), "C12");
        assert_eq!(artifact(ArtifactKind::Suite, json!({"id": 2})).display_id(), "S2");
        assert_eq!(artifact(ArtifactKind::Section, json!({"id": 9})).display_id(), "9");
        assert_eq!(
            artifact(ArtifactKind::Result, json!({"id": 5, "test_id": 77})).display_id(),
            "(id='5' test_id='77')"
        );
    }

    #[test]
    fn test_display_id_is_not_stored() {
        let a = artifact(ArtifactKind::Case, json!({"id": 12}));
        let _ = a.display_id();
        assert_eq!(a.fields.len(), 1);
    }

    #[test]
    fn test_non_object_response_is_empty_record() {
        let a = artifact(ArtifactKind::Case, json!([1, 2]));
        assert!(a.fields.is_empty());
        assert_eq!(a.id(), None);
    }
}
