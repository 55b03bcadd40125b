//! Field descriptors for the standard and custom field catalogs.

use serde::Serialize;
use serde_json::Value;

use super::artifact::{value_as_i64, value_to_string};

/// Primitive type annotation on a standard field.
///
/// Advisory only: TestRail itself does not enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
}

/// A custom field as described by `get_case_fields` / `get_result_fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// Name used in records and payloads (`custom_<name>`)
    pub system_name: String,
    pub display_name: String,
    pub label: String,
    pub type_id: i64,
    /// Projects the field applies to; `None` when global
    pub project_ids: Option<Vec<i64>>,
}

impl FieldDescriptor {
    /// Parse a schema entry.
    ///
    /// Returns `None` when the entry has no system name or no configs; a
    /// field without configs applies to no project at all. Applicability is
    /// taken from the first config.
    pub fn from_schema(value: &Value) -> Option<Self> {
        let system_name = value.get("system_name").and_then(Value::as_str)?;
        let config = value.get("configs")?.as_array()?.first()?;
        let context = config.get("context");
        let is_global = context
            .and_then(|c| c.get("is_global"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let project_ids = if is_global {
            None
        } else {
            Some(
                context
                    .and_then(|c| c.get("project_ids"))
                    .and_then(Value::as_array)
                    .map(|ids| ids.iter().filter_map(value_as_i64).collect())
                    .unwrap_or_default(),
            )
        };

        Some(Self {
            system_name: system_name.to_lowercase(),
            display_name: value.get("name").map(value_to_string).unwrap_or_default(),
            label: value.get("label").map(value_to_string).unwrap_or_default(),
            type_id: value.get("type_id").and_then(value_as_i64).unwrap_or_default(),
            project_ids,
        })
    }

    /// Whether the field can be used in the given project.
    pub fn applies_to(&self, project_id: i64) -> bool {
        self.project_ids
            .as_ref()
            .is_none_or(|ids| ids.contains(&project_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_global_field() {
        let field = FieldDescriptor::from_schema(&json!({
            "system_name": "custom_extid",
            "name": "extid",
            "label": "External ID",
            "type_id": 1,
            "configs": [{"context": {"is_global": true, "project_ids": null}}]
        }))
        .unwrap();
        assert_eq!(field.project_ids, None);
        assert!(field.applies_to(42));
    }

    #[test]
    fn test_project_scoped_field() {
        let field = FieldDescriptor::from_schema(&json!({
            "system_name": "custom_area",
            "configs": [{"context": {"is_global": false, "project_ids": [1, "3"]}}]
        }))
        .unwrap();
        assert!(field.applies_to(3));
        assert!(!field.applies_to(2));
    }

    #[test]
    fn test_field_without_configs_is_dropped() {
        assert!(FieldDescriptor::from_schema(&json!({"system_name": "custom_x", "configs": []})).is_none());
    }
}
