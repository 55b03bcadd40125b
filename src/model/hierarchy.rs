//! Suite and section records.

use serde::Serialize;
use serde_json::Value;

use super::artifact::{value_as_i64, value_to_string};

/// A suite of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suite {
    pub id: i64,
    pub name: Option<String>,
}

impl Suite {
    /// Parse a `get_suites` entry; entries without a numeric id are skipped.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            id: value.get("id").and_then(value_as_i64)?,
            name: value.get("name").filter(|v| !v.is_null()).map(value_to_string),
        })
    }

    /// The single suite stood in for a project whose real suite is not exposed.
    pub fn synthetic(project_id: i64) -> Self {
        Self {
            id: project_id,
            name: None,
        }
    }

    pub fn display_id(&self) -> String {
        format!("S{}", self.id)
    }
}

/// A section inside a suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub id: i64,
    pub suite_id: Option<i64>,
    pub name: Option<String>,
}

impl Section {
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            id: value.get("id").and_then(value_as_i64)?,
            suite_id: value.get("suite_id").and_then(value_as_i64),
            name: value.get("name").filter(|v| !v.is_null()).map(value_to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_suite_parsing_tolerates_string_ids() {
        let suite = Suite::from_value(&json!({"id": "4", "name": "Smoke"})).unwrap();
        assert_eq!(suite.id, 4);
        assert_eq!(suite.name.as_deref(), Some("Smoke"));
        assert!(Suite::from_value(&json!({"name": "no id"})).is_none());
    }

    #[test]
    fn test_section_parsing() {
        let section = Section::from_value(&json!({"id": 10, "suite_id": 4, "name": "Login"})).unwrap();
        assert_eq!(section.suite_id, Some(4));
    }
}
