//! Field catalogs: which field names are valid for an artifact kind.
//!
//! Two tiers per kind:
//! - **standard** fields, a fixed table (TestRail has no API listing them)
//! - **custom** fields, fetched once per session from the schema endpoint and
//!   narrowed to the ones applicable to the current project
//!
//! Custom field names are derived from the logical name a caller configures
//! (`RallyObjectID` -> `custom_rallyobjectid`). The derivation happens once,
//! in [`FieldNames`], and lookups go through the catalog.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, error};

use super::classify::{CallKind, RemoteCaller};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::model::{ArtifactKind, FieldDescriptor, FieldType};
use crate::remote::Endpoint;

const CASE_FIELDS: &[(&str, FieldType)] = &[
    ("created_by", FieldType::Integer),
    ("created_on", FieldType::Integer),
    ("estimate", FieldType::String),
    ("estimate_forecast", FieldType::String),
    ("id", FieldType::Integer),
    ("milestone_id", FieldType::Integer),
    ("priority_id", FieldType::Integer),
    ("refs", FieldType::String),
    ("section_id", FieldType::Integer),
    ("suite_id", FieldType::Integer),
    ("title", FieldType::String),
    ("type_id", FieldType::Integer),
    ("updated_by", FieldType::Integer),
    ("updated_on", FieldType::Integer),
];

const RESULT_FIELDS: &[(&str, FieldType)] = &[
    ("assignedto_id", FieldType::Integer),
    ("comment", FieldType::String),
    ("created_by", FieldType::Integer),
    ("created_on", FieldType::Integer),
    ("defects", FieldType::String),
    ("elapsed", FieldType::Integer),
    ("id", FieldType::Integer),
    ("status_id", FieldType::Integer),
    ("test_id", FieldType::Integer),
    ("version", FieldType::String),
];

/// Reference fields attached to result records during discovery.
pub const RESULT_TEST_FIELD: &str = "_test";
pub const RESULT_CASE_FIELD: &str = "_testcase";

/// Record field name of a custom field with the given logical name.
pub fn custom_system_name(logical: &str) -> String {
    format!("custom_{}", logical.to_lowercase())
}

/// Fixed standard-field table for a kind; empty for kinds without a schema.
pub fn standard_fields(kind: ArtifactKind) -> &'static [(&'static str, FieldType)] {
    match kind {
        ArtifactKind::Case => CASE_FIELDS,
        ArtifactKind::Result => RESULT_FIELDS,
        ArtifactKind::Run
        | ArtifactKind::Plan
        | ArtifactKind::Suite
        | ArtifactKind::Section
        | ArtifactKind::Test => &[],
    }
}

/// Configured logical field names mapped to record field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    /// Custom field holding the other system's id (link state).
    pub external_id: String,
    pub end_user_id: Option<String>,
    pub item_link: Option<String>,
}

impl FieldNames {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            external_id: custom_system_name(&config.external_id_field),
            end_user_id: config.end_user_id_field.as_deref().map(custom_system_name),
            item_link: config.item_link_field.as_deref().map(custom_system_name),
        }
    }
}

/// Standard and custom fields valid for one artifact kind in one project.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    kind: ArtifactKind,
    project_id: i64,
    standard: &'static [(&'static str, FieldType)],
    custom: BTreeMap<String, FieldDescriptor>,
}

impl FieldCatalog {
    /// Fetch the custom-field schema for `kind` and build the catalog.
    ///
    /// Kinds without a schema get an empty catalog without a remote call.
    ///
    /// # Errors
    ///
    /// A schema fetch failure is unrecoverable: without a catalog no write
    /// can be validated.
    pub fn resolve(caller: RemoteCaller<'_>, kind: ArtifactKind, project_id: i64) -> Result<Self> {
        let endpoint = match kind {
            ArtifactKind::Case => Endpoint::GetCaseFields,
            ArtifactKind::Result => Endpoint::GetResultFields,
            _ => return Ok(Self::from_schema(kind, project_id, &[])),
        };

        let schema = caller.list(CallKind::Essential, &endpoint, || {
            format!("Failed to retrieve TestRail {kind} custom-field names")
        })?;
        let catalog = Self::from_schema(kind, project_id, &schema);
        debug!(
            %kind,
            project_id,
            standard = catalog.standard.len(),
            custom = catalog.custom.len(),
            "Field catalog resolved"
        );
        Ok(catalog)
    }

    /// Build a catalog from schema entries already fetched.
    ///
    /// Entries without configs, or scoped to other projects, are dropped.
    pub fn from_schema(kind: ArtifactKind, project_id: i64, schema: &[Value]) -> Self {
        let custom = schema
            .iter()
            .filter_map(FieldDescriptor::from_schema)
            .filter(|field| field.applies_to(project_id))
            .map(|field| (field.system_name.clone(), field))
            .collect();

        Self {
            kind,
            project_id,
            standard: standard_fields(kind),
            custom,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn project_id(&self) -> i64 {
        self.project_id
    }

    pub fn standard(&self) -> &'static [(&'static str, FieldType)] {
        self.standard
    }

    pub fn custom(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.custom.values()
    }

    pub fn custom_field(&self, system_name: &str) -> Option<&FieldDescriptor> {
        self.custom.get(system_name)
    }

    /// Advisory type of a standard field.
    pub fn standard_type(&self, name: &str) -> Option<FieldType> {
        let name = name.to_lowercase();
        self.standard
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, t)| *t)
    }

    /// Whether `name` is a valid field for this catalog's kind.
    ///
    /// Accepts a standard field name, a custom field's system name, or the
    /// logical name a custom system name derives from. On results the
    /// reference fields `_test` / `_testcase` are always valid.
    ///
    /// # Errors
    ///
    /// Kinds without a field schema cannot be validated; asking is an
    /// unrecoverable unsupported operation.
    pub fn exists(&self, name: &str) -> Result<bool> {
        if !self.kind.has_field_schema() {
            return Err(Error::Unsupported {
                kind: self.kind,
                operation: "field validation",
            });
        }

        let lower = name.to_lowercase();
        let found = self.standard_type(&lower).is_some()
            || self.custom.contains_key(&lower)
            || self.custom.contains_key(&custom_system_name(name))
            || (self.kind == ArtifactKind::Result
                && (lower == RESULT_TEST_FIELD || lower == RESULT_CASE_FIELD));

        if !found {
            error!(
                field = name,
                kind = %self.kind,
                project_id = self.project_id,
                "TestRail field is not a valid field name"
            );
            let standard: Vec<&str> = self.standard.iter().map(|(n, _)| *n).collect();
            let custom: Vec<&String> = self.custom.keys().collect();
            debug!(?standard, ?custom, "Available fields");
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockTransport;
    use serde_json::json;

    fn schema() -> Vec<Value> {
        vec![
            json!({"system_name": "custom_rallyobjectid", "name": "rallyobjectid", "label": "Rally ID", "type_id": 1,
                   "configs": [{"context": {"is_global": true, "project_ids": null}}]}),
            json!({"system_name": "custom_area", "name": "area", "label": "Area", "type_id": 6,
                   "configs": [{"context": {"is_global": false, "project_ids": [7]}}]}),
            json!({"system_name": "custom_other_project", "name": "other", "label": "Other", "type_id": 1,
                   "configs": [{"context": {"is_global": false, "project_ids": [8]}}]}),
            json!({"system_name": "custom_unassigned", "configs": []}),
        ]
    }

    #[test]
    fn test_custom_fields_scoped_to_project() {
        let catalog = FieldCatalog::from_schema(ArtifactKind::Case, 7, &schema());
        let names: Vec<_> = catalog.custom().map(|f| f.system_name.as_str()).collect();
        assert_eq!(names, vec!["custom_area", "custom_rallyobjectid"]);
        assert_eq!(catalog.standard().len(), 14);
    }

    #[test]
    fn test_exists_accepts_logical_and_system_names() {
        let catalog = FieldCatalog::from_schema(ArtifactKind::Case, 7, &schema());
        assert!(catalog.exists("RallyObjectID").unwrap());
        assert!(catalog.exists("custom_rallyobjectid").unwrap());
        assert!(catalog.exists("Title").unwrap());
        assert!(!catalog.exists("other").unwrap());
        assert!(!catalog.exists("unassigned").unwrap());
    }

    #[test]
    fn test_result_reference_fields_always_valid() {
        let catalog = FieldCatalog::from_schema(ArtifactKind::Result, 7, &[]);
        assert!(catalog.exists("_test").unwrap());
        assert!(catalog.exists("_TestCase").unwrap());
        assert!(catalog.exists("test_id").unwrap());

        let cases = FieldCatalog::from_schema(ArtifactKind::Case, 7, &[]);
        assert!(!cases.exists("_test").unwrap());
    }

    #[test]
    fn test_kinds_without_schema_cannot_validate() {
        let catalog = FieldCatalog::from_schema(ArtifactKind::Run, 7, &[]);
        let err = catalog.exists("name").unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_standard_types() {
        let catalog = FieldCatalog::from_schema(ArtifactKind::Result, 7, &[]);
        assert_eq!(catalog.standard_type("comment"), Some(FieldType::String));
        assert_eq!(catalog.standard_type("status_id"), Some(FieldType::Integer));
    }

    #[test]
    fn test_resolve_fetches_schema_once_per_kind() {
        let transport = MockTransport::new().on_get("get_result_fields", Value::Array(schema()));
        let catalog = FieldCatalog::resolve(RemoteCaller::new(&transport), ArtifactKind::Result, 7).unwrap();
        assert!(catalog.custom_field("custom_area").is_some());
        assert_eq!(transport.calls(), vec!["GET get_result_fields"]);

        let runs = FieldCatalog::resolve(RemoteCaller::new(&transport), ArtifactKind::Run, 7).unwrap();
        assert_eq!(runs.custom().count(), 0);
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn test_schema_failure_is_unrecoverable() {
        let transport = MockTransport::new().fail("get_case_fields", 403);
        let err = FieldCatalog::resolve(RemoteCaller::new(&transport), ArtifactKind::Case, 7).unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_custom_system_name() {
        assert_eq!(custom_system_name("RallyObjectID"), "custom_rallyobjectid");
    }
}
