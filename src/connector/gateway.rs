//! Create / find / update / delete against one artifact kind.
//!
//! Each kind has its own request target and its own required ids. Successful
//! calls return the decoded record as TestRail sent it; display ids are only
//! computed for log lines.

use serde_json::{Value, json};
use tracing::debug;

use super::classify::{CallKind, RemoteCaller};
use crate::error::{Error, Result};
use crate::model::{Artifact, ArtifactKind, Fields, Project, Section, Suite, value_as_i64};
use crate::remote::Endpoint;

/// Parse a caller-supplied identity.
///
/// Only plain digit strings are accepted; `C12` and `-3` are rejected.
///
/// # Errors
///
/// Returns a recoverable [`Error::InvalidId`].
pub fn parse_id(kind: ArtifactKind, id: &str) -> Result<i64> {
    let invalid = || Error::InvalidId {
        kind,
        id: id.to_string(),
    };
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    id.parse().map_err(|_| invalid())
}

/// Remote operations on single artifacts of the session's project.
#[derive(Clone, Copy)]
pub struct ArtifactGateway<'a> {
    caller: RemoteCaller<'a>,
    project: &'a Project,
    suites: &'a [Suite],
}

impl<'a> ArtifactGateway<'a> {
    pub fn new(caller: RemoteCaller<'a>, project: &'a Project, suites: &'a [Suite]) -> Self {
        Self {
            caller,
            project,
            suites,
        }
    }

    /// Create an artifact from `fields`.
    ///
    /// Required targets are read from the fields themselves: `section_id` for
    /// cases, `suite_id` for runs, `run_id` and `case_id` for results.
    ///
    /// # Errors
    ///
    /// A missing target is a recoverable [`Error::MissingTarget`]; a failed
    /// call is recoverable. Tests cannot be created.
    pub fn create(&self, kind: ArtifactKind, fields: Fields) -> Result<Artifact> {
        let project = self.project.id;
        let target = |field: &'static str| {
            fields
                .get(field)
                .and_then(value_as_i64)
                .ok_or(Error::MissingTarget { kind, field })
        };

        let (endpoint, context) = match kind {
            ArtifactKind::Case => {
                let section = target("section_id")?;
                (Endpoint::AddCase { section }, format!("Section id='{section}'"))
            }
            ArtifactKind::Run => {
                let suite = target("suite_id")?;
                (
                    Endpoint::AddRun { project, suite },
                    format!("Project id='{project}'; Suite id='{suite}'"),
                )
            }
            ArtifactKind::Result => {
                let (run, case) = (target("run_id")?, target("case_id")?);
                (
                    Endpoint::AddResultForCase { run, case },
                    format!("Run id='{run}', Case id='{case}'"),
                )
            }
            ArtifactKind::Plan => (Endpoint::AddPlan { project }, format!("Project id='{project}'")),
            ArtifactKind::Suite => (Endpoint::AddSuite { project }, format!("Project id='{project}'")),
            ArtifactKind::Section => (
                Endpoint::AddSection { project },
                format!("Project id='{project}'"),
            ),
            ArtifactKind::Test => {
                return Err(Error::Unsupported {
                    kind,
                    operation: "create",
                });
            }
        };

        debug!(%kind, target = %endpoint, "Preparing to create a TestRail artifact");
        let body = Value::Object(fields);
        let created = self.caller.post(CallKind::PerItem, &endpoint, Some(&body), || {
            format!("Failed to create a '{kind}'; {context}")
        })?;

        let created = Artifact::from_value(kind, created);
        if kind == ArtifactKind::Plan {
            let (entries, runs) = plan_summary(&created);
            debug!(id = %created.display_id(), ?entries, ?runs, "Created TestRail plan");
        } else {
            debug!(%kind, id = %created.display_id(), "Created TestRail artifact");
        }
        Ok(created)
    }

    /// Read one artifact by a caller-supplied identity.
    ///
    /// The identity is validated before any remote call.
    ///
    /// # Errors
    ///
    /// Non-numeric identities and failed reads are recoverable; kinds with no
    /// single-record read are unsupported.
    pub fn find(&self, kind: ArtifactKind, id: &str) -> Result<Artifact> {
        let id = parse_id(kind, id)?;
        self.find_by_id(kind, id)
    }

    /// Read one artifact by numeric id.
    ///
    /// # Errors
    ///
    /// See [`ArtifactGateway::find`].
    pub fn find_by_id(&self, kind: ArtifactKind, id: i64) -> Result<Artifact> {
        let endpoint = match kind {
            ArtifactKind::Case => Endpoint::GetCase(id),
            ArtifactKind::Test => Endpoint::GetTest(id),
            ArtifactKind::Run
            | ArtifactKind::Plan
            | ArtifactKind::Suite
            | ArtifactKind::Section
            | ArtifactKind::Result => {
                return Err(Error::Unsupported {
                    kind,
                    operation: "find",
                });
            }
        };

        let found = self.caller.get(CallKind::PerItem, &endpoint, || {
            format!("Failed to find the '{kind}' artifact id='{id}'")
        })?;
        Ok(Artifact::from_value(kind, found))
    }

    /// Apply `delta` on top of the artifact's current fields and send the
    /// whole record, as TestRail replaces records on update.
    ///
    /// # Errors
    ///
    /// Failed calls are recoverable; results and the kinds without an update
    /// method are unsupported.
    pub fn update(&self, artifact: &Artifact, delta: Fields) -> Result<Artifact> {
        let kind = artifact.kind;
        let id = artifact.id().ok_or_else(|| Error::InvalidId {
            kind,
            id: artifact.display_id(),
        })?;
        let endpoint = match kind {
            ArtifactKind::Case => Endpoint::UpdateCase(id),
            ArtifactKind::Run => Endpoint::UpdateRun(id),
            ArtifactKind::Plan
            | ArtifactKind::Suite
            | ArtifactKind::Section
            | ArtifactKind::Result
            | ArtifactKind::Test => {
                return Err(Error::Unsupported {
                    kind,
                    operation: "update",
                });
            }
        };

        let mut all_fields = artifact.fields.clone();
        all_fields.extend(delta);
        let body = Value::Object(all_fields);

        let updated = self.caller.post(CallKind::PerItem, &endpoint, Some(&body), || {
            format!("Problem updating TestRail '{kind}' {}", artifact.display_id())
        })?;
        Ok(Artifact::from_value(kind, updated))
    }

    /// Delete an artifact.
    ///
    /// Sections are only deleted when still listed, so deleting one twice
    /// succeeds. TestRail has no way to delete a result; that is logged and
    /// reported as success.
    ///
    /// # Errors
    ///
    /// Failed calls are recoverable. Tests cannot be deleted.
    pub fn delete(&self, kind: ArtifactKind, id: i64) -> Result<()> {
        let endpoint = match kind {
            ArtifactKind::Case => Endpoint::DeleteCase(id),
            ArtifactKind::Run => Endpoint::DeleteRun(id),
            ArtifactKind::Plan => Endpoint::DeletePlan(id),
            ArtifactKind::Suite => Endpoint::DeleteSuite(id),
            ArtifactKind::Section => {
                if !self.section_listed(id)? {
                    debug!(id, "TestRail section appears to be already deleted; ignored");
                    return Ok(());
                }
                Endpoint::DeleteSection(id)
            }
            ArtifactKind::Result => {
                debug!(id, "TestRail has no API for deleting a result; ignored");
                return Ok(());
            }
            ArtifactKind::Test => {
                return Err(Error::Unsupported {
                    kind,
                    operation: "delete",
                });
            }
        };

        self.caller.post(CallKind::PerItem, &endpoint, None, || {
            format!("Failed to delete '{kind}'; id='{id}'")
        })?;
        debug!(%kind, id, "Deleted TestRail artifact");
        Ok(())
    }

    /// Whether section `id` is still listed under one of the suites.
    ///
    /// A failed listing is an error, never an absent section.
    fn section_listed(&self, id: i64) -> Result<bool> {
        for suite in self.suites {
            let endpoint = Endpoint::GetSections {
                project: self.project.id,
                suite: suite.id,
            };
            let batch = self.caller.list(CallKind::PerItem, &endpoint, || {
                format!("Failed to look up section {id} in suite {}", suite.display_id())
            })?;
            if batch
                .iter()
                .filter_map(Section::from_value)
                .any(|section| section.id == id)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Add an existing run to a plan as a new plan entry.
    ///
    /// # Errors
    ///
    /// A failed call is recoverable.
    pub fn add_run_to_plan(&self, run: &Artifact, plan: &Artifact) -> Result<Value> {
        let plan_id = plan.id().ok_or(Error::MissingTarget {
            kind: ArtifactKind::Plan,
            field: "id",
        })?;
        debug!(run = %run.display_id(), plan = %plan.display_id(), "Preparing to add run to plan");

        let body = json!({
            "suite_id": run.get("suite_id").cloned().unwrap_or(Value::Null),
            "runs": [Value::Object(run.fields.clone())],
        });
        let entry = self.caller.post(
            CallKind::PerItem,
            &Endpoint::AddPlanEntry { plan: plan_id },
            Some(&body),
            || {
                format!(
                    "Failed to add run {} to plan {}",
                    run.display_id(),
                    plan.display_id()
                )
            },
        )?;
        debug!(%entry, "New plan entry");
        Ok(entry)
    }

    /// Tests instantiated in a run.
    ///
    /// # Errors
    ///
    /// A failed listing is unrecoverable.
    pub fn tests_for_run(&self, run_id: i64) -> Result<Vec<Artifact>> {
        let tests = self
            .caller
            .list(CallKind::Essential, &Endpoint::GetTests { run: run_id }, || {
                format!("Failed to find any tests for run id='{run_id}'")
            })?;
        Ok(tests
            .into_iter()
            .map(|t| Artifact::from_value(ArtifactKind::Test, t))
            .collect())
    }
}

/// Entry ids and run ids of a created plan, for the creation log line.
fn plan_summary(plan: &Artifact) -> (Vec<i64>, Vec<i64>) {
    let entries = plan
        .get("entries")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let entry_ids = entries
        .iter()
        .filter_map(|e| e.get("id").and_then(value_as_i64))
        .collect();
    let run_ids = entries
        .iter()
        .filter_map(|e| e.get("runs").and_then(Value::as_array))
        .flatten()
        .filter_map(|r| r.get("id").and_then(value_as_i64))
        .collect();
    (entry_ids, run_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SuiteMode;
    use crate::remote::mock::MockTransport;

    fn project() -> Project {
        Project {
            id: 7,
            name: "Payments".to_string(),
            suite_mode: SuiteMode::Multi,
            url: None,
            is_completed: false,
            completed_on: None,
        }
    }

    fn suites() -> Vec<Suite> {
        vec![Suite { id: 1, name: None }]
    }

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(ArtifactKind::Case, "12").unwrap(), 12);
        for bad in ["", "abc", "C12", "-3", "1.5", "99999999999999999999"] {
            let err = parse_id(ArtifactKind::Case, bad).unwrap_err();
            assert!(err.is_recoverable(), "{bad}");
        }
    }

    #[test]
    fn test_find_rejects_non_numeric_before_calling() {
        let transport = MockTransport::new();
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);

        let err = gateway.find(ArtifactKind::Case, "abc").unwrap_err();
        assert!(err.is_recoverable());
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_find_case_and_test() {
        let transport = MockTransport::new()
            .on_get("get_case/12", json!({"id": 12, "title": "Login"}))
            .on_get("get_test/77", json!({"id": 77, "case_id": 12}));
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);

        let case = gateway.find(ArtifactKind::Case, "12").unwrap();
        assert_eq!(case.display_id(), "C12");
        assert!(!case.fields.contains_key("display_id"));
        assert_eq!(gateway.find(ArtifactKind::Test, "77").unwrap().int_field("case_id"), Some(12));

        let err = gateway.find(ArtifactKind::Result, "5").unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_find_failure_is_recoverable() {
        let transport = MockTransport::new().fail("get_case/12", 400);
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);
        assert!(gateway.find(ArtifactKind::Case, "12").unwrap_err().is_recoverable());
    }

    #[test]
    fn test_create_targets() {
        let transport = MockTransport::new()
            .on_post("add_case/4", json!({"id": 12}))
            .on_post("add_run/7&suite_id=1", json!({"id": 3}))
            .on_post("add_result_for_case/3/12", json!({"id": 5, "test_id": 77}))
            .on_post(
                "add_plan/7",
                json!({"id": 9, "entries": [{"id": "e1", "runs": [{"id": 30}, {"id": 31}]}]}),
            );
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);

        let case = gateway
            .create(ArtifactKind::Case, fields(json!({"section_id": 4, "title": "Login"})))
            .unwrap();
        assert_eq!(case.id(), Some(12));
        assert_eq!(transport.posted("add_case/4").unwrap()["title"], "Login");

        gateway
            .create(ArtifactKind::Run, fields(json!({"suite_id": "1"})))
            .unwrap();
        let result = gateway
            .create(ArtifactKind::Result, fields(json!({"run_id": 3, "case_id": 12, "status_id": 1})))
            .unwrap();
        assert_eq!(result.display_id(), "(id='5' test_id='77')");
        gateway.create(ArtifactKind::Plan, fields(json!({"name": "Sprint"}))).unwrap();
    }

    #[test]
    fn test_create_missing_target() {
        let transport = MockTransport::new();
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);

        let err = gateway
            .create(ArtifactKind::Result, fields(json!({"run_id": 3})))
            .unwrap_err();
        assert!(matches!(err, Error::MissingTarget { field: "case_id", .. }));
        assert!(err.is_recoverable());
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_update_merges_delta_into_full_record() {
        let transport = MockTransport::new().on_post("update_case/12", json!({"id": 12}));
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);

        let case = Artifact::from_value(
            ArtifactKind::Case,
            json!({"id": 12, "title": "Login", "custom_rallyobjectid": null}),
        );
        gateway
            .update(&case, fields(json!({"custom_rallyobjectid": "US1"})))
            .unwrap();

        let sent = transport.posted("update_case/12").unwrap();
        assert_eq!(sent["title"], "Login");
        assert_eq!(sent["custom_rallyobjectid"], "US1");
        assert!(case.get("custom_rallyobjectid").is_none());
    }

    #[test]
    fn test_result_update_is_unsupported() {
        let transport = MockTransport::new();
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);

        let result = Artifact::from_value(ArtifactKind::Result, json!({"id": 5}));
        let err = gateway.update(&result, Fields::new()).unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_section_delete_is_idempotent() {
        let transport = MockTransport::new()
            .on_get("get_sections/7&suite_id=1", json!([{"id": 10}]))
            .on_post("delete_section/10", Value::Null);
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);

        gateway.delete(ArtifactKind::Section, 11).unwrap();
        assert!(!transport.called("POST delete_section/11"));

        gateway.delete(ArtifactKind::Section, 10).unwrap();
        assert!(transport.called("POST delete_section/10"));
    }

    #[test]
    fn test_section_deleted_twice() {
        let transport = MockTransport::new()
            .on_get_sequence(
                "get_sections/7&suite_id=1",
                vec![json!([{"id": 10}, {"id": 12}]), json!([{"id": 12}])],
            )
            .on_post("delete_section/10", Value::Null);
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);

        gateway.delete(ArtifactKind::Section, 10).unwrap();
        gateway.delete(ArtifactKind::Section, 10).unwrap();

        let deletes = transport
            .calls()
            .iter()
            .filter(|c| *c == "POST delete_section/10")
            .count();
        assert_eq!(deletes, 1);
    }

    #[test]
    fn test_section_lookup_failure_is_not_a_delete() {
        let transport = MockTransport::new()
            .fail("get_sections/7&suite_id=1", 500)
            .on_post("delete_section/10", Value::Null);
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);

        let err = gateway.delete(ArtifactKind::Section, 10).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(transport.calls(), vec!["GET get_sections/7&suite_id=1".to_string()]);
    }

    #[test]
    fn test_delete_targets() {
        let transport = MockTransport::new()
            .on_post("delete_case/12", Value::Null)
            .fail("delete_run/3", 403);
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);

        gateway.delete(ArtifactKind::Case, 12).unwrap();
        assert!(gateway.delete(ArtifactKind::Run, 3).unwrap_err().is_recoverable());

        gateway.delete(ArtifactKind::Result, 5).unwrap();
        assert_eq!(transport.calls().len(), 2);
    }

    #[test]
    fn test_add_run_to_plan() {
        let transport = MockTransport::new().on_post("add_plan_entry/9", json!({"id": "e2"}));
        let (project, suites) = (project(), suites());
        let gateway = ArtifactGateway::new(RemoteCaller::new(&transport), &project, &suites);

        let run = Artifact::from_value(ArtifactKind::Run, json!({"id": 3, "suite_id": 1}));
        let plan = Artifact::from_value(ArtifactKind::Plan, json!({"id": 9}));
        gateway.add_run_to_plan(&run, &plan).unwrap();

        let sent = transport.posted("add_plan_entry/9").unwrap();
        assert_eq!(sent["suite_id"], 1);
        assert_eq!(sent["runs"][0]["id"], 3);
    }

    #[test]
    fn test_plan_summary() {
        let plan = Artifact::from_value(
            ArtifactKind::Plan,
            json!({"id": 9, "entries": [{"id": 1, "runs": [{"id": 30}]}, {"id": 2, "runs": [{"id": 31}]}]}),
        );
        assert_eq!(plan_summary(&plan), (vec![1, 2], vec![30, 31]));
    }
}
