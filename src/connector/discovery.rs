//! Time-windowed discovery of new and updated artifacts.
//!
//! Cases are discovered per retained suite. Results take the long way round:
//! plans, then their entries' runs, then each run's results, then each
//! result's test and case.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::classify::{CallKind, RemoteCaller};
use super::filter::{ResultChain, SyncFilter};
use super::gateway::ArtifactGateway;
use crate::config::{Cutoff, FeatureFlags};
use crate::error::{Error, Result};
use crate::model::{value_as_i64, Artifact, ArtifactKind, Project, Suite};
use crate::remote::{Endpoint, TimeFilter};

/// Results between two progress lines while dereferencing.
const PROGRESS_EVERY: usize = 30;

/// A plan with everything its entries reference.
#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    pub plan: Artifact,
    /// Runs of all entries, in entry order.
    pub runs: Vec<Artifact>,
    /// Tests of each run, parallel to `runs`.
    pub tests: Vec<Vec<Artifact>>,
    pub run_ids: Vec<i64>,
}

/// Drives discovery for one session.
pub struct DiscoveryEngine<'a> {
    caller: RemoteCaller<'a>,
    gateway: ArtifactGateway<'a>,
    project: &'a Project,
    suites: &'a [Suite],
    filter: SyncFilter<'a>,
    cutoff: Cutoff,
    flags: FeatureFlags,
}

impl<'a> DiscoveryEngine<'a> {
    pub fn new(
        caller: RemoteCaller<'a>,
        project: &'a Project,
        suites: &'a [Suite],
        filter: SyncFilter<'a>,
        cutoff: Cutoff,
        flags: FeatureFlags,
    ) -> Self {
        Self {
            caller,
            gateway: ArtifactGateway::new(caller, project, suites),
            project,
            suites,
            filter,
            cutoff,
            flags,
        }
    }

    /// Unlinked artifacts of `kind` created (or updated) since the cutoff.
    ///
    /// # Errors
    ///
    /// Only cases and results can be discovered. Listing failures are
    /// unrecoverable.
    pub fn find_new(&self, kind: ArtifactKind) -> Result<Vec<Artifact>> {
        info!(%kind, since = %self.cutoff.at(), "Find new TestRail objects");
        let found = match kind {
            ArtifactKind::Case => self.find_new_cases()?,
            ArtifactKind::Result => self.find_new_results()?,
            ArtifactKind::Run
            | ArtifactKind::Plan
            | ArtifactKind::Suite
            | ArtifactKind::Section
            | ArtifactKind::Test => {
                return Err(Error::Unsupported {
                    kind,
                    operation: "find_new",
                });
            }
        };
        info!(count = found.len(), %kind, "Found new TestRail objects");
        Ok(found)
    }

    /// # Errors
    ///
    /// Any failed suite listing is unrecoverable.
    pub fn find_new_cases(&self) -> Result<Vec<Artifact>> {
        let cutoff = self.cutoff.unix();
        let filter = if self.flags.cases_created {
            TimeFilter::CreatedAfter(cutoff)
        } else {
            TimeFilter::UpdatedAfter(cutoff)
        };
        info!(
            suites = ?self.suites.iter().map(|s| s.id).collect::<Vec<_>>(),
            "Find new TestRail cases, {} after {}",
            filter.verb(),
            self.cutoff.at()
        );

        let mut eligible = Vec::new();
        for suite in self.suites {
            let cases = self.cases_in_suite(suite, filter, "Failed to find new TestRail cases")?;
            debug!(count = cases.len(), suite = suite.id, "Found cases in suite");

            let part = self.filter.partition_new(cases);
            debug!(count = part.linked.len(), "Filtered out already connected cases");
            eligible.extend(part.eligible);
        }
        Ok(eligible)
    }

    /// Every plan of the project with its runs and their tests.
    ///
    /// # Errors
    ///
    /// Any failed read is unrecoverable.
    pub fn resolve_plans(&self) -> Result<Vec<ResolvedPlan>> {
        let message = || "Failed to find any test plans".to_string();
        let shells = self.caller.list(
            CallKind::Essential,
            &Endpoint::GetPlans {
                project: self.project.id,
            },
            message,
        )?;

        let mut plans = Vec::with_capacity(shells.len());
        for shell in &shells {
            let Some(plan_id) = shell.get("id").and_then(value_as_i64) else {
                continue;
            };
            let plan = Artifact::from_value(
                ArtifactKind::Plan,
                self.caller
                    .get(CallKind::Essential, &Endpoint::GetPlan(plan_id), message)?,
            );

            let run_ids: Vec<i64> = plan
                .get("entries")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|entry| entry.get("runs").and_then(Value::as_array))
                .flatten()
                .filter_map(|run| run.get("id").and_then(value_as_i64))
                .collect();

            let mut runs = Vec::with_capacity(run_ids.len());
            let mut tests = Vec::with_capacity(run_ids.len());
            for &run_id in &run_ids {
                let run = self
                    .caller
                    .get(CallKind::Essential, &Endpoint::GetRun(run_id), message)?;
                runs.push(Artifact::from_value(ArtifactKind::Run, run));
                tests.push(self.gateway.tests_for_run(run_id)?);
            }

            plans.push(ResolvedPlan {
                plan,
                runs,
                tests,
                run_ids,
            });
        }
        Ok(plans)
    }

    /// Results created since the cutoff whose case is linked but which are
    /// not linked themselves, in run-then-result order.
    ///
    /// # Errors
    ///
    /// Plan resolution and result listings are unrecoverable on failure.
    /// Test and case lookups are per result: a failed one drops that result.
    pub fn find_new_results(&self) -> Result<Vec<Artifact>> {
        let plans = self.resolve_plans()?;
        let runs: Vec<&Artifact> = plans.iter().flat_map(|p| &p.runs).collect();
        let run_ids: Vec<i64> = plans.iter().flat_map(|p| p.run_ids.iter().copied()).collect();
        info!(?run_ids, since = %self.cutoff.at(), "Find new TestRail results, created after cutoff");

        let mut candidates = Vec::new();
        for run in runs {
            let Some(run_id) = run.id() else { continue };
            let endpoint = Endpoint::GetResultsForRun {
                run: run_id,
                filter: Some(TimeFilter::CreatedAfter(self.cutoff.unix())),
            };
            let results = self
                .caller
                .list(CallKind::Essential, &endpoint, || {
                    "Failed to find new test results".to_string()
                })?
                .into_iter()
                .map(|r| Artifact::from_value(ArtifactKind::Result, r))
                .collect();
            candidates.extend(self.filter.partition_new(results).eligible);
        }

        debug!(count = candidates.len(), "Unfiltered result set; dropping results of unconnected cases");
        let mut chains = Vec::with_capacity(candidates.len());
        for (ndx, result) in candidates.into_iter().enumerate() {
            if (ndx + 1) % PROGRESS_EVERY == 0 {
                debug!(searched = ndx + 1, "Continuing search");
            }
            chains.push(self.dereference(result));
        }

        Ok(self
            .filter
            .partition_result_eligibility(chains, self.flags.show_result_vars))
    }

    /// Linked cases updated since `reference`.
    ///
    /// # Errors
    ///
    /// Only cases support update discovery; listing failures are
    /// unrecoverable.
    pub fn find_updates(&self, kind: ArtifactKind, reference: DateTime<Utc>) -> Result<Vec<Artifact>> {
        info!(%kind, since = %reference, "Find updated TestRail objects");
        if kind != ArtifactKind::Case {
            return Err(Error::Unsupported {
                kind,
                operation: "find_updates",
            });
        }

        let filter = TimeFilter::UpdatedAfter(reference.timestamp());
        let mut linked = Vec::new();
        for suite in self.suites {
            let cases = self.cases_in_suite(
                suite,
                filter,
                "Failed trying to find cases for update",
            )?;
            linked.extend(self.filter.partition_new(cases).linked);
        }
        info!(count = linked.len(), %kind, "Found updated TestRail objects");
        Ok(linked)
    }

    fn cases_in_suite(&self, suite: &Suite, filter: TimeFilter, message: &str) -> Result<Vec<Artifact>> {
        let endpoint = Endpoint::GetCases {
            project: self.project.id,
            suite: Some(suite.id),
            filter: Some(filter),
        };
        let cases = self.caller.list(CallKind::Essential, &endpoint, || {
            format!(
                "{message} in project id='{}', suite id='{}', {}_after='{}'",
                self.project.id,
                suite.id,
                filter.verb(),
                filter.timestamp()
            )
        })?;
        Ok(cases
            .into_iter()
            .map(|c| Artifact::from_value(ArtifactKind::Case, c))
            .collect())
    }

    /// Look up a result's test and, through it, its case.
    ///
    /// Lookup failures are logged and leave the link empty.
    fn dereference(&self, result: Artifact) -> ResultChain {
        let test = result.int_field("test_id").and_then(|id| {
            self.gateway
                .find_by_id(ArtifactKind::Test, id)
                .inspect_err(|e| warn!(test_id = id, error = %e, "Could not read test of result"))
                .ok()
        });
        let case = test
            .as_ref()
            .and_then(|t| t.int_field("case_id"))
            .and_then(|id| {
                self.gateway
                    .find_by_id(ArtifactKind::Case, id)
                    .inspect_err(|e| warn!(case_id = id, error = %e, "Could not read case of result"))
                    .ok()
            });
        ResultChain { result, test, case }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SuiteMode;
    use crate::remote::mock::MockTransport;
    use chrono::TimeZone;
    use serde_json::json;

    const EXT: &str = "custom_rallyobjectid";

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

    fn cutoff() -> Cutoff {
        Cutoff::from_days(0, Utc.timestamp_opt(1_000, 0).unwrap()).unwrap()
    }

    fn suites(ids: &[i64]) -> Vec<Suite> {
        ids.iter().map(|&id| Suite { id, name: None }).collect()
    }

    fn engine<'a>(
        transport: &'a MockTransport,
        project: &'a Project,
        suites: &'a [Suite],
        flags: FeatureFlags,
    ) -> DiscoveryEngine<'a> {
        DiscoveryEngine::new(
            RemoteCaller::new(transport),
            project,
            suites,
            SyncFilter::new(EXT),
            cutoff(),
            flags,
        )
    }

    fn ids(artifacts: &[Artifact]) -> Vec<i64> {
        artifacts.iter().filter_map(Artifact::id).collect()
    }

    #[test]
    fn test_new_cases_across_retained_suites() {
        let transport = MockTransport::new()
            .on_get(
                "get_cases/7&suite_id=1&updated_after=1000",
                json!([{"id": 11, EXT: null}, {"id": 12, EXT: "US1"}]),
            )
            .on_get(
                "get_cases/7&suite_id=3&updated_after=1000",
                json!({"cases": [{"id": 31}], "_links": {"next": null}}),
            );
        let (project, suites) = (project(), suites(&[1, 3]));
        let found = engine(&transport, &project, &suites, FeatureFlags::default())
            .find_new(ArtifactKind::Case)
            .unwrap();

        assert_eq!(ids(&found), vec![11, 31]);
        assert!(!transport.called("GET get_cases/7&suite_id=2&updated_after=1000"));
    }

    #[test]
    fn test_cases_created_flag_switches_filter() {
        let transport = MockTransport::new()
            .on_get("get_cases/7&suite_id=1&created_after=1000", json!([{"id": 11}]));
        let (project, suites) = (project(), suites(&[1]));
        let flags = FeatureFlags {
            cases_created: true,
            ..FeatureFlags::default()
        };
        let found = engine(&transport, &project, &suites, flags).find_new_cases().unwrap();
        assert_eq!(ids(&found), vec![11]);
    }

    #[test]
    fn test_case_listing_failure_is_unrecoverable() {
        let transport = MockTransport::new().fail("get_cases/7&suite_id=1&updated_after=1000", 500);
        let (project, suites) = (project(), suites(&[1]));
        let err = engine(&transport, &project, &suites, FeatureFlags::default())
            .find_new(ArtifactKind::Case)
            .unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_updates_keep_only_linked_cases() {
        let transport = MockTransport::new().on_get(
            "get_cases/7&suite_id=1&updated_after=5000",
            json!([{"id": 11, EXT: null}, {"id": 12, EXT: "US1"}]),
        );
        let (project, suites) = (project(), suites(&[1]));
        let engine = engine(&transport, &project, &suites, FeatureFlags::default());

        let reference = Utc.timestamp_opt(5_000, 0).unwrap();
        assert_eq!(ids(&engine.find_updates(ArtifactKind::Case, reference).unwrap()), vec![12]);

        for kind in [ArtifactKind::Run, ArtifactKind::Result] {
            let err = engine.find_updates(kind, reference).unwrap_err();
            assert!(!err.is_recoverable());
        }
    }

    #[test]
    fn test_unsupported_find_new() {
        let transport = MockTransport::new();
        let (project, suites) = (project(), suites(&[1]));
        let err = engine(&transport, &project, &suites, FeatureFlags::default())
            .find_new(ArtifactKind::Run)
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
        assert!(transport.calls().is_empty());
    }

    fn result_fixture() -> MockTransport {
        MockTransport::new()
            .on_get("get_plans/7", json!([{"id": 9}]))
            .on_get(
                "get_plan/9",
                json!({"id": 9, "entries": [{"id": "e1", "runs": [{"id": 4}]}, {"id": "e2", "runs": [{"id": 5}]}]}),
            )
            .on_get("get_run/4", json!({"id": 4}))
            .on_get("get_run/5", json!({"id": 5}))
            .on_get("get_tests/4", json!([{"id": 77}, {"id": 78}]))
            .on_get("get_tests/5", json!([{"id": 79}]))
            .on_get(
                "get_results_for_run/4&created_after=1000",
                json!([
                    {"id": 1, "test_id": 77},
                    {"id": 2, "test_id": 78},
                    {"id": 3, "test_id": 78, EXT: "TCR1"}
                ]),
            )
            .on_get(
                "get_results_for_run/5&created_after=1000",
                json!([{"id": 4, "test_id": 79}, {"id": 5, "test_id": 80}]),
            )
            // test 77 has no case
            .on_get("get_test/77", json!({"id": 77, "case_id": null}))
            .on_get("get_test/78", json!({"id": 78, "case_id": 12}))
            .on_get("get_test/79", json!({"id": 79, "case_id": 13}))
            .fail("get_test/80", 400)
            .on_get("get_case/12", json!({"id": 12, EXT: "US1"}))
            .on_get("get_case/13", json!({"id": 13, EXT: null}))
    }

    #[test]
    fn test_resolve_plans() {
        let transport = result_fixture();
        let (project, suites) = (project(), suites(&[1]));
        let plans = engine(&transport, &project, &suites, FeatureFlags::default())
            .resolve_plans()
            .unwrap();

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].run_ids, vec![4, 5]);
        assert_eq!(plans[0].tests[0].len(), 2);
        assert_eq!(plans[0].tests[1].len(), 1);
    }

    #[test]
    fn test_new_results_need_linked_case() {
        let transport = result_fixture();
        let (project, suites) = (project(), suites(&[1]));
        let found = engine(&transport, &project, &suites, FeatureFlags::default())
            .find_new(ArtifactKind::Result)
            .unwrap();

        // 1: test without case, 3: already linked, 4: case unlinked, 5: test unreadable
        assert_eq!(ids(&found), vec![2]);
        assert_eq!(found[0].fields["_testcase"]["id"], 12);
        assert!(transport.called("GET get_test/80"));
    }

    #[test]
    fn test_result_var_dump_does_not_skip_good_results() {
        let transport = result_fixture();
        let (project, suites) = (project(), suites(&[1]));
        let flags = FeatureFlags {
            show_result_vars: true,
            ..FeatureFlags::default()
        };
        let found = engine(&transport, &project, &suites, flags)
            .find_new_results()
            .unwrap();
        assert_eq!(ids(&found), vec![2]);
    }

    #[test]
    fn test_plan_failure_is_unrecoverable() {
        let transport = MockTransport::new().fail("get_plans/7", 500);
        let (project, suites) = (project(), suites(&[1]));
        let err = engine(&transport, &project, &suites, FeatureFlags::default())
            .find_new(ArtifactKind::Result)
            .unwrap_err();
        assert!(!err.is_recoverable());
    }
}
