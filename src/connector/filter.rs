//! Link-state filtering of discovered artifacts.
//!
//! An artifact is linked to the work-item system once its external-id custom
//! field holds a value. New-artifact discovery keeps the unlinked ones;
//! update discovery keeps the linked ones.
//!
//! Results get a second stage. A result is only eligible when its test
//! exists, that test names a case, and the case itself is linked: a case has
//! to be synchronized before any of its results can be.

use serde_json::Value;
use tracing::warn;

use super::catalog::{RESULT_CASE_FIELD, RESULT_TEST_FIELD};
use crate::model::Artifact;

/// Output of [`SyncFilter::partition_new`]. Input order is kept in both halves.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Partition {
    /// External id unset: candidates for a first sync.
    pub eligible: Vec<Artifact>,
    pub linked: Vec<Artifact>,
}

/// A result together with the records it references.
#[derive(Debug, Clone)]
pub struct ResultChain {
    pub result: Artifact,
    /// `None` when the referenced test could not be read.
    pub test: Option<Artifact>,
    /// `None` when the test names no case or the case could not be read.
    pub case: Option<Artifact>,
}

impl ResultChain {
    /// Case id the chain's test refers to, if any.
    pub fn case_reference(&self) -> Option<i64> {
        self.test.as_ref().and_then(|t| t.int_field("case_id"))
    }

    /// The result with its test and case attached under the reference fields.
    pub fn into_result(self) -> Artifact {
        let mut result = self.result;
        let attach = |a: Option<Artifact>| a.map_or(Value::Null, Artifact::into_value);
        result
            .fields
            .insert(RESULT_TEST_FIELD.to_string(), attach(self.test));
        result
            .fields
            .insert(RESULT_CASE_FIELD.to_string(), attach(self.case));
        result
    }
}

/// Why a result was kept or dropped by the second stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultEligibility {
    Eligible,
    /// The referenced test does not exist.
    MissingTest,
    /// The test exists but has an empty case reference.
    MissingCaseReference,
    /// The test names a case that could not be read.
    MissingCase,
    /// The case exists but is not linked yet.
    CaseUnlinked,
}

impl ResultEligibility {
    /// Remote data inconsistencies, as opposed to ordinary exclusions.
    pub fn is_anomaly(self) -> bool {
        matches!(self, Self::MissingTest | Self::MissingCaseReference)
    }

    pub fn reason(self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::MissingTest => "result has no test",
            Self::MissingCaseReference => "test has no case_id",
            Self::MissingCase => "case could not be read",
            Self::CaseUnlinked => "case is not linked",
        }
    }
}

/// Partitions artifacts by the state of one external-id field.
#[derive(Debug, Clone, Copy)]
pub struct SyncFilter<'a> {
    external_id: &'a str,
}

impl<'a> SyncFilter<'a> {
    /// `external_id` is the record field name (`custom_...`), not the
    /// logical name.
    pub fn new(external_id: &'a str) -> Self {
        Self { external_id }
    }

    pub fn is_linked(&self, artifact: &Artifact) -> bool {
        artifact.is_set(self.external_id)
    }

    /// Split a batch into unlinked and linked artifacts.
    pub fn partition_new(&self, artifacts: Vec<Artifact>) -> Partition {
        let (linked, eligible) = artifacts.into_iter().partition(|a| self.is_linked(a));
        Partition { eligible, linked }
    }

    pub fn result_eligibility(&self, chain: &ResultChain) -> ResultEligibility {
        if chain.test.is_none() {
            return ResultEligibility::MissingTest;
        }
        if chain.case_reference().is_none() {
            return ResultEligibility::MissingCaseReference;
        }
        match &chain.case {
            None => ResultEligibility::MissingCase,
            Some(case) if self.is_linked(case) => ResultEligibility::Eligible,
            Some(_) => ResultEligibility::CaseUnlinked,
        }
    }

    /// Keep the results whose reference chain is intact and whose case is
    /// linked, with `_test` / `_testcase` attached.
    ///
    /// Anomalies are logged with the test and result dumped, never raised.
    /// `dump_all` logs the dump for every result, anomalous or not.
    pub fn partition_result_eligibility(
        &self,
        chains: Vec<ResultChain>,
        dump_all: bool,
    ) -> Vec<Artifact> {
        let mut eligible = Vec::new();
        for chain in chains {
            let verdict = self.result_eligibility(&chain);
            if verdict.is_anomaly() || dump_all {
                report(&chain, verdict);
            }
            if verdict == ResultEligibility::Eligible {
                eligible.push(chain.into_result());
            }
        }
        eligible
    }
}

fn report(chain: &ResultChain, verdict: ResultEligibility) {
    let test_id = chain
        .test
        .as_ref()
        .and_then(Artifact::id)
        .or_else(|| chain.result.int_field("test_id"));
    let test = chain
        .test
        .as_ref()
        .map_or_else(|| "null".to_string(), dump);
    warn!(
        ?test_id,
        reason = verdict.reason(),
        %test,
        result = %dump(&chain.result),
        "TestRail database integrity issue?"
    );
}

fn dump(artifact: &Artifact) -> String {
    serde_json::to_string(&artifact.fields).unwrap_or_default()
}
