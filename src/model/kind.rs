//! Artifact kinds exposed by the TestRail API.
//!
//! Every operation in the connector dispatches on [`ArtifactKind`] instead of
//! comparing type strings, so unsupported kind/operation pairs are explicit
//! match arms.

use serde::{Deserialize, Serialize};

/// The kinds of TestRail records the connector can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A test case (lives in a section of a suite).
    Case,
    /// A test run (an execution of a suite).
    Run,
    /// A test plan (a group of runs, organized in entries).
    Plan,
    /// A test suite.
    Suite,
    /// A section inside a suite.
    Section,
    /// A result recorded against a test.
    Result,
    /// A test: one case instantiated inside a run.
    Test,
}

impl ArtifactKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Case,
        Self::Run,
        Self::Plan,
        Self::Suite,
        Self::Section,
        Self::Result,
        Self::Test,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Case => "case",
            Self::Run => "run",
            Self::Plan => "plan",
            Self::Suite => "suite",
            Self::Section => "section",
            Self::Result => "result",
            Self::Test => "test",
        }
    }

    /// Letter TestRail's web UI prefixes to numeric ids (C12, R4, S2, T77).
    ///
    /// Plans share the run prefix in the UI. Sections and results have none.
    #[must_use]
    pub const fn display_prefix(&self) -> Option<char> {
        match self {
            Self::Case => Some('C'),
            Self::Run | Self::Plan => Some('R'),
            Self::Suite => Some('S'),
            Self::Test => Some('T'),
            Self::Section | Self::Result => None,
        }
    }

    /// Path segment of the artifact's page in the web UI.
    #[must_use]
    pub const fn view_path(&self) -> Option<&'static str> {
        match self {
            Self::Case => Some("cases/view"),
            Self::Run => Some("runs/view"),
            Self::Plan => Some("plans/view"),
            Self::Suite => Some("suites/view"),
            Self::Test => Some("tests/view"),
            Self::Section | Self::Result => None,
        }
    }

    /// Whether TestRail exposes a custom-field schema for this kind.
    #[must_use]
    pub const fn has_field_schema(&self) -> bool {
        matches!(self, Self::Case | Self::Result)
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = String;

    /// Accepts the short names as well as the `test`-prefixed names used in
    /// connector configuration files (`testcase`, `testresult`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let name = match lower.as_str() {
            "test" => "test",
            other => other.strip_prefix("test").unwrap_or(other),
        };
        match name {
            "case" => Ok(Self::Case),
            "run" => Ok(Self::Run),
            "plan" => Ok(Self::Plan),
            "suite" => Ok(Self::Suite),
            "section" => Ok(Self::Section),
            "result" => Ok(Self::Result),
            "test" => Ok(Self::Test),
            _ => Err(format!("Unknown artifact kind: {s}")),
        }
    }
}
