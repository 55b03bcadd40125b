//! Project model for the TestRail connector.
//!
//! A project is resolved once at connect time and is immutable for the rest of
//! the session. Its suite mode decides how the suite hierarchy is discovered.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

use super::artifact::{value_as_i64, value_to_string};

/// How a project organizes its test cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteMode {
    /// One suite holds every case.
    Single,
    /// One suite plus baselines; the suite list is not exposed.
    SingleWithBaselines,
    /// Any number of named suites.
    Multi,
}

impl SuiteMode {
    /// Map TestRail's numeric `suite_mode` (1, 2, 3).
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Single),
            2 => Some(Self::SingleWithBaselines),
            3 => Some(Self::Multi),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Single => 1,
            Self::SingleWithBaselines => 2,
            Self::Multi => 3,
        }
    }

    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Single => "single suite",
            Self::SingleWithBaselines => "single suite + baselines",
            Self::Multi => "multiple suites",
        }
    }
}

/// A TestRail project.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    /// Remote identity
    pub id: i64,

    /// Display name, matched against the configured project name
    pub name: String,

    pub suite_mode: SuiteMode,

    /// Web UI address of the project
    pub url: Option<String>,

    pub is_completed: bool,

    /// Completion timestamp (Unix seconds)
    pub completed_on: Option<i64>,
}

impl Project {
    /// Build a project from a `get_projects` entry.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the id is missing or the
    /// suite mode is not one TestRail defines.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let id = value
            .get("id")
            .and_then(value_as_i64)
            .ok_or_else(|| "project has no numeric id".to_string())?;
        let raw_mode = value.get("suite_mode").and_then(value_as_i64);
        let suite_mode = raw_mode.and_then(SuiteMode::from_code).ok_or_else(|| {
            format!(
                "Invalid value for suite_mode ({})",
                value.get("suite_mode").map_or_else(|| "none".to_string(), value_to_string)
            )
        })?;

        Ok(Self {
            id,
            name: value
                .get("name")
                .map(value_to_string)
                .unwrap_or_default(),
            suite_mode,
            url: value.get("url").and_then(Value::as_str).map(String::from),
            is_completed: value
                .get("is_completed")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            completed_on: value.get("completed_on").and_then(value_as_i64),
        })
    }

    /// Completion time as a UTC timestamp, when the project is completed.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_on
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    /// Display id as shown in the web UI (P7).
    pub fn display_id(&self) -> String {
        format!("P{}", self.id)
    }
}
