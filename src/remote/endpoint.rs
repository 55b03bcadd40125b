//! TestRail API v2 request targets.
//!
//! Targets render to the `method/arg&filter=value` form the API expects after
//! `index.php?/api/v2/`. Building them through [`Endpoint`] keeps the URI
//! grammar in one place instead of scattered string concatenation.

use std::fmt;

/// Time filter applied to list queries (Unix seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    CreatedAfter(i64),
    UpdatedAfter(i64),
}

impl TimeFilter {
    /// `created` / `updated`, for log lines.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::CreatedAfter(_) => "created",
            Self::UpdatedAfter(_) => "updated",
        }
    }

    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        match self {
            Self::CreatedAfter(t) | Self::UpdatedAfter(t) => *t,
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreatedAfter(t) => write!(f, "&created_after={t}"),
            Self::UpdatedAfter(t) => write!(f, "&updated_after={t}"),
        }
    }
}

/// One remote API method with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    GetProjects,
    GetSuites { project: i64 },
    GetSections { project: i64, suite: i64 },
    GetCases {
        project: i64,
        suite: Option<i64>,
        filter: Option<TimeFilter>,
    },
    GetCase(i64),
    GetCaseFields,
    GetResultFields,
    GetTest(i64),
    GetTests { run: i64 },
    GetRun(i64),
    GetPlans { project: i64 },
    GetPlan(i64),
    GetResultsForRun { run: i64, filter: Option<TimeFilter> },
    GetUserByEmail(String),

    AddCase { section: i64 },
    AddRun { project: i64, suite: i64 },
    AddPlan { project: i64 },
    AddPlanEntry { plan: i64 },
    AddSuite { project: i64 },
    AddSection { project: i64 },
    AddResultForCase { run: i64, case: i64 },

    UpdateCase(i64),
    UpdateRun(i64),

    DeleteCase(i64),
    DeleteRun(i64),
    DeletePlan(i64),
    DeleteSuite(i64),
    DeleteSection(i64),
}

impl Endpoint {
    /// Key under which paginated responses wrap their list.
    #[must_use]
    pub const fn list_key(&self) -> Option<&'static str> {
        match self {
            Self::GetProjects => Some("projects"),
            Self::GetSections { .. } => Some("sections"),
            Self::GetCases { .. } => Some("cases"),
            Self::GetTests { .. } => Some("tests"),
            Self::GetPlans { .. } => Some("plans"),
            Self::GetResultsForRun { .. } => Some("results"),
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetProjects => write!(f, "get_projects"),
            Self::GetSuites { project } => write!(f, "get_suites/{project}"),
            Self::GetSections { project, suite } => {
                write!(f, "get_sections/{project}&suite_id={suite}")
            }
            Self::GetCases {
                project,
                suite,
                filter,
            } => {
                write!(f, "get_cases/{project}")?;
                if let Some(suite) = suite {
                    write!(f, "&suite_id={suite}")?;
                }
                if let Some(filter) = filter {
                    write!(f, "{filter}")?;
                }
                Ok(())
            }
            Self::GetCase(id) => write!(f, "get_case/{id}"),
            Self::GetCaseFields => write!(f, "get_case_fields"),
            Self::GetResultFields => write!(f, "get_result_fields"),
            Self::GetTest(id) => write!(f, "get_test/{id}"),
            Self::GetTests { run } => write!(f, "get_tests/{run}"),
            Self::GetRun(id) => write!(f, "get_run/{id}"),
            Self::GetPlans { project } => write!(f, "get_plans/{project}"),
            Self::GetPlan(id) => write!(f, "get_plan/{id}"),
            Self::GetResultsForRun { run, filter } => {
                write!(f, "get_results_for_run/{run}")?;
                if let Some(filter) = filter {
                    write!(f, "{filter}")?;
                }
                Ok(())
            }
            Self::GetUserByEmail(email) => write!(f, "get_user_by_email&email={email}"),
            Self::AddCase { section } => write!(f, "add_case/{section}"),
            Self::AddRun { project, suite } => write!(f, "add_run/{project}&suite_id={suite}"),
            Self::AddPlan { project } => write!(f, "add_plan/{project}"),
            Self::AddPlanEntry { plan } => write!(f, "add_plan_entry/{plan}"),
            Self::AddSuite { project } => write!(f, "add_suite/{project}"),
            Self::AddSection { project } => write!(f, "add_section/{project}"),
            Self::AddResultForCase { run, case } => {
                write!(f, "add_result_for_case/{run}/{case}")
            }
            Self::UpdateCase(id) => write!(f, "update_case/{id}"),
            Self::UpdateRun(id) => write!(f, "update_run/{id}"),
            Self::DeleteCase(id) => write!(f, "delete_case/{id}"),
            Self::DeleteRun(id) => write!(f, "delete_run/{id}"),
            Self::DeletePlan(id) => write!(f, "delete_plan/{id}"),
            Self::DeleteSuite(id) => write!(f, "delete_suite/{id}"),
            Self::DeleteSection(id) => write!(f, "delete_section/{id}"),
        }
    }
}
