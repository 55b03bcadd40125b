//! Suite and section topology of the connected project.
//!
//! How suites are found depends on the project's suite mode:
//! - `Single`: whatever `get_suites` returns, verbatim
//! - `SingleWithBaselines`: one synthetic suite whose id is the project id
//!   (the real suite list is not exposed in this mode)
//! - `Multi`: `get_suites`, which must return at least one suite
//!
//! A configured allow-list then narrows the suites, keeping discovery order.
//! The directory is resolved once per session and is read-only afterwards.

use tracing::{debug, info, warn};

use super::classify::{CallKind, RemoteCaller};
use crate::error::{Error, Result};
use crate::model::{Project, Section, Suite, SuiteMode};
use crate::remote::Endpoint;

/// Suite ids a session is restricted to.
///
/// Parsed from a comma-separated list; a leading `S`/`s` is stripped, so
/// `S3` and `3` name the same suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteAllowList {
    ids: Vec<i64>,
}

impl SuiteAllowList {
    /// # Errors
    ///
    /// Returns a configuration error for non-numeric entries or an empty list.
    pub fn parse(input: &str) -> Result<Self> {
        let mut ids = Vec::new();
        for raw in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let digits = raw.strip_prefix(['S', 's']).unwrap_or(raw);
            let id = digits.parse::<i64>().map_err(|_| {
                Error::Config(format!("Invalid suite id '{raw}' in <SuiteIDs>"))
            })?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        if ids.is_empty() {
            return Err(Error::Config("<SuiteIDs> is set but lists no suites".to_string()));
        }
        Ok(Self { ids })
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Keep only the allowed suites, in discovery order.
    ///
    /// # Errors
    ///
    /// Any allowed id missing from `discovered` is an unrecoverable
    /// configuration error.
    pub fn retain(&self, discovered: Vec<Suite>) -> Result<Vec<Suite>> {
        let unknown: Vec<i64> = self
            .ids
            .iter()
            .copied()
            .filter(|id| !discovered.iter().any(|s| s.id == *id))
            .collect();
        if !unknown.is_empty() {
            return Err(Error::Config(format!(
                "Found unknown ID(s) in <SuiteIDs>: {unknown:?}"
            )));
        }

        Ok(discovered
            .into_iter()
            .filter(|suite| self.contains(suite.id))
            .collect())
    }
}

/// Resolve the suites searches will cover.
///
/// # Errors
///
/// Unrecoverable when the suite listing fails, when a multi-suite project
/// has no suites, or when the allow-list names an unknown suite.
pub fn resolve_suites(
    caller: RemoteCaller<'_>,
    project: &Project,
    allow: Option<&SuiteAllowList>,
) -> Result<Vec<Suite>> {
    let discovered = match project.suite_mode {
        SuiteMode::SingleWithBaselines => vec![Suite::synthetic(project.id)],
        SuiteMode::Single | SuiteMode::Multi => {
            let endpoint = Endpoint::GetSuites {
                project: project.id,
            };
            let suites: Vec<Suite> = caller
                .list(CallKind::Essential, &endpoint, || {
                    format!(
                        "Failed trying to get list of Suites for Project id='{}'",
                        project.id
                    )
                })?
                .iter()
                .filter_map(Suite::from_value)
                .collect();

            if project.suite_mode == SuiteMode::Multi && suites.is_empty() {
                return Err(Error::unrecoverable(
                    "No suites found in a multi-suite project (can't continue)",
                    endpoint.to_string(),
                ));
            }
            suites
        }
    };

    info!(count = discovered.len(), project = project.id, "Found suites in project");
    for suite in &discovered {
        info!(suite = %suite.display_id(), name = suite.name.as_deref().unwrap_or(""), "Suite");
    }

    let retained = match allow {
        Some(allow) => allow.retain(discovered)?,
        None => discovered,
    };
    debug!(
        suites = ?retained.iter().map(|s| s.id).collect::<Vec<_>>(),
        limited = allow.is_some(),
        "Future searches will cover these suites"
    );
    Ok(retained)
}

/// Resolve sections for every retained suite, in suite order.
///
/// Best-effort: a failed listing for one suite is logged and contributes no
/// sections; the other suites are still resolved.
pub fn resolve_sections(caller: RemoteCaller<'_>, project: &Project, suites: &[Suite]) -> Vec<Section> {
    let mut sections = Vec::new();
    for suite in suites {
        let endpoint = Endpoint::GetSections {
            project: project.id,
            suite: suite.id,
        };
        match caller.list(CallKind::PerItem, &endpoint, || {
            format!("Failed to list sections of suite {}", suite.display_id())
        }) {
            Ok(batch) => sections.extend(batch.iter().filter_map(Section::from_value)),
            Err(e) => warn!(suite = suite.id, error = %e, "Skipping sections of suite"),
        }
    }
    sections
}

/// The project's resolved suites and sections.
#[derive(Debug, Clone, Default)]
pub struct HierarchyDirectory {
    suites: Vec<Suite>,
    sections: Vec<Section>,
}

impl HierarchyDirectory {
    /// Resolve suites (narrowed by the allow-list) and their sections.
    ///
    /// # Errors
    ///
    /// See [`resolve_suites`].
    pub fn resolve(
        caller: RemoteCaller<'_>,
        project: &Project,
        allow: Option<&SuiteAllowList>,
    ) -> Result<Self> {
        let suites = resolve_suites(caller, project, allow)?;
        let sections = resolve_sections(caller, project, &suites);

        debug!(count = sections.len(), "Found sections");
        for section in &sections {
            debug!(
                id = section.id,
                suite_id = ?section.suite_id,
                name = section.name.as_deref().unwrap_or(""),
                "Section"
            );
        }

        Ok(Self { suites, sections })
    }

    pub fn new(suites: Vec<Suite>, sections: Vec<Section>) -> Self {
        Self { suites, sections }
    }

    pub fn suites(&self) -> &[Suite] {
        &self.suites
    }

    pub fn suite_ids(&self) -> Vec<i64> {
        self.suites.iter().map(|s| s.id).collect()
    }

    /// Sections across all retained suites.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn contains_section(&self, id: i64) -> bool {
        self.sections.iter().any(|s| s.id == id)
    }
}
