//! Session configuration, resolved once before connecting.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

use super::{ConfigSource, SECTION};
use crate::connector::SuiteAllowList;
use crate::error::{Error, Result};
use crate::model::ArtifactKind;

/// Environment variable holding the comma-separated feature flags.
pub const FLAGS_ENV: &str = "TRSYNC_FLAGS";

/// Environment variable overriding the configured password.
pub const PASSWORD_ENV: &str = "TRSYNC_PASSWORD";

const DEFAULT_RUN_DAYS: u32 = 14;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// Switches that alter discovery behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Discover new cases by creation time instead of update time.
    pub cases_created: bool,
    /// Always take the result anomaly-diagnostic branch (dumps test and
    /// result records). A debugging aid, not production behavior.
    pub show_result_vars: bool,
}

impl FeatureFlags {
    /// Parse a comma-separated flag list.
    ///
    /// Names match case-insensitively, ignoring `-` and `_`, so
    /// `CasesCreated`, `cases-created` and `cases_created` are the same flag.
    /// Unknown names are logged and ignored.
    pub fn parse(input: &str) -> Self {
        let mut flags = Self::default();
        for raw in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let name: String = raw
                .chars()
                .filter(|c| *c != '-' && *c != '_')
                .collect::<String>()
                .to_lowercase();
            match name.as_str() {
                "casescreated" => flags.cases_created = true,
                "showresultvars" | "showtrvars" => flags.show_result_vars = true,
                _ => warn!(flag = raw, "Ignoring unknown feature flag"),
            }
        }
        flags
    }

    /// Read flags from `TRSYNC_FLAGS`.
    pub fn from_env() -> Self {
        std::env::var(FLAGS_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Names of the enabled flags, for log output.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.cases_created {
            names.push("CasesCreated");
        }
        if self.show_result_vars {
            names.push("ShowResultVars");
        }
        names
    }
}

/// The absolute time bounding "new" and "updated" queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoff {
    days: u32,
    at: DateTime<Utc>,
}

impl Cutoff {
    /// `days` before `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the window reaches past the
    /// representable date range.
    pub fn from_days(days: u32, now: DateTime<Utc>) -> Result<Self> {
        let at = TimeDelta::try_seconds(i64::from(days) * SECONDS_PER_DAY)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                Error::Config(format!(
                    "<RunDaysToSearch> of {days} days is out of range"
                ))
            })?;
        Ok(Self { days, at })
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Unix seconds, as the API filters expect.
    pub fn unix(&self) -> i64 {
        self.at.timestamp()
    }
}

/// Everything a session needs, resolved once.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    /// Project name; must match exactly one remote project.
    pub project: String,
    pub artifact_kind: ArtifactKind,
    /// Logical name of the custom field carrying the link to the other system.
    pub external_id_field: String,
    pub id_field: Option<String>,
    pub end_user_id_field: Option<String>,
    /// Custom field receiving the other system's item URL.
    pub item_link_field: Option<String>,
    pub suite_ids: Option<SuiteAllowList>,
    pub timeout: Duration,
    pub cutoff: Cutoff,
    pub flags: FeatureFlags,
}

impl SessionConfig {
    /// Resolve the session configuration, with the cutoff measured from now.
    ///
    /// # Errors
    ///
    /// Returns an unrecoverable error for missing required keys, an
    /// unrecognized artifact type, or malformed numbers and suite ids.
    pub fn from_source(source: &dyn ConfigSource, flags: FeatureFlags) -> Result<Self> {
        Self::from_source_at(source, flags, Utc::now())
    }

    /// Resolve the session configuration with an explicit reference time.
    ///
    /// # Errors
    ///
    /// See [`SessionConfig::from_source`].
    pub fn from_source_at(
        source: &dyn ConfigSource,
        flags: FeatureFlags,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let get = |key: &str| source.value(SECTION, key, false);
        let require = |key: &str| {
            source
                .value(SECTION, key, true)
                .map(Option::unwrap_or_default)
        };

        let password = match std::env::var(PASSWORD_ENV) {
            Ok(p) if !p.is_empty() => p,
            _ => require("Password")?,
        };

        let artifact_kind = match get("ArtifactType")? {
            None => ArtifactKind::Case,
            Some(name) => match name.parse::<ArtifactKind>() {
                Ok(ArtifactKind::Test) | Err(_) => return Err(Error::UnknownKind(name)),
                Ok(kind) => kind,
            },
        };

        let run_days = match get("RunDaysToSearch")? {
            None => DEFAULT_RUN_DAYS,
            Some(days) => days.parse().map_err(|_| {
                Error::Config(format!(
                    "<RunDaysToSearch> must be a non-negative number of days, got '{days}'"
                ))
            })?,
        };

        let timeout_secs = match get("TimeoutSecs")? {
            None => DEFAULT_TIMEOUT_SECS,
            Some(secs) => secs.parse().map_err(|_| {
                Error::Config(format!("<TimeoutSecs> must be a number of seconds, got '{secs}'"))
            })?,
        };

        let suite_ids = get("SuiteIDs")?
            .map(|ids| SuiteAllowList::parse(&ids))
            .transpose()?;

        Ok(Self {
            url: require("Url")?,
            user: require("User")?,
            password,
            project: require("Project")?,
            artifact_kind,
            external_id_field: require("ExternalIDField")?,
            id_field: get("IDField")?,
            end_user_id_field: get("ExternalEndUserIDField")?,
            item_link_field: get("CrosslinkUrlField")?,
            suite_ids,
            timeout: Duration::from_secs(timeout_secs),
            cutoff: Cutoff::from_days(run_days, now)?,
            flags,
        })
    }
}
