//! Discovery command implementations.

use chrono::{DateTime, TimeDelta, Utc};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::ArtifactKind;

/// Execute the find-new command.
///
/// # Errors
///
/// Returns connect and discovery failures.
pub fn execute_find_new(
    config: Option<&Path>,
    artifact_type: Option<ArtifactKind>,
    json: bool,
) -> Result<()> {
    let session = super::open_session(config, artifact_type)?;
    let found = session.find_new()?;
    super::print_artifacts(found, json)
}

/// Execute the find-updates command.
///
/// # Errors
///
/// Returns an error for an unparseable `--since`, and connect and discovery
/// failures.
pub fn execute_find_updates(
    since: &str,
    config: Option<&Path>,
    artifact_type: Option<ArtifactKind>,
    json: bool,
) -> Result<()> {
    let reference = parse_since(since, Utc::now())?;
    let session = super::open_session(config, artifact_type)?;
    let found = session.find_updates(reference)?;
    super::print_artifacts(found, json)
}

/// Parse an RFC 3339 timestamp or a relative `<N>d` (days before `now`).
fn parse_since(since: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let since = since.trim();
    if let Some(days) = since.strip_suffix(['d', 'D']) {
        let days: i64 = days.parse().map_err(|_| invalid_since(since))?;
        return TimeDelta::try_days(days)
            .and_then(|delta| now.checked_sub_signed(delta))
            .ok_or_else(|| invalid_since(since));
    }

    DateTime::parse_from_rfc3339(since)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| invalid_since(since))
}

fn invalid_since(since: &str) -> Error {
    Error::Config(format!(
        "Invalid --since '{since}': expected an RFC 3339 timestamp or a day count like '3d'"
    ))
}
