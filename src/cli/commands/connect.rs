//! Connect and validate command implementations.

use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use crate::connector::Session;
use crate::error::{Error, Result};
use crate::model::{ArtifactKind, Section, Suite};

#[derive(Serialize)]
struct ConnectOutput<'a> {
    connector: &'a str,
    version: &'a str,
    backend: &'a str,
    project_id: i64,
    project: &'a str,
    suite_mode: i64,
    kind: ArtifactKind,
    suites: &'a [Suite],
    sections: &'a [Section],
    user: &'a serde_json::Value,
    cutoff: String,
    flags: Vec<&'static str>,
}

#[derive(Serialize)]
struct ValidateOutput {
    valid: bool,
    external_id_field: String,
}

/// Execute the connect command.
///
/// # Errors
///
/// Returns configuration errors and unrecoverable connect failures.
pub fn execute(config: Option<&Path>, artifact_type: Option<ArtifactKind>, json: bool) -> Result<()> {
    let session = super::open_session(config, artifact_type)?;
    print_session(&session, json)?;
    session.disconnect();
    Ok(())
}

fn print_session(session: &Session, json: bool) -> Result<()> {
    let project = session.project();
    let directory = session.directory();
    let cutoff = session.config().cutoff;

    if json {
        let output = ConnectOutput {
            connector: session.name(),
            version: session.version(),
            backend: session.backend_version(),
            project_id: project.id,
            project: &project.name,
            suite_mode: project.suite_mode.code(),
            kind: session.kind(),
            suites: directory.suites(),
            sections: directory.sections(),
            user: session.user(),
            cutoff: cutoff.at().to_rfc3339(),
            flags: session.config().flags.names(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!(
        "{} {} ({})",
        "Connected to".green().bold(),
        session.name(),
        session.backend_version()
    );
    println!();
    println!("{}", "Project".cyan().bold());
    println!("  {} {}", project.display_id().cyan(), project.name);
    println!("  Suite mode: {}", project.suite_mode.describe());
    if let Some(completed) = project.completed_at() {
        println!("  Completed:  {}", completed.format("%Y-%m-%d"));
    }
    println!();

    println!("{}", "Suites".cyan().bold());
    for suite in directory.suites() {
        println!(
            "  {} {}",
            suite.display_id().cyan(),
            suite.name.as_deref().unwrap_or("")
        );
    }
    println!("  Sections: {}", directory.sections().len());
    println!();

    println!("Kind:   {}", session.kind());
    println!(
        "Cutoff: {} ({} days)",
        cutoff.at().format("%Y-%m-%d %H:%M:%S UTC"),
        cutoff.days()
    );
    if let Some(name) = session.user().get("name").and_then(|v| v.as_str()) {
        println!("User:   {name}");
    }
    Ok(())
}

/// Execute the validate command.
///
/// # Errors
///
/// Returns a configuration error when a configured field does not exist.
pub fn execute_validate(
    config: Option<&Path>,
    artifact_type: Option<ArtifactKind>,
    json: bool,
) -> Result<()> {
    let session = super::open_session(config, artifact_type)?;
    let valid = session.validate()?;

    if json {
        let output = ValidateOutput {
            valid,
            external_id_field: session.field_names().external_id.clone(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if valid {
        println!("{} all configured fields exist", "✓".green());
    }

    if !valid {
        return Err(Error::Config(
            "One or more configured fields do not exist in TestRail".to_string(),
        ));
    }
    Ok(())
}
