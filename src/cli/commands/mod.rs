//! Command implementations.

pub mod artifact;
pub mod completions;
pub mod connect;
pub mod discover;
pub mod version;

use std::path::Path;

use colored::Colorize;

use crate::config::{resolve_config_path, FeatureFlags, JsonConfig, SessionConfig};
use crate::connector::Session;
use crate::error::{Error, Result};
use crate::model::{value_to_string, Artifact, ArtifactKind};

/// Load the session configuration, applying the `--artifact-type` override.
///
/// # Errors
///
/// Returns an error if the config file is missing or invalid.
pub fn load_config(config: Option<&Path>, artifact_type: Option<ArtifactKind>) -> Result<SessionConfig> {
    let path = resolve_config_path(config)
        .ok_or_else(|| Error::Config("Config file not found: no home directory".to_string()))?;
    let source = JsonConfig::load(&path)?;
    let mut session_config = SessionConfig::from_source(&source, FeatureFlags::from_env())?;

    match artifact_type {
        Some(ArtifactKind::Test) => return Err(Error::UnknownKind(ArtifactKind::Test.to_string())),
        Some(kind) => session_config.artifact_kind = kind,
        None => {}
    }
    Ok(session_config)
}

/// Load the configuration and connect.
///
/// # Errors
///
/// Returns configuration errors and unrecoverable connect failures.
pub fn open_session(config: Option<&Path>, artifact_type: Option<ArtifactKind>) -> Result<Session> {
    Session::connect(load_config(config, artifact_type)?)
}

/// Print artifacts as a JSON array, or one line each.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print_artifacts(artifacts: Vec<Artifact>, json: bool) -> Result<()> {
    if json {
        let values: Vec<_> = artifacts.into_iter().map(Artifact::into_value).collect();
        println!("{}", serde_json::to_string(&values)?);
        return Ok(());
    }

    if artifacts.is_empty() {
        println!("{}", "No artifacts found.".dimmed());
        return Ok(());
    }
    for artifact in &artifacts {
        print_artifact_line(artifact);
    }
    println!();
    println!("{} artifact(s)", artifacts.len());
    Ok(())
}

/// One human-readable line: display id, title or name, external id.
pub fn print_artifact_line(artifact: &Artifact) {
    let title = artifact
        .get("title")
        .or_else(|| artifact.get("name"))
        .or_else(|| artifact.get("comment"))
        .map(value_to_string)
        .unwrap_or_default();
    println!(
        "  {} {} {}",
        artifact.display_id().cyan(),
        title,
        format!("[{}]", artifact.kind).dimmed()
    );
}
