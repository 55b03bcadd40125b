//! Single-artifact command implementations (find, delete).

use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use crate::connector::parse_id;
use crate::error::Result;
use crate::model::ArtifactKind;

#[derive(Serialize)]
struct DeleteOutput {
    kind: ArtifactKind,
    id: i64,
    deleted: bool,
}

/// Execute the find command.
///
/// # Errors
///
/// Returns an error for a non-numeric id, and connect and lookup failures.
pub fn execute_find(
    id: &str,
    kind: Option<ArtifactKind>,
    config: Option<&Path>,
    artifact_type: Option<ArtifactKind>,
    json: bool,
) -> Result<()> {
    let session = super::open_session(config, artifact_type)?;
    let kind = kind.unwrap_or_else(|| session.kind());
    let artifact = session.gateway().find(kind, id)?;

    if json {
        println!("{}", serde_json::to_string(&artifact.fields)?);
    } else {
        super::print_artifact_line(&artifact);
        let link = session.object_link(&artifact);
        println!("  {}", link.dimmed());
    }
    Ok(())
}

/// Execute the delete command.
///
/// # Errors
///
/// Returns an error for a non-numeric id, and connect and delete failures.
pub fn execute_delete(
    id: &str,
    config: Option<&Path>,
    artifact_type: Option<ArtifactKind>,
    json: bool,
) -> Result<()> {
    let session = super::open_session(config, artifact_type)?;
    let kind = session.kind();
    let id = parse_id(kind, id)?;
    session.gateway().delete(kind, id)?;

    if json {
        let output = DeleteOutput {
            kind,
            id,
            deleted: true,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{} Deleted {kind} {id}", "✓".green());
    }
    Ok(())
}
