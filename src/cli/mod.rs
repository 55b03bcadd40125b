//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::ArtifactKind;

pub mod commands;

/// trsync - TestRail side of a test-management sync
#[derive(Parser, Debug)]
#[command(name = "trsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (default: ~/.trsync/config.json)
    #[arg(long, global = true, env = "TRSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Artifact kind to work on, overriding `ArtifactType` in the config
    /// (case, run, plan, suite, section, result)
    #[arg(long, global = true, env = "TRSYNC_ARTIFACT_TYPE")]
    pub artifact_type: Option<ArtifactKind>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect and show the resolved project, suites and user
    Connect,

    /// Check that the configured id fields exist in TestRail
    Validate,

    /// List unlinked artifacts created or updated since the cutoff
    FindNew,

    /// List linked cases updated since a reference time
    FindUpdates {
        /// RFC 3339 timestamp or a number of days back (e.g. `3d`)
        #[arg(long)]
        since: String,
    },

    /// Read one artifact by id
    Find {
        /// Numeric TestRail id
        id: String,

        /// Kind to read (default: the configured kind)
        #[arg(long)]
        kind: Option<ArtifactKind>,
    },

    /// Delete one artifact of the configured kind
    Delete {
        /// Numeric TestRail id
        id: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
