//! Configuration management.
//!
//! The connector reads its settings through the [`ConfigSource`] accessor, so
//! the host decides where values come from. The bundled source is
//! [`JsonConfig`], a JSON document of sections:
//!
//! ```json
//! {
//!   "TestRailConnection": {
//!     "Url": "https://acme.testrail.io",
//!     "User": "qa@acme.io",
//!     "Password": "...",
//!     "Project": "Payments",
//!     "ArtifactType": "testcase",
//!     "ExternalIDField": "RallyObjectID",
//!     "SuiteIDs": "S1,S3",
//!     "RunDaysToSearch": 14
//!   }
//! }
//! ```
//!
//! Everything derived from configuration (the cutoff time, feature flags) is
//! resolved once in [`SessionConfig`] and read-only afterwards.

mod session;

pub use session::{Cutoff, FeatureFlags, SessionConfig, FLAGS_ENV, PASSWORD_ENV};

use crate::error::{Error, Result};

use serde_json::Value;
use std::path::{Path, PathBuf};

/// Section holding the TestRail connection settings.
pub const SECTION: &str = "TestRailConnection";

/// Host configuration accessor.
pub trait ConfigSource {
    /// Look up `key` in `section`.
    ///
    /// Empty and null values read as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `required` is set and the key is absent.
    fn value(&self, section: &str, key: &str, required: bool) -> Result<Option<String>>;
}

/// Sectioned JSON configuration document.
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    root: serde_json::Map<String, Value>,
}

impl JsonConfig {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be read, or is not
    /// a JSON object.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let value: Value = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })?;

        Self::from_value(value)
    }

    /// Wrap an already-decoded document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(Error::Config(
                "Config document must be a JSON object of sections".to_string(),
            )),
        }
    }
}

impl ConfigSource for JsonConfig {
    fn value(&self, section: &str, key: &str, required: bool) -> Result<Option<String>> {
        let raw = self.root.get(section).and_then(|s| s.get(key));
        let value = match raw {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        };

        if value.is_none() && required {
            return Err(Error::Config(format!(
                "Missing required key <{key}> in section <{section}>"
            )));
        }
        Ok(value)
    }
}

/// Get the global trsync directory (`~/.trsync/`).
#[must_use]
pub fn global_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".trsync"))
}

/// Resolve the configuration file path.
///
/// Priority: explicit path (CLI flag / `TRSYNC_CONFIG`) > `~/.trsync/config.json`.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| global_dir().map(|dir| dir.join("config.json")))
}
