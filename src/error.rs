//! Error types for the TestRail connector.
//!
//! Every failure carries one of two severities:
//! - **Recoverable**: the caller may retry or skip the single item and continue
//! - **Unrecoverable**: the session cannot make progress and must stop
//!
//! On top of the severity each error has a machine-readable `ErrorCode`, a
//! category-based exit code, an optional recovery hint, and a structured
//! JSON rendering for piped / non-TTY consumers.

use thiserror::Error;

use crate::model::ArtifactKind;
use crate::remote::TransportError;

/// Result type alias for connector operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Severity ──────────────────────────────────────────────────

/// How the caller must react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Retry or skip this item; the batch may continue.
    Recoverable,
    /// Abort the session.
    Unrecoverable,
}

impl Severity {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Unrecoverable => "unrecoverable",
        }
    }
}

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Internal (exit 1)
    InternalError,

    // Session (exit 2)
    SessionFailed,
    ProjectMatch,

    // Item (exit 3)
    ItemFailed,
    ExternalIdNotFound,
    ExternalIdAmbiguous,

    // Validation (exit 4)
    InvalidId,
    MissingTarget,

    // Unsupported (exit 5)
    UnsupportedOperation,
    UnknownKind,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::InternalError => "INTERNAL_ERROR",
            Self::SessionFailed => "SESSION_FAILED",
            Self::ProjectMatch => "PROJECT_MATCH",
            Self::ItemFailed => "ITEM_FAILED",
            Self::ExternalIdNotFound => "EXTERNAL_ID_NOT_FOUND",
            Self::ExternalIdAmbiguous => "EXTERNAL_ID_AMBIGUOUS",
            Self::InvalidId => "INVALID_ID",
            Self::MissingTarget => "MISSING_TARGET",
            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            Self::UnknownKind => "UNKNOWN_KIND",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::SessionFailed | Self::ProjectMatch => 2,
            Self::ItemFailed | Self::ExternalIdNotFound | Self::ExternalIdAmbiguous => 3,
            Self::InvalidId | Self::MissingTarget => 4,
            Self::UnsupportedOperation | Self::UnknownKind => 5,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Severity attached to this code.
    ///
    /// Per-item failures and caller input errors are recoverable; anything
    /// that leaves the session without a project, hierarchy, catalog or
    /// usable configuration is not.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::ItemFailed
            | Self::ExternalIdNotFound
            | Self::ExternalIdAmbiguous
            | Self::InvalidId
            | Self::MissingTarget => Severity::Recoverable,
            Self::InternalError
            | Self::SessionFailed
            | Self::ProjectMatch
            | Self::UnsupportedOperation
            | Self::UnknownKind
            | Self::ConfigError
            | Self::IoError
            | Self::JsonError => Severity::Unrecoverable,
        }
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors raised by connector operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A single remote operation failed; the batch may continue.
    #[error("{message}")]
    Recoverable {
        message: String,
        /// Remote call target (or operation) that failed.
        origin: String,
        #[source]
        source: Option<TransportError>,
    },

    /// The session cannot continue.
    #[error("{message}")]
    Unrecoverable {
        message: String,
        origin: String,
        #[source]
        source: Option<TransportError>,
    },

    #[error("Invalid {kind} id '{id}': expected a non-negative integer")]
    InvalidId { kind: ArtifactKind, id: String },

    #[error("Cannot create a {kind}: missing '{field}'")]
    MissingTarget { kind: ArtifactKind, field: &'static str },

    #[error("Found {found} projects named '{name}'; the connector needs exactly one")]
    ProjectMatch { name: String, found: usize },

    #[error("No artifacts found with external id '{external_id}'")]
    ExternalIdNotFound { external_id: String },

    #[error("More than one artifact found with external id '{external_id}' (ids: {})", ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    ExternalIdAmbiguous { external_id: String, ids: Vec<i64> },

    #[error("Not available for '{kind}': {operation}")]
    Unsupported {
        kind: ArtifactKind,
        operation: &'static str,
    },

    #[error("Unrecognized artifact kind: '{0}'")]
    UnknownKind(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// A recoverable failure with no underlying transport error.
    pub fn recoverable(message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::Recoverable {
            message: message.into(),
            origin: origin.into(),
            source: None,
        }
    }

    /// An unrecoverable failure with no underlying transport error.
    pub fn unrecoverable(message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::Unrecoverable {
            message: message.into(),
            origin: origin.into(),
            source: None,
        }
    }

    /// Wrap a transport failure at the given severity.
    pub fn from_transport(
        severity: Severity,
        message: impl Into<String>,
        origin: impl Into<String>,
        source: TransportError,
    ) -> Self {
        let (message, origin, source) = (message.into(), origin.into(), Some(source));
        match severity {
            Severity::Recoverable => Self::Recoverable {
                message,
                origin,
                source,
            },
            Severity::Unrecoverable => Self::Unrecoverable {
                message,
                origin,
                source,
            },
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Recoverable { .. } => ErrorCode::ItemFailed,
            Self::Unrecoverable { .. } => ErrorCode::SessionFailed,
            Self::InvalidId { .. } => ErrorCode::InvalidId,
            Self::MissingTarget { .. } => ErrorCode::MissingTarget,
            Self::ProjectMatch { .. } => ErrorCode::ProjectMatch,
            Self::ExternalIdNotFound { .. } => ErrorCode::ExternalIdNotFound,
            Self::ExternalIdAmbiguous { .. } => ErrorCode::ExternalIdAmbiguous,
            Self::Unsupported { .. } => ErrorCode::UnsupportedOperation,
            Self::UnknownKind(_) => ErrorCode::UnknownKind,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
        }
    }

    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.error_code().severity()
    }

    /// Whether the caller may retry or skip and continue the batch.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self.severity(), Severity::Recoverable)
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Remote call target or operation the error originated from.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        match self {
            Self::Recoverable { origin, .. } | Self::Unrecoverable { origin, .. } => {
                Some(origin.as_str())
            }
            _ => None,
        }
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::InvalidId { id, .. } => {
                let digits: String = id.chars().filter(char::is_ascii_digit).collect();
                if digits.is_empty() {
                    Some("TestRail ids are plain integers (e.g. 12)".to_string())
                } else {
                    Some(format!("Drop the display prefix: use '{digits}'"))
                }
            }

            Self::ProjectMatch { found: 0, name } => Some(format!(
                "No project is named '{name}'. Check `Project` in the config (names are case-sensitive)."
            )),
            Self::ProjectMatch { name, .. } => Some(format!(
                "Project names must be unique; rename the duplicates of '{name}' in TestRail."
            )),

            Self::ExternalIdAmbiguous { ids, .. } => Some(format!(
                "Clear the external id on all but one of: {}",
                ids.iter().map(|id| format!("C{id}")).collect::<Vec<_>>().join(", ")
            )),

            Self::Config(msg) if msg.contains("not found") => Some(
                "Pass --config <path> or set TRSYNC_CONFIG (default: ~/.trsync/config.json)"
                    .to_string(),
            ),

            Self::Unsupported { kind, .. } => Some(format!(
                "Set `ArtifactType` to a kind that supports this operation (current: {kind})"
            )),

            Self::Recoverable { .. }
            | Self::Unrecoverable { .. }
            | Self::MissingTarget { .. }
            | Self::ExternalIdNotFound { .. }
            | Self::UnknownKind(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "severity": code.severity().as_str(),
                "retryable": self.is_recoverable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(origin) = self.origin() {
            obj["error"]["origin"] = serde_json::Value::String(origin.to_string());
        }
        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_errors_are_recoverable() {
        let err = Error::InvalidId {
            kind: ArtifactKind::Case,
            id: "abc".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_unsupported_is_unrecoverable() {
        let err = Error::Unsupported {
            kind: ArtifactKind::Run,
            operation: "find_updates",
        };
        assert_eq!(err.severity(), Severity::Unrecoverable);
        assert_eq!(err.to_string(), "Not available for 'run': find_updates");
    }

    #[test]
    fn test_transport_wrapping_keeps_severity_and_origin() {
        let source = TransportError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        let err = Error::from_transport(Severity::Recoverable, "Failed", "add_case/3", source);
        assert!(err.is_recoverable());
        assert_eq!(err.origin(), Some("add_case/3"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_structured_json() {
        let err = Error::ExternalIdAmbiguous {
            external_id: "US12".to_string(),
            ids: vec![3, 4],
        };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "EXTERNAL_ID_AMBIGUOUS");
        assert_eq!(json["error"]["severity"], "recoverable");
        assert_eq!(json["error"]["retryable"], true);
        assert_eq!(json["error"]["hint"], "Clear the external id on all but one of: C3, C4");
        assert!(err.to_string().contains("(ids: 3, 4)"));
    }

    #[test]
    fn test_invalid_id_hint_strips_prefix() {
        let err = Error::InvalidId {
            kind: ArtifactKind::Case,
            id: "C12".to_string(),
        };
        assert_eq!(err.hint().as_deref(), Some("Drop the display prefix: use '12'"));
    }
}
