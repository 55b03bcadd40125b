//! Classification of remote-call failures.
//!
//! A failed call is unrecoverable when the session needs its answer to make
//! any progress (project, schema, hierarchy, user lookup, discovery
//! listings) and recoverable when it concerns a single item the caller can
//! retry or skip. Every failure is logged with its target and payload before
//! it is converted.

use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result, Severity};
use crate::remote::{get_list, Endpoint, Transport, TransportError};

/// What a remote call is for, which decides the severity of its failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// The session cannot continue without this answer.
    Essential,
    /// A single create/read/update/delete on one item.
    PerItem,
}

impl CallKind {
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::Essential => Severity::Unrecoverable,
            Self::PerItem => Severity::Recoverable,
        }
    }
}

/// Log a transport failure with its call context and convert it.
pub fn classify(
    kind: CallKind,
    uri: &str,
    payload: Option<&Value>,
    err: TransportError,
    message: impl Into<String>,
) -> Error {
    let message = message.into();
    let severity = kind.severity();
    let payload = payload.map_or_else(|| "none".to_string(), |body| body.to_string());
    warn!(
        uri,
        payload = %payload,
        error = %err,
        severity = severity.as_str(),
        "TestRail API call failed: {message}"
    );
    Error::from_transport(severity, message, uri, err)
}

/// Transport access where every failure is classified.
#[derive(Clone, Copy)]
pub struct RemoteCaller<'a> {
    transport: &'a dyn Transport,
}

impl<'a> RemoteCaller<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Read a single record.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; `message` is only built on failure.
    pub fn get(
        &self,
        kind: CallKind,
        endpoint: &Endpoint,
        message: impl FnOnce() -> String,
    ) -> Result<Value> {
        let uri = endpoint.to_string();
        self.transport
            .get(&uri)
            .map_err(|e| classify(kind, &uri, None, e, message()))
    }

    /// Read a list, following pagination.
    ///
    /// # Errors
    ///
    /// Returns the classified failure.
    pub fn list(
        &self,
        kind: CallKind,
        endpoint: &Endpoint,
        message: impl FnOnce() -> String,
    ) -> Result<Vec<Value>> {
        get_list(self.transport, endpoint)
            .map_err(|e| classify(kind, &endpoint.to_string(), None, e, message()))
    }

    /// Issue a write.
    ///
    /// # Errors
    ///
    /// Returns the classified failure, logged with the payload.
    pub fn post(
        &self,
        kind: CallKind,
        endpoint: &Endpoint,
        body: Option<&Value>,
        message: impl FnOnce() -> String,
    ) -> Result<Value> {
        let uri = endpoint.to_string();
        self.transport
            .post(&uri, body)
            .map_err(|e| classify(kind, &uri, body, e, message()))
    }
}
