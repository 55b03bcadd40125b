//! The TestRail transport seam.
//!
//! The connector core never talks HTTP directly. It issues requests through
//! the [`Transport`] trait, which returns decoded JSON or a [`TransportError`].
//! [`HttpTransport`] is the production implementation; tests substitute an
//! in-memory transport with canned responses.
//!
//! Requests are blocking: every call is issued and awaited before the next.

mod endpoint;
mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use endpoint::{Endpoint, TimeFilter};
pub use http::{server_root, HttpTransport};

use serde_json::Value;

/// Request/response access to the TestRail API.
///
/// `uri` is the API method with its arguments, as rendered by [`Endpoint`]
/// (e.g. `get_cases/7&suite_id=3`).
pub trait Transport {
    /// Issue a read request.
    fn get(&self, uri: &str) -> Result<Value, TransportError>;

    /// Issue a write request. A `None` body is sent as an empty POST.
    fn post(&self, uri: &str, body: Option<&Value>) -> Result<Value, TransportError>;
}

/// Failures below the connector: network, HTTP status, or response decoding.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TestRail API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected response shape from '{uri}': {detail}")]
    Shape { uri: String, detail: String },

    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl TransportError {
    /// Build a status error, unwrapping TestRail's `{"error": "..."}` bodies.
    pub fn status(status: u16, body: &str) -> Self {
        let body = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
            .unwrap_or_else(|| body.trim().to_string());
        Self::Status { status, body }
    }

    /// HTTP status code, when the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Fetch a list endpoint, following pagination.
///
/// TestRail answers list methods either with a bare array or, on newer
/// servers, with an envelope `{"<key>": [...], "_links": {"next": ...}}`.
/// Both shapes are accepted; `next` links are followed until exhausted.
///
/// # Errors
///
/// Returns the first transport failure, or [`TransportError::Shape`] when the
/// response is neither an array nor an envelope holding one.
pub fn get_list(transport: &dyn Transport, endpoint: &Endpoint) -> Result<Vec<Value>, TransportError> {
    let key = endpoint.list_key();
    let mut uri = endpoint.to_string();
    let mut items = Vec::new();

    loop {
        let mut envelope = match transport.get(&uri)? {
            Value::Array(list) => {
                items.extend(list);
                return Ok(items);
            }
            Value::Object(obj) => obj,
            other => {
                return Err(TransportError::Shape {
                    uri,
                    detail: format!("expected a list, got {}", type_name(&other)),
                });
            }
        };

        let Some(Value::Array(list)) = key.and_then(|k| envelope.remove(k)) else {
            return Err(TransportError::Shape {
                uri,
                detail: format!("no '{}' list in response", key.unwrap_or("?")),
            });
        };
        items.extend(list);

        match next_page(&envelope) {
            Some(next) if next != uri => uri = next,
            _ => return Ok(items),
        }
    }
}

/// Extract the follow-up request from a `_links.next` value.
fn next_page(envelope: &serde_json::Map<String, Value>) -> Option<String> {
    let next = envelope.get("_links")?.get("next")?.as_str()?;
    let next = next.trim_start_matches('/');
    Some(next.strip_prefix("api/v2/").unwrap_or(next).to_string())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
