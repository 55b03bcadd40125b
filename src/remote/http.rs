//! HTTP transport for the TestRail API v2.
//!
//! Uses reqwest with basic credentials attached at construction. Calls are
//! driven to completion on a private current-thread tokio runtime, so the
//! transport presents a blocking interface to the connector.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::trace;

use super::{Transport, TransportError};

/// Blocking TestRail client.
pub struct HttpTransport {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    base: String,
    user: String,
    password: String,
}

impl HttpTransport {
    /// Create a transport for the TestRail instance at `url`.
    ///
    /// A bare host (`example.testrail.io`) is given an `https://` scheme.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the runtime cannot be built.
    pub fn new(
        url: &str,
        user: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            client,
            runtime,
            base: api_base(url),
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    fn api_url(&self, uri: &str) -> String {
        format!("{}{uri}", self.base)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, TransportError> {
        let response = request
            .basic_auth(&self.user, Some(&self.password))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::status(status.as_u16(), &text));
        }

        // Deletes answer with an empty body
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl Transport for HttpTransport {
    fn get(&self, uri: &str) -> Result<Value, TransportError> {
        trace!(uri, "GET");
        let request = self.client.get(self.api_url(uri));
        self.runtime.block_on(self.send(request))
    }

    fn post(&self, uri: &str, body: Option<&Value>) -> Result<Value, TransportError> {
        trace!(uri, "POST");
        let mut request = self.client.post(self.api_url(uri));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.runtime.block_on(self.send(request))
    }
}

/// Normalize a configured server address into its web root
/// (`https://acme.testrail.io`), with a scheme and no trailing slash.
pub fn server_root(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_suffix("/index.php?/api/v2").unwrap_or(url);
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// The API v2 prefix under a configured server address.
fn api_base(url: &str) -> String {
    format!("{}/index.php?/api/v2/", server_root(url))
}
