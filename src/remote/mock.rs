//! In-memory transport for tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use serde_json::Value;

use super::{Transport, TransportError};

/// Canned responses keyed by exact URI, plus a log of every call made.
///
/// Unknown URIs answer with a 404 status error.
#[derive(Default)]
pub(crate) struct MockTransport {
    gets: HashMap<String, Value>,
    sequences: RefCell<HashMap<String, VecDeque<Value>>>,
    posts: HashMap<String, Value>,
    failures: HashMap<String, u16>,
    calls: RefCell<Vec<String>>,
    bodies: RefCell<Vec<(String, Option<Value>)>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_get(mut self, uri: &str, response: Value) -> Self {
        self.gets.insert(uri.to_string(), response);
        self
    }

    /// Answer successive GETs of `uri` with `responses` in turn. Once only
    /// one is left it keeps being returned.
    pub(crate) fn on_get_sequence(self, uri: &str, responses: Vec<Value>) -> Self {
        self.sequences
            .borrow_mut()
            .insert(uri.to_string(), responses.into());
        self
    }

    pub(crate) fn on_post(mut self, uri: &str, response: Value) -> Self {
        self.posts.insert(uri.to_string(), response);
        self
    }

    /// Make any call to `uri` fail with the given status.
    pub(crate) fn fail(mut self, uri: &str, status: u16) -> Self {
        self.failures.insert(uri.to_string(), status);
        self
    }

    /// Calls made so far, as `GET <uri>` / `POST <uri>`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub(crate) fn called(&self, call: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == call)
    }

    /// Body of the last POST to `uri`.
    pub(crate) fn posted(&self, uri: &str) -> Option<Value> {
        self.bodies
            .borrow()
            .iter()
            .rev()
            .find(|(u, _)| u == uri)
            .and_then(|(_, body)| body.clone())
    }

    fn answer(&self, uri: &str, table: &HashMap<String, Value>) -> Result<Value, TransportError> {
        if let Some(status) = self.failures.get(uri) {
            return Err(TransportError::status(
                *status,
                &format!(r#"{{"error": "mock failure for {uri}"}}"#),
            ));
        }
        table
            .get(uri)
            .cloned()
            .ok_or_else(|| TransportError::status(404, &format!("no mock response for {uri}")))
    }
}

impl Transport for MockTransport {
    fn get(&self, uri: &str) -> Result<Value, TransportError> {
        self.calls.borrow_mut().push(format!("GET {uri}"));
        if let Some(queue) = self.sequences.borrow_mut().get_mut(uri) {
            let next = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
            if let Some(response) = next {
                return Ok(response);
            }
        }
        self.answer(uri, &self.gets)
    }

    fn post(&self, uri: &str, body: Option<&Value>) -> Result<Value, TransportError> {
        self.calls.borrow_mut().push(format!("POST {uri}"));
        self.bodies
            .borrow_mut()
            .push((uri.to_string(), body.cloned()));
        self.answer(uri, &self.posts)
    }
}

/// Lets a test keep a handle on the mock after handing it to a session.
impl Transport for Rc<MockTransport> {
    fn get(&self, uri: &str) -> Result<Value, TransportError> {
        self.as_ref().get(uri)
    }

    fn post(&self, uri: &str, body: Option<&Value>) -> Result<Value, TransportError> {
        self.as_ref().post(uri, body)
    }
}
