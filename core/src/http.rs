//! HTTP transport types and the blocking executor.
//!
//! # Design
//! Requests and responses are plain data. `SupabaseClient` builds
//! `HttpRequest` values and interprets `HttpResponse` values; the actual
//! round-trip goes through the `HttpTransport` trait, so tests can script
//! responses without a network while production uses `UreqTransport`.
//!
//! All fields use owned types (`String`, `Vec`) so values can be recorded and
//! replayed freely by test doubles.

use std::fmt;
use std::time::Duration;

/// Connection-establishment bound for `UreqTransport`.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Whole-call bound for `UreqTransport`, covering send and receive.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

/// An HTTP request described as plain data, headers included.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
///
/// Any status is representable; classifying non-2xx statuses is the
/// client's job, not the transport's.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// The request never completed: connect failure, DNS failure, or timeout.
#[derive(Debug)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// Executes one HTTP round-trip.
///
/// Implementations must hand back non-2xx responses as `Ok` data; only
/// failures to obtain a response at all are `Err`.
pub trait HttpTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking production transport backed by a `ureq::Agent`.
///
/// Status-as-error is disabled so the client sees 4xx/5xx bodies (the
/// schema-fallback logic reads them), and both the connect and the total
/// request duration are bounded.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let result = match request.method {
            HttpMethod::Get => {
                let mut req = self.agent.get(&request.path);
                for (name, value) in &request.headers {
                    req = req.header(name, value);
                }
                req.call()
            }
            HttpMethod::Delete => {
                let mut req = self.agent.delete(&request.path);
                for (name, value) in &request.headers {
                    req = req.header(name, value);
                }
                req.call()
            }
            HttpMethod::Post => {
                let mut req = self.agent.post(&request.path);
                for (name, value) in &request.headers {
                    req = req.header(name, value);
                }
                match &request.body {
                    Some(body) => req.send(body.as_bytes()),
                    None => req.send_empty(),
                }
            }
            HttpMethod::Patch => {
                let mut req = self.agent.patch(&request.path);
                for (name, value) in &request.headers {
                    req = req.header(name, value);
                }
                match &request.body {
                    Some(body) => req.send(body.as_bytes()),
                    None => req.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body,
        })
    }
}
