//! Error types for the backend client.
//!
//! # Design
//! `Request` carries the numeric status and the full raw response body because
//! the fallback logic in `client` sniffs the body text for the backend's
//! missing-column phrasing. Schema mismatch is therefore a *predicate* on
//! `Request` (`is_schema_mismatch` / `is_missing_column`), not a separate
//! variant — on the wire it is just another non-2xx response.

use std::fmt;

/// Errors returned by `SupabaseClient` operations.
#[derive(Debug)]
pub enum ApiError {
    /// The request never produced an HTTP response: connect failure, DNS
    /// failure, or a timeout expiring mid-flight.
    Transport(String),

    /// The server answered with a non-2xx status. The body is kept verbatim.
    Request { status: u16, body: String },

    /// A required field was absent from a response body.
    Parse(String),

    /// Caller-supplied input was empty or malformed; detected before any
    /// network call.
    Validation(String),
}

impl ApiError {
    /// True when this is a non-2xx response whose body matches the backend's
    /// "could not find the '<column>' column" phrasing — the only failure the
    /// fallback chains recover from.
    pub fn is_schema_mismatch(&self) -> bool {
        match self {
            ApiError::Request { body, .. } => {
                body.contains("Could not find the '") && body.contains("' column")
            }
            _ => false,
        }
    }

    /// True when this is a non-2xx response complaining specifically about
    /// `column` being absent from the remote table.
    pub fn is_missing_column(&self, column: &str) -> bool {
        match self {
            ApiError::Request { body, .. } => {
                body.contains(&format!("Could not find the '{column}' column"))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(msg) => write!(f, "transport error: {msg}"),
            ApiError::Request { status, body } => {
                write!(f, "request failed ({status}): {body}")
            }
            ApiError::Parse(msg) => write!(f, "parse error: {msg}"),
            ApiError::Validation(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}
