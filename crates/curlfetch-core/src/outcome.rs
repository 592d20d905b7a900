//! Terminal per-request results.

use std::fmt;
use std::time::Duration;

/// Completed HTTP exchange. Any status code counts, including 4xx/5xx.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// URL as registered (not the redirect target).
    pub url: String,
    pub status: u32,
    /// Headers of the final response, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Time from transfer start to completion.
    pub elapsed: Duration,
}

impl Response {
    /// First header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The handle could not be created or registered.
    Start,
    /// The transport gave up on its own timer (connect timeout, low speed).
    Timeout,
    /// DNS, connect, send or receive failure.
    Connection,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Start => "start",
            FailureKind::Timeout => "timeout",
            FailureKind::Connection => "connection",
            FailureKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Network or protocol failure reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn start(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Start, message)
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportFailure {}

/// Result of one request in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(Response),
    TransportError(TransportFailure),
    /// The batch deadline passed before the request finished (or started).
    TimedOut,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Outcome::Success(r) => Some(r),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&TransportFailure> {
        match self {
            Outcome::TransportError(f) => Some(f),
            _ => None,
        }
    }
}
