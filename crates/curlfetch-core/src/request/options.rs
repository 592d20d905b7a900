//! Per-request options and their validation.

use std::fmt;

use crate::error::InvalidRequest;

/// HTTP method for a request. GET unless overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let m = match s.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "PATCH" => Method::Patch,
            "OPTIONS" => Method::Options,
            _ => return Err(format!("unsupported method {:?}", s)),
        };
        Ok(m)
    }
}

/// Options recognized for a single request. Validated once, at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: Method,
    /// Extra request headers, sent in order.
    pub headers: Vec<(String, String)>,
    /// Follow `Location` redirects (bounded by the configured maximum).
    pub follow_redirects: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::Get,
            headers: Vec::new(),
            follow_redirects: true,
        }
    }
}

impl RequestOptions {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Parses a `Name: value` header line (as given on a command line).
    pub fn parse_header_line(line: &str) -> Result<(String, String), InvalidRequest> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| InvalidRequest::InvalidHeaderName(line.to_string()))?;
        Ok((name.trim().to_string(), value.trim().to_string()))
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidRequest> {
        for (name, value) in &self.headers {
            if !is_token(name.trim()) {
                return Err(InvalidRequest::InvalidHeaderName(name.clone()));
            }
            if value.contains(&['\r', '\n', '\0'][..]) {
                return Err(InvalidRequest::InvalidHeaderValue(name.clone()));
            }
        }
        Ok(())
    }
}

/// RFC 7230 token: visible ASCII without separators.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}
