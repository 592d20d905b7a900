//! Request registration: validated specs waiting for the next fetch.
//!
//! Enqueueing is pure bookkeeping. No network activity happens until a batch
//! promotes a spec into the multiplexer.

mod options;

pub use options::{Method, RequestOptions};

use std::collections::VecDeque;

use crate::error::InvalidRequest;

/// Identity of a request within its batch: assigned at enqueue, starting at 0.
/// Also the index of its outcome in the list returned by `fetch`.
pub type SequenceNumber = usize;

/// One registered request. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub seq: SequenceNumber,
    pub url: String,
    pub options: RequestOptions,
}

/// FIFO of specs not yet started. Queue order is enqueue order.
#[derive(Debug, Default)]
pub struct RequestQueue {
    next_seq: SequenceNumber,
    pending: VecDeque<RequestSpec>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a request. On error no sequence number is consumed.
    pub fn enqueue(
        &mut self,
        url: &str,
        options: RequestOptions,
    ) -> Result<SequenceNumber, InvalidRequest> {
        let url = validate_url(url)?;
        options.validate()?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push_back(RequestSpec { seq, url, options });
        Ok(seq)
    }

    /// Removes up to `n` specs in FIFO order.
    pub fn drain_next(&mut self, n: usize) -> Vec<RequestSpec> {
        let take = n.min(self.pending.len());
        self.pending.drain(..take).collect()
    }

    pub fn drain_all(&mut self) -> Vec<RequestSpec> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of sequence numbers handed out so far (the batch size).
    pub fn registered(&self) -> usize {
        self.next_seq
    }
}

/// Accepts absolute http(s) URLs with a host; returns the normalized form.
fn validate_url(raw: &str) -> Result<String, InvalidRequest> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvalidRequest::EmptyUrl);
    }
    let parsed = url::Url::parse(trimmed).map_err(|e| InvalidRequest::Unparsable {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(InvalidRequest::UnsupportedScheme(other.to_string())),
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(InvalidRequest::MissingHost(raw.to_string()));
    }
    Ok(parsed.into())
}
