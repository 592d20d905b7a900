//! Caller-facing error types.
//!
//! Only structural misuse and internal invariant violations are errors.
//! Per-request failures (transport errors, timeouts) are `Outcome`s instead.

use thiserror::Error;

use crate::request::SequenceNumber;

/// Rejected registration: the request never reaches the network and no
/// sequence number is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    #[error("empty URL")]
    EmptyUrl,
    #[error("unparsable URL {url:?}: {reason}")]
    Unparsable { url: String, reason: String },
    #[error("unsupported URL scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),
    #[error("URL {0:?} has no host")]
    MissingHost(String),
    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),
    #[error("invalid value for header {0:?}")]
    InvalidHeaderValue(String),
}

/// Errors returned by `Downloader::add_request` and `Downloader::fetch`.
#[derive(Debug, Error)]
pub enum DownloaderError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequest),

    /// `fetch` was called while another fetch on the same downloader was running.
    #[error("a batch is already running on this downloader")]
    BatchAlreadyRunning,

    /// Two outcomes were recorded for one request. Driver bug.
    #[error("duplicate outcome recorded for request {0}")]
    DuplicateOutcome(SequenceNumber),

    /// A request finished the batch without any outcome. Driver bug.
    #[error("no outcome recorded for request {0}")]
    MissingOutcome(SequenceNumber),
}
