//! Transport seam: the non-blocking HTTP capability the engine drives.
//!
//! A transport starts requests without blocking, waits (bounded) for any of
//! them to finish, hands back the result of a finished request and aborts
//! requests that are no longer wanted. `CurlTransport` implements it on top of
//! libcurl's multi interface.

mod libcurl;

#[cfg(test)]
pub(crate) mod scripted;

pub use libcurl::{CurlHandle, CurlOptions, CurlTransport, CurlTransportFactory};

use std::time::Duration;

use crate::outcome::{Response, TransportFailure};
use crate::request::RequestSpec;

/// One batch's view of the network.
pub trait Transport {
    /// In-flight request. Dropping it without `result`/`abort` must still
    /// release its resources.
    type Handle;

    /// Starts `spec` without blocking. `token` is reported back by `wait`.
    fn start(&mut self, token: usize, spec: &RequestSpec) -> Result<Self::Handle, TransportFailure>;

    /// Blocks for at most `max_wait` (zero = do not block) and returns the
    /// tokens of requests that finished. May return early with nothing.
    fn wait(&mut self, max_wait: Duration) -> Result<Vec<usize>, TransportFailure>;

    /// Consumes a finished handle and returns its response or failure.
    fn result(&mut self, handle: Self::Handle) -> Result<Response, TransportFailure>;

    /// Cancels a handle and releases its connection.
    fn abort(&mut self, handle: Self::Handle);
}

/// Creates an independent transport for each batch.
pub trait TransportFactory: Send + Sync {
    type Transport: Transport;

    fn create(&self) -> Result<Self::Transport, TransportFailure>;
}
