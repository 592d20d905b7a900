//! Batch HTTP downloader: register requests, then fetch them all concurrently
//! on one curl multi handle under a single deadline.

pub mod config;
pub mod logging;

pub mod aggregator;
pub mod driver;
pub mod error;
pub mod multiplexer;
pub mod outcome;
pub mod request;
pub mod transport;

pub use config::FetchConfig;
pub use driver::{BatchState, Downloader};
pub use error::{DownloaderError, InvalidRequest};
pub use outcome::{FailureKind, Outcome, Response, TransportFailure};
pub use request::{Method, RequestOptions, RequestSpec, SequenceNumber};
pub use transport::{CurlOptions, CurlTransport, CurlTransportFactory, Transport, TransportFactory};
