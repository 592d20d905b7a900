//! Batch driver: the caller-facing downloader.
//!
//! Requests are registered with `add_request` and executed together by
//! `fetch`, which runs every transfer concurrently on one curl multi handle
//! under a single deadline and returns one `Outcome` per request, in
//! registration order. Requests registered while a fetch runs, or after it
//! returns, belong to the next batch.

mod batch;
mod guard;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::FetchConfig;
use crate::error::DownloaderError;
use crate::outcome::Outcome;
use crate::request::{RequestOptions, RequestQueue, SequenceNumber};
use crate::transport::{CurlTransportFactory, TransportFactory};

use batch::Batch;
use guard::RunningGuard;

/// Upper bound used when `now + timeout` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Lifecycle of a downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Accepting registrations; no fetch has run since the last one finished.
    Filling,
    /// A fetch is in progress.
    Running,
    /// The last fetch returned; results were handed to its caller.
    Done,
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Collects requests, then downloads them all at once under one time budget.
///
/// ```no_run
/// use curlfetch_core::Downloader;
///
/// let downloader: Downloader = Downloader::default();
/// downloader.add_request("http://example.com/")?;
/// let outcomes = downloader.fetch_ms(5000)?;
/// println!("{:?}", outcomes);
/// # Ok::<(), curlfetch_core::DownloaderError>(())
/// ```
pub struct Downloader<F: TransportFactory = CurlTransportFactory> {
    factory: F,
    max_concurrent: Option<usize>,
    queue: Mutex<RequestQueue>,
    state: Mutex<BatchState>,
}

impl Downloader<CurlTransportFactory> {
    /// Curl-backed downloader configured from `config`.
    pub fn new(config: &FetchConfig) -> Self {
        Self::with_factory(
            CurlTransportFactory::new(config.curl_options()),
            config.max_concurrent,
        )
    }
}

impl Default for Downloader<CurlTransportFactory> {
    fn default() -> Self {
        Self::new(&FetchConfig::default())
    }
}

impl<F: TransportFactory> Downloader<F> {
    pub fn with_factory(factory: F, max_concurrent: Option<usize>) -> Self {
        Self {
            factory,
            max_concurrent,
            queue: Mutex::new(RequestQueue::new()),
            state: Mutex::new(BatchState::Filling),
        }
    }

    /// Registers a GET request for the next fetch.
    pub fn add_request(&self, url: &str) -> Result<SequenceNumber, DownloaderError> {
        self.add_request_with(url, RequestOptions::default())
    }

    /// Registers a request with explicit options. Nothing is sent until `fetch`.
    pub fn add_request_with(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<SequenceNumber, DownloaderError> {
        // Queue before state; a fetch takes them one at a time, never nested.
        let mut queue = lock(&self.queue);
        let seq = queue.enqueue(url, options)?;
        let mut state = lock(&self.state);
        if *state == BatchState::Done {
            *state = BatchState::Filling;
        }
        tracing::debug!(seq, url, "request registered");
        Ok(seq)
    }

    /// Requests waiting for the next fetch.
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn state(&self) -> BatchState {
        *lock(&self.state)
    }

    /// Runs every registered request and returns once all finished or
    /// `timeout` elapsed. Unfinished requests come back as `Outcome::TimedOut`.
    ///
    /// Fails only with `BatchAlreadyRunning` (another fetch is in progress on
    /// this downloader) or on an internal invariant violation.
    pub fn fetch(&self, timeout: Duration) -> Result<Vec<Outcome>, DownloaderError> {
        let _running = RunningGuard::enter(&self.state)?;
        let start = Instant::now();
        let deadline = start
            .checked_add(timeout)
            .unwrap_or_else(|| start + FAR_FUTURE);
        let queue = std::mem::take(&mut *lock(&self.queue));
        Batch::new(queue, deadline, self.max_concurrent).run(&self.factory)
    }

    /// `fetch` with the budget in milliseconds.
    pub fn fetch_ms(&self, timeout_ms: u64) -> Result<Vec<Outcome>, DownloaderError> {
        self.fetch(Duration::from_millis(timeout_ms))
    }
}
