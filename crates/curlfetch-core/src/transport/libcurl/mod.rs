//! Curl multi backend: one `Multi` per batch, one Easy2 handle per request.
//!
//! All handles are driven from the calling thread; `wait` is the only place
//! that blocks, through a single bounded `Multi::wait`.

mod classify;
mod handler;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use curl::easy::{Easy2, List};
use curl::multi::{Easy2Handle, Multi};

use crate::outcome::{FailureKind, Response, TransportFailure};
use crate::request::{Method, RequestSpec};

use super::{Transport, TransportFactory};
use classify::failure_from_curl;
use handler::{parse_header_lines, Collector};

/// Settings applied to every Easy2 handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Upper bound on redirects when a request follows them.
    pub max_redirections: u32,
    /// None = `curlfetch/<version> curl/<libcurl version>`.
    pub user_agent: Option<String>,
    /// Receive rate cap in bytes per second.
    pub max_recv_speed: Option<u64>,
    pub buffer_size: Option<usize>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            max_redirections: 10,
            user_agent: None,
            max_recv_speed: None,
            buffer_size: None,
        }
    }
}

/// `Multi::wait` takes whole milliseconds and truncates; a sub-millisecond
/// budget would become a zero-length wait. Round up instead.
fn wait_timeout(max_wait: Duration) -> Duration {
    let millis = max_wait.as_nanos().div_ceil(1_000_000);
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

fn default_user_agent() -> String {
    format!(
        "curlfetch/{} curl/{}",
        env!("CARGO_PKG_VERSION"),
        curl::Version::get().version()
    )
}

/// In-flight curl transfer.
pub struct CurlHandle {
    token: usize,
    url: String,
    started: Instant,
    inner: Easy2Handle<Collector>,
}

/// Transport over one curl multi handle.
pub struct CurlTransport {
    multi: Multi,
    options: CurlOptions,
    user_agent: String,
    /// Transfer results harvested from multi messages, keyed by token,
    /// until `result` or `abort` claims them.
    finished: HashMap<usize, Result<(), curl::Error>>,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        let user_agent = options.user_agent.clone().unwrap_or_else(default_user_agent);
        Self {
            multi: Multi::new(),
            options,
            user_agent,
            finished: HashMap::new(),
        }
    }

    fn configure(&self, easy: &mut Easy2<Collector>, spec: &RequestSpec) -> Result<(), curl::Error> {
        easy.url(&spec.url)?;
        easy.useragent(&self.user_agent)?;
        match spec.options.method {
            Method::Get => easy.get(true)?,
            Method::Head => easy.nobody(true)?,
            other => easy.custom_request(other.as_str())?,
        }
        easy.follow_location(spec.options.follow_redirects)?;
        if spec.options.follow_redirects {
            easy.max_redirections(self.options.max_redirections)?;
        }
        easy.connect_timeout(self.options.connect_timeout)?;
        if let Some(speed) = self.options.max_recv_speed {
            easy.max_recv_speed(speed)?;
        }
        if let Some(sz) = self.options.buffer_size {
            easy.buffer_size(sz)?;
        }
        if !spec.options.headers.is_empty() {
            let mut list = List::new();
            for (k, v) in &spec.options.headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }
        Ok(())
    }

    fn perform(&self) -> Result<u32, TransportFailure> {
        self.multi
            .perform()
            .map_err(|e| TransportFailure::new(FailureKind::Other, format!("curl multi perform: {}", e)))
    }

    /// Drains multi messages into `finished`; returns tokens that completed.
    fn harvest(&mut self) -> Vec<usize> {
        let mut ready = Vec::new();
        let finished = &mut self.finished;
        self.multi.messages(|msg| {
            let token = match msg.token() {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("curl message without token: {}", e);
                    return;
                }
            };
            if let Some(res) = msg.result() {
                finished.insert(token, res);
                ready.push(token);
            }
        });
        ready
    }
}

impl Transport for CurlTransport {
    type Handle = CurlHandle;

    fn start(&mut self, token: usize, spec: &RequestSpec) -> Result<CurlHandle, TransportFailure> {
        let mut easy = Easy2::new(Collector::default());
        self.configure(&mut easy, spec)
            .map_err(|e| TransportFailure::start(format!("curl setup: {}", e)))?;
        let mut inner = self
            .multi
            .add2(easy)
            .map_err(|e| TransportFailure::start(format!("curl multi add: {}", e)))?;
        inner
            .set_token(token)
            .map_err(|e| TransportFailure::start(format!("curl set token: {}", e)))?;
        Ok(CurlHandle {
            token,
            url: spec.url.clone(),
            started: Instant::now(),
            inner,
        })
    }

    fn wait(&mut self, max_wait: Duration) -> Result<Vec<usize>, TransportFailure> {
        self.perform()?;
        let ready = self.harvest();
        if !ready.is_empty() || max_wait.is_zero() {
            return Ok(ready);
        }
        self.multi
            .wait(&mut [], wait_timeout(max_wait))
            .map_err(|e| TransportFailure::new(FailureKind::Other, format!("curl multi wait: {}", e)))?;
        self.perform()?;
        Ok(self.harvest())
    }

    fn result(&mut self, handle: CurlHandle) -> Result<Response, TransportFailure> {
        let CurlHandle {
            token,
            url,
            started,
            inner,
        } = handle;
        let transfer = self.finished.remove(&token);
        let mut easy = self
            .multi
            .remove2(inner)
            .map_err(|e| TransportFailure::new(FailureKind::Other, format!("curl multi remove: {}", e)))?;
        match transfer {
            Some(Ok(())) => {}
            Some(Err(e)) => return Err(failure_from_curl(&e)),
            None => {
                return Err(TransportFailure::new(
                    FailureKind::Other,
                    "transfer reported before it finished",
                ))
            }
        }
        let status = easy.response_code().map_err(|e| failure_from_curl(&e))?;
        let collector = easy.get_mut();
        Ok(Response {
            url,
            status,
            headers: parse_header_lines(&collector.header_lines),
            body: std::mem::take(&mut collector.body),
            elapsed: started.elapsed(),
        })
    }

    fn abort(&mut self, handle: CurlHandle) {
        self.finished.remove(&handle.token);
        if let Err(e) = self.multi.remove2(handle.inner) {
            tracing::warn!(token = handle.token, "curl multi remove on abort: {}", e);
        }
    }
}

/// Builds a fresh `CurlTransport` (own multi handle) for every batch.
#[derive(Debug, Clone, Default)]
pub struct CurlTransportFactory {
    options: CurlOptions,
}

impl CurlTransportFactory {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }
}

impl TransportFactory for CurlTransportFactory {
    type Transport = CurlTransport;

    fn create(&self) -> Result<CurlTransport, TransportFailure> {
        Ok(CurlTransport::new(self.options.clone()))
    }
}
