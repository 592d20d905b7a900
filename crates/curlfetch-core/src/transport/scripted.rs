//! Test transport: each URL resolves after a scripted delay, fails, hangs or
//! refuses to start. Counts calls so tests can check handle accounting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::outcome::{FailureKind, Response, TransportFailure};
use crate::request::RequestSpec;

use super::{Transport, TransportFactory};

#[derive(Debug, Clone)]
pub(crate) enum Script {
    Respond { after: Duration, status: u32, body: &'static str },
    Fail { after: Duration, message: &'static str },
    Never,
    RefuseStart,
}

impl Script {
    pub(crate) fn ok_after(ms: u64) -> Self {
        Script::Respond {
            after: Duration::from_millis(ms),
            status: 200,
            body: "ok",
        }
    }
}

/// Call counters shared between the factory, its transports and the test.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    pub(crate) transports: AtomicUsize,
    pub(crate) starts: AtomicUsize,
    pub(crate) completes: AtomicUsize,
    pub(crate) aborts: AtomicUsize,
    pub(crate) waits: AtomicUsize,
    /// Highest number of simultaneously open handles.
    pub(crate) peak_open: AtomicUsize,
    open: AtomicUsize,
}

impl Ledger {
    pub(crate) fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub(crate) fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn opened(&self) {
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_open.fetch_max(now, Ordering::SeqCst);
    }

    fn closed(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedFactory {
    scripts: HashMap<String, Script>,
    pub(crate) ledger: Arc<Ledger>,
    refuse_create: bool,
}

impl ScriptedFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers the behavior of `url` (normalized the same way as the queue).
    pub(crate) fn script(mut self, url: &str, script: Script) -> Self {
        let key = url::Url::parse(url).map(String::from).unwrap_or_else(|_| url.to_string());
        self.scripts.insert(key, script);
        self
    }

    pub(crate) fn refusing(mut self) -> Self {
        self.refuse_create = true;
        self
    }
}

impl TransportFactory for ScriptedFactory {
    type Transport = ScriptedTransport;

    fn create(&self) -> Result<ScriptedTransport, TransportFailure> {
        if self.refuse_create {
            return Err(TransportFailure::start("no transport available"));
        }
        self.ledger.transports.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedTransport {
            scripts: self.scripts.clone(),
            ledger: Arc::clone(&self.ledger),
            live: HashMap::new(),
        })
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedHandle {
    token: usize,
}

struct Live {
    url: String,
    started: Instant,
    script: Script,
    reported: bool,
}

impl Live {
    fn due(&self) -> Option<Instant> {
        match self.script {
            Script::Respond { after, .. } | Script::Fail { after, .. } => Some(self.started + after),
            Script::Never | Script::RefuseStart => None,
        }
    }
}

pub(crate) struct ScriptedTransport {
    scripts: HashMap<String, Script>,
    ledger: Arc<Ledger>,
    live: HashMap<usize, Live>,
}

impl ScriptedTransport {
    fn ready_now(&mut self) -> Vec<usize> {
        let now = Instant::now();
        let mut ready: Vec<(Instant, usize)> = self
            .live
            .iter()
            .filter(|(_, l)| !l.reported)
            .filter_map(|(t, l)| l.due().filter(|d| *d <= now).map(|d| (d, *t)))
            .collect();
        ready.sort();
        for (_, t) in &ready {
            if let Some(l) = self.live.get_mut(t) {
                l.reported = true;
            }
        }
        ready.into_iter().map(|(_, t)| t).collect()
    }
}

impl Transport for ScriptedTransport {
    type Handle = ScriptedHandle;

    fn start(&mut self, token: usize, spec: &RequestSpec) -> Result<ScriptedHandle, TransportFailure> {
        let script = self.scripts.get(&spec.url).cloned().unwrap_or(Script::Never);
        if let Script::RefuseStart = script {
            return Err(TransportFailure::start("handle limit reached"));
        }
        self.ledger.starts.fetch_add(1, Ordering::SeqCst);
        self.ledger.opened();
        self.live.insert(
            token,
            Live {
                url: spec.url.clone(),
                started: Instant::now(),
                script,
                reported: false,
            },
        );
        Ok(ScriptedHandle { token })
    }

    fn wait(&mut self, max_wait: Duration) -> Result<Vec<usize>, TransportFailure> {
        self.ledger.waits.fetch_add(1, Ordering::SeqCst);
        let ready = self.ready_now();
        if !ready.is_empty() || max_wait.is_zero() {
            return Ok(ready);
        }
        let now = Instant::now();
        let next_due = self
            .live
            .values()
            .filter(|l| !l.reported)
            .filter_map(Live::due)
            .min();
        let sleep_for = next_due
            .map(|d| d.saturating_duration_since(now).min(max_wait))
            .unwrap_or(max_wait);
        std::thread::sleep(sleep_for);
        Ok(self.ready_now())
    }

    fn result(&mut self, handle: ScriptedHandle) -> Result<Response, TransportFailure> {
        let live = self
            .live
            .remove(&handle.token)
            .ok_or_else(|| TransportFailure::new(FailureKind::Other, "unknown handle"))?;
        self.ledger.completes.fetch_add(1, Ordering::SeqCst);
        self.ledger.closed();
        match live.script {
            Script::Respond { status, body, .. } => Ok(Response {
                url: live.url,
                status,
                headers: vec![("Content-Length".to_string(), body.len().to_string())],
                body: body.as_bytes().to_vec(),
                elapsed: live.started.elapsed(),
            }),
            Script::Fail { message, .. } => Err(TransportFailure::new(FailureKind::Connection, message)),
            Script::Never | Script::RefuseStart => {
                Err(TransportFailure::new(FailureKind::Other, "not finished"))
            }
        }
    }

    fn abort(&mut self, handle: ScriptedHandle) {
        if self.live.remove(&handle.token).is_some() {
            self.ledger.aborts.fetch_add(1, Ordering::SeqCst);
            self.ledger.closed();
        }
    }
}
