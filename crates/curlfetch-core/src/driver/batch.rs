//! One fetch call: promote, poll, record until done or out of time.

use std::time::Instant;

use crate::aggregator::ResultAggregator;
use crate::error::DownloaderError;
use crate::multiplexer::Multiplexer;
use crate::outcome::Outcome;
use crate::request::RequestQueue;
use crate::transport::{Transport, TransportFactory};

/// Requests of one fetch plus its fixed deadline and concurrency ceiling.
pub(super) struct Batch {
    queue: RequestQueue,
    deadline: Instant,
    max_concurrent: usize,
    aggregator: ResultAggregator,
}

impl Batch {
    /// `max_concurrent` of None means every request may be active at once.
    pub(super) fn new(queue: RequestQueue, deadline: Instant, max_concurrent: Option<usize>) -> Self {
        let expected = queue.registered();
        Self {
            queue,
            deadline,
            max_concurrent: max_concurrent.unwrap_or(expected).max(1),
            aggregator: ResultAggregator::new(expected),
        }
    }

    pub(super) fn run<F: TransportFactory>(mut self, factory: &F) -> Result<Vec<Outcome>, DownloaderError> {
        let started = Instant::now();
        let total = self.queue.len();
        if total == 0 {
            return self.aggregator.finalize();
        }
        tracing::debug!(
            requests = total,
            max_concurrent = self.max_concurrent,
            budget_ms = self.deadline.saturating_duration_since(started).as_millis() as u64,
            "batch started"
        );

        let transport = match factory.create() {
            Ok(t) => t,
            Err(failure) => {
                tracing::warn!("transport unavailable, failing {} requests: {}", total, failure);
                for spec in self.queue.drain_all() {
                    self.aggregator
                        .record(spec.seq, Outcome::TransportError(failure.clone()))?;
                }
                return self.aggregator.finalize();
            }
        };
        let mut mux = Multiplexer::new(transport);

        loop {
            self.promote(&mut mux)?;
            if mux.is_empty() {
                if self.queue.is_empty() {
                    break;
                }
                // Every promoted spec failed to start; its slot is free again.
                continue;
            }
            for (seq, outcome) in mux.poll(self.deadline) {
                self.aggregator.record(seq, outcome)?;
            }
            if Instant::now() >= self.deadline {
                break;
            }
        }

        let cancelled = mux.cancel_all();
        let never_started = self.queue.drain_all();
        if !cancelled.is_empty() || !never_started.is_empty() {
            tracing::debug!(
                in_flight = cancelled.len(),
                queued = never_started.len(),
                "deadline reached with work remaining"
            );
        }
        for seq in cancelled {
            self.aggregator.record(seq, Outcome::TimedOut)?;
        }
        for spec in never_started {
            self.aggregator.record(spec.seq, Outcome::TimedOut)?;
        }

        let outcomes = self.aggregator.finalize()?;
        log_summary(&outcomes, started);
        Ok(outcomes)
    }

    /// Moves queued specs into the active set until the ceiling is reached.
    /// Start failures are recorded immediately and do not hold a slot.
    fn promote<T: Transport>(&mut self, mux: &mut Multiplexer<T>) -> Result<(), DownloaderError> {
        let room = self.max_concurrent.saturating_sub(mux.len());
        for spec in self.queue.drain_next(room) {
            if let Err(failure) = mux.activate(&spec) {
                tracing::warn!(seq = spec.seq, url = %spec.url, "transfer could not start: {}", failure);
                self.aggregator
                    .record(spec.seq, Outcome::TransportError(failure))?;
            }
        }
        Ok(())
    }
}

fn log_summary(outcomes: &[Outcome], started: Instant) {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let timed_out = outcomes.iter().filter(|o| o.is_timed_out()).count();
    let failed = outcomes.len() - succeeded - timed_out;
    tracing::info!(
        requests = outcomes.len(),
        succeeded,
        failed,
        timed_out,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch finished"
    );
}
