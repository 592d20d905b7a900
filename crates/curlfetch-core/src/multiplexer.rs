//! Transfer multiplexer: the active set of one batch.
//!
//! Starts transfers on the batch's transport, waits once per `poll` (bounded by
//! the time left until the deadline) and turns finished transfers into
//! outcomes. Completion order is whatever the transport reports; ordering is
//! restored by the aggregator.

use std::collections::HashMap;
use std::time::Instant;

use crate::outcome::{Outcome, TransportFailure};
use crate::request::{RequestSpec, SequenceNumber};
use crate::transport::Transport;

/// One started request, owned by the multiplexer until it finishes or is cancelled.
pub struct ActiveTransfer<H> {
    pub seq: SequenceNumber,
    pub url: String,
    pub started: Instant,
    handle: H,
}

pub struct Multiplexer<T: Transport> {
    transport: T,
    active: HashMap<SequenceNumber, ActiveTransfer<T::Handle>>,
}

impl<T: Transport> Multiplexer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            active: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Starts a non-blocking transfer for `spec`. On failure nothing is added
    /// to the active set; the caller records the failure as the spec's outcome.
    pub fn activate(&mut self, spec: &RequestSpec) -> Result<(), TransportFailure> {
        let handle = self.transport.start(spec.seq, spec)?;
        tracing::debug!(seq = spec.seq, url = %spec.url, "transfer started");
        self.active.insert(
            spec.seq,
            ActiveTransfer {
                seq: spec.seq,
                url: spec.url.clone(),
                started: Instant::now(),
                handle,
            },
        );
        Ok(())
    }

    /// Waits once, for at most the time left until `deadline` (not at all if it
    /// has passed), and returns the transfers that finished, in transport order.
    pub fn poll(&mut self, deadline: Instant) -> Vec<(SequenceNumber, Outcome)> {
        let max_wait = deadline.saturating_duration_since(Instant::now());
        let ready = match self.transport.wait(max_wait) {
            Ok(ready) => ready,
            Err(failure) => return self.fail_all(failure),
        };
        let mut completed = Vec::with_capacity(ready.len());
        for token in ready {
            let Some(transfer) = self.active.remove(&token) else {
                tracing::warn!(token, "completion for unknown transfer ignored");
                continue;
            };
            let outcome = match self.transport.result(transfer.handle) {
                Ok(response) => {
                    tracing::debug!(
                        seq = transfer.seq,
                        status = response.status,
                        bytes = response.body.len(),
                        elapsed_ms = transfer.started.elapsed().as_millis() as u64,
                        "transfer finished"
                    );
                    Outcome::Success(response)
                }
                Err(failure) => {
                    tracing::debug!(seq = transfer.seq, url = %transfer.url, "transfer failed: {}", failure);
                    Outcome::TransportError(failure)
                }
            };
            completed.push((transfer.seq, outcome));
        }
        completed
    }

    /// Aborts every remaining transfer and returns their sequence numbers, ascending.
    pub fn cancel_all(&mut self) -> Vec<SequenceNumber> {
        let mut cancelled: Vec<SequenceNumber> = Vec::with_capacity(self.active.len());
        for (seq, transfer) in self.active.drain() {
            self.transport.abort(transfer.handle);
            cancelled.push(seq);
        }
        cancelled.sort_unstable();
        if !cancelled.is_empty() {
            tracing::debug!(count = cancelled.len(), "cancelled active transfers");
        }
        cancelled
    }

    /// The transport's wait failed: release every handle and fail them all with its cause.
    fn fail_all(&mut self, failure: TransportFailure) -> Vec<(SequenceNumber, Outcome)> {
        tracing::warn!(active = self.active.len(), "transport wait failed: {}", failure);
        self.cancel_all()
            .into_iter()
            .map(|seq| (seq, Outcome::TransportError(failure.clone())))
            .collect()
    }
}

impl<T: Transport> Drop for Multiplexer<T> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
