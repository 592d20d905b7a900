//! Result aggregation: one outcome per request, returned in submission order.

use std::collections::BTreeMap;

use crate::error::DownloaderError;
use crate::outcome::Outcome;
use crate::request::SequenceNumber;

/// Collects outcomes as they complete (in any order) for one batch.
#[derive(Debug)]
pub struct ResultAggregator {
    expected: usize,
    outcomes: BTreeMap<SequenceNumber, Outcome>,
}

impl ResultAggregator {
    /// `expected` is the number of requests in the batch (sequence numbers `0..expected`).
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            outcomes: BTreeMap::new(),
        }
    }

    /// Records the outcome of `seq`. A second outcome for the same request is a
    /// driver bug and is rejected without touching the first.
    pub fn record(&mut self, seq: SequenceNumber, outcome: Outcome) -> Result<(), DownloaderError> {
        if self.outcomes.contains_key(&seq) {
            tracing::error!(seq, "duplicate outcome recorded");
            return Err(DownloaderError::DuplicateOutcome(seq));
        }
        self.outcomes.insert(seq, outcome);
        Ok(())
    }

    /// Outcomes ordered by sequence number. Every request of the batch must
    /// have exactly one.
    pub fn finalize(self) -> Result<Vec<Outcome>, DownloaderError> {
        if let Some(missing) = (0..self.expected).find(|s| !self.outcomes.contains_key(s)) {
            tracing::error!(seq = missing, "request finished the batch without an outcome");
            return Err(DownloaderError::MissingOutcome(missing));
        }
        Ok(self.outcomes.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{FailureKind, TransportFailure};

    #[test]
    fn finalize_restores_submission_order() {
        let mut agg = ResultAggregator::new(3);
        agg.record(2, Outcome::TimedOut).unwrap();
        agg.record(
            0,
            Outcome::TransportError(TransportFailure::new(FailureKind::Connection, "refused")),
        )
        .unwrap();
        agg.record(1, Outcome::TimedOut).unwrap();
        let out = agg.finalize().unwrap();
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], Outcome::TransportError(_)));
        assert!(out[1].is_timed_out());
        assert!(out[2].is_timed_out());
    }

    #[test]
    fn duplicate_record_is_rejected_and_first_kept() {
        let mut agg = ResultAggregator::new(1);
        agg.record(0, Outcome::TimedOut).unwrap();
        let err = agg
            .record(0, Outcome::TransportError(TransportFailure::start("x")))
            .unwrap_err();
        assert!(matches!(err, DownloaderError::DuplicateOutcome(0)));
        assert_eq!(agg.finalize().unwrap(), vec![Outcome::TimedOut]);
    }

    #[test]
    fn missing_outcome_is_reported() {
        let mut agg = ResultAggregator::new(2);
        agg.record(1, Outcome::TimedOut).unwrap();
        assert!(matches!(agg.finalize(), Err(DownloaderError::MissingOutcome(0))));
    }

    #[test]
    fn empty_batch_finalizes_empty() {
        assert!(ResultAggregator::new(0).finalize().unwrap().is_empty());
    }
}
