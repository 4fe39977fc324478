//! Collecting outcomes back into input order.

use crate::types::{
    BatchReport, DomainTarget, FailureDetail, FailureKind, LookupOutcome, LookupStatus,
    ReportSummary,
};
use std::time::Duration;
use tracing::warn;

/// Reassembles outcomes that arrive in completion order.
///
/// Each submitted target owns one slot, addressed by its input position. The
/// batch is complete once every slot is filled.
#[derive(Debug)]
pub struct ResultAggregator {
    targets: Vec<DomainTarget>,
    slots: Vec<Option<LookupOutcome>>,
    received: usize,
}

impl ResultAggregator {
    pub fn new(targets: Vec<DomainTarget>) -> Self {
        let slots = vec![None; targets.len()];
        Self {
            targets,
            slots,
            received: 0,
        }
    }

    /// Number of targets in the batch.
    pub fn total(&self) -> usize {
        self.targets.len()
    }

    /// Number of outcomes recorded so far.
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_complete(&self) -> bool {
        self.received == self.targets.len()
    }

    /// The outcome recorded for an input position, if any.
    pub fn get(&self, index: usize) -> Option<&LookupOutcome> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Record the outcome for the target at `index`.
    ///
    /// Returns `false` and ignores the outcome if the index is out of range,
    /// already filled, or belongs to a different domain.
    pub fn record(&mut self, index: usize, outcome: LookupOutcome) -> bool {
        let Some(expected) = self.targets.get(index) else {
            warn!(index, domain = %outcome.domain, "outcome for unknown batch position");
            return false;
        };
        if *expected != outcome.domain {
            warn!(
                index,
                expected = %expected,
                got = %outcome.domain,
                "outcome does not match its batch position"
            );
            return false;
        }
        if self.slots[index].is_some() {
            warn!(index, domain = %outcome.domain, "ignoring duplicate outcome");
            return false;
        }

        self.slots[index] = Some(outcome);
        self.received += 1;
        true
    }

    /// Mark every target still missing an outcome as failed.
    ///
    /// Used when the workers stopped without reporting everything, so the
    /// final report still accounts for the whole batch.
    pub fn fail_remaining(&mut self, message: &str) {
        for (slot, target) in self.slots.iter_mut().zip(&self.targets) {
            if slot.is_none() {
                *slot = Some(LookupOutcome::new(
                    target.clone(),
                    LookupStatus::Failed(FailureDetail::new(
                        FailureKind::ResolutionError,
                        message,
                    )),
                    Duration::ZERO,
                ));
                self.received += 1;
            }
        }
    }

    /// Build the final report.
    ///
    /// Outcomes appear in input order. Targets without an outcome are listed
    /// in [`BatchReport::unfinished`] and the report is marked incomplete.
    pub fn finish(self, elapsed: Duration) -> BatchReport {
        let mut outcomes = Vec::with_capacity(self.received);
        let mut unfinished = Vec::new();

        for (slot, target) in self.slots.into_iter().zip(self.targets) {
            match slot {
                Some(outcome) => outcomes.push(outcome),
                None => unfinished.push(target),
            }
        }

        BatchReport {
            summary: ReportSummary::from_outcomes(&outcomes),
            complete: unfinished.is_empty(),
            elapsed_ms: elapsed.as_millis() as u64,
            outcomes,
            unfinished,
        }
    }
}
