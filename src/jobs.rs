//! Shared plumbing for the periodic polling and evaluation passes.

use std::time::Duration;

use tokio::time::{self, Interval, MissedTickBehavior};

/// Per-pass tally. A failing device never aborts the rest of the pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl PassSummary {
    pub(crate) fn record<T, E>(&mut self, outcome: &Result<T, E>) {
        match outcome {
            Ok(_) => self.succeeded += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Interval that skips ticks missed while a slow pass was running, so a job
/// never runs back-to-back catch-up passes or overlaps itself.
pub(crate) fn ticker(period: Duration) -> Interval {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_outcomes() {
        let mut s = PassSummary::default();
        s.record::<(), ()>(&Ok(()));
        s.record::<(), ()>(&Err(()));
        s.record::<(), ()>(&Ok(()));
        assert_eq!(s, PassSummary { succeeded: 2, failed: 1 });
    }
}
