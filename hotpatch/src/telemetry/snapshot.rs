//! Point-in-time copy of orchestrator counters.

use std::fmt;

/// Snapshot of [`OrchestratorMetrics`](super::OrchestratorMetrics).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Checks that entered `WAITING_FOR_RESPONSE`.
    pub checks_started: u64,
    /// Checks that ended in `CHECK_UPDATE_SUCCESS`.
    pub checks_succeeded: u64,
    /// Checks that ended in `CHECK_UPDATE_FAILED`.
    pub checks_failed: u64,
    /// Checks refused because another was in flight.
    pub checks_rejected: u64,
    /// Downloads accepted by the executor.
    pub downloads_submitted: u64,
    /// Downloads that failed before any event could be emitted.
    pub downloads_submit_failed: u64,
    /// Downloads that reported success.
    pub downloads_succeeded: u64,
    /// Downloads that reported an error.
    pub downloads_failed: u64,
    /// Downloads accepted and not yet terminal.
    pub downloads_in_flight: u64,
    /// Completed fan-out passes over a successful check response.
    pub fanouts_completed: u64,
}

impl MetricsSnapshot {
    /// Whether every submitted download has reached an outcome.
    pub fn is_idle(&self) -> bool {
        self.downloads_in_flight == 0
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checks: {} ok / {} failed / {} rejected; downloads: {} ok / {} failed / {} not submitted / {} in flight",
            self.checks_succeeded,
            self.checks_failed,
            self.checks_rejected,
            self.downloads_succeeded,
            self.downloads_failed,
            self.downloads_submit_failed,
            self.downloads_in_flight
        )
    }
}
