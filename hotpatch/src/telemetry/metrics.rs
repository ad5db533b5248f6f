//! Atomic counters updated from worker threads.

use std::sync::atomic::{AtomicU64, Ordering};

use super::snapshot::MetricsSnapshot;

/// Counters for check and download events.
#[derive(Debug, Default)]
pub struct OrchestratorMetrics {
    checks_started: AtomicU64,
    checks_succeeded: AtomicU64,
    checks_failed: AtomicU64,
    checks_rejected: AtomicU64,
    downloads_submitted: AtomicU64,
    downloads_submit_failed: AtomicU64,
    downloads_succeeded: AtomicU64,
    downloads_failed: AtomicU64,
    downloads_in_flight: AtomicU64,
    fanouts_completed: AtomicU64,
}

impl OrchestratorMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_started(&self) {
        self.checks_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn check_finished(&self, success: bool) {
        if success {
            self.checks_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.checks_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn check_rejected(&self) {
        self.checks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// A download was accepted; it counts as in flight until it finishes.
    pub fn download_submitted(&self) {
        self.downloads_submitted.fetch_add(1, Ordering::Relaxed);
        self.downloads_in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub fn download_submit_failed(&self) {
        self.downloads_submit_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Undo [`download_submitted`](Self::download_submitted) for work the executor refused.
    pub fn download_rejected(&self) {
        let _ = self
            .downloads_submitted
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        let _ = self
            .downloads_in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        self.download_submit_failed();
    }

    /// A submitted download reached its outcome.
    pub fn download_finished(&self, success: bool) {
        if success {
            self.downloads_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.downloads_failed.fetch_add(1, Ordering::Relaxed);
        }
        // Saturate: a misbehaving transport may report more than one outcome.
        let _ = self
            .downloads_in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn fanout_completed(&self) {
        self.fanouts_completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            checks_started: self.checks_started.load(Ordering::Relaxed),
            checks_succeeded: self.checks_succeeded.load(Ordering::Relaxed),
            checks_failed: self.checks_failed.load(Ordering::Relaxed),
            checks_rejected: self.checks_rejected.load(Ordering::Relaxed),
            downloads_submitted: self.downloads_submitted.load(Ordering::Relaxed),
            downloads_submit_failed: self.downloads_submit_failed.load(Ordering::Relaxed),
            downloads_succeeded: self.downloads_succeeded.load(Ordering::Relaxed),
            downloads_failed: self.downloads_failed.load(Ordering::Relaxed),
            downloads_in_flight: self.downloads_in_flight.load(Ordering::SeqCst),
            fanouts_completed: self.fanouts_completed.load(Ordering::SeqCst),
        }
    }
}
