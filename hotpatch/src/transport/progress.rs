//! Byte-count to percent conversion for download progress events.

/// Turns byte counts into percent values, emitting each value once.
///
/// Emitted values never decrease. When the total size is unknown no
/// intermediate values are produced; [`ProgressTracker::finish`] still
/// yields the final 100.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    total_bytes: u64,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    /// Create a tracker for a transfer of `total_bytes` (0 if unknown).
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            last_percent: None,
        }
    }

    /// Record the bytes transferred so far; returns a percent to report if it changed.
    pub fn update(&mut self, downloaded: u64) -> Option<u8> {
        if self.total_bytes == 0 {
            return None;
        }
        let percent = (downloaded.saturating_mul(100) / self.total_bytes).min(100) as u8;
        self.emit(percent)
    }

    /// Mark the transfer complete; returns 100 unless it was already reported.
    pub fn finish(&mut self) -> Option<u8> {
        self.emit(100)
    }

    fn emit(&mut self, percent: u8) -> Option<u8> {
        match self.last_percent {
            Some(last) if percent <= last => None,
            _ => {
                self.last_percent = Some(percent);
                Some(percent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_each_percent_once() {
        let mut tracker = ProgressTracker::new(200);

        assert_eq!(tracker.update(20), Some(10));
        assert_eq!(tracker.update(21), None);
        assert_eq!(tracker.update(110), Some(55));
        assert_eq!(tracker.update(200), Some(100));
        assert_eq!(tracker.finish(), None);
    }

    #[test]
    fn test_unknown_total_only_finishes() {
        let mut tracker = ProgressTracker::new(0);

        assert_eq!(tracker.update(1024), None);
        assert_eq!(tracker.finish(), Some(100));
    }

    #[test]
    fn test_overshoot_clamped() {
        let mut tracker = ProgressTracker::new(10);
        assert_eq!(tracker.update(50), Some(100));
    }

    #[test]
    fn test_zero_progress_reported() {
        let mut tracker = ProgressTracker::new(10);
        assert_eq!(tracker.update(0), Some(0));
        assert_eq!(tracker.update(0), None);
    }
}
