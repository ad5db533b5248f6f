//! Download event handling.
//!
//! [`DownloadCallbacks`] is handed to the download transport for one
//! submitted download. It turns transport events into patch registry
//! writes and listener notifications:
//!
//! | Event        | Registry write                          | Listener      |
//! |--------------|-----------------------------------------|---------------|
//! | `on_start`   | state = `Updating`                      | -             |
//! | `on_progress`| -                                       | `on_progress` |
//! | `on_success` | local hash = new hash, `UpdatedSuccess` | `on_success`  |
//! | `on_error`   | state = `UpdatedFailed`                 | `on_error`    |
//!
//! Registry writes happen before the listener is notified, and the download
//! leaves the in-flight count only after that. Only the first terminal event
//! of a download is honored. Accepted work that is dropped without reporting
//! an outcome is finalized as failed when its callbacks are released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::Inner;
use crate::business::UpdateState;
use crate::transport::{DownloadEvents, CODE_IO};

/// Error message reported for download work dropped before completion.
const DOWNLOAD_DROPPED_MESSAGE: &str = "download task was dropped before completion";

/// Event sink for one submitted download.
pub(super) struct DownloadCallbacks {
    inner: Arc<Inner>,
    business_id: String,
    finished: AtomicBool,
    /// Set once the executor accepted the work.
    accepted: AtomicBool,
}

impl DownloadCallbacks {
    pub(super) fn new(inner: Arc<Inner>, business_id: &str) -> Self {
        Self {
            inner,
            business_id: business_id.to_string(),
            finished: AtomicBool::new(false),
            accepted: AtomicBool::new(false),
        }
    }

    /// Mark the work as accepted by the executor.
    ///
    /// From here on, releasing the callbacks without a terminal event
    /// finalizes the download as failed.
    pub(super) fn accept(&self) {
        self.accepted.store(true, Ordering::Release);
    }

    /// Claim the single terminal event; `false` if one was already seen.
    fn claim_terminal(&self, business_id: &str) -> bool {
        let first = !self.finished.swap(true, Ordering::AcqRel);
        if !first {
            warn!(business_id, "Ignoring duplicate terminal download event");
        }
        first
    }

    /// Record a failed outcome and release the in-flight slot.
    fn fail(&self, business_id: &str, code: i32, message: &str) {
        self.inner
            .patch_registry()
            .set_update_state(business_id, UpdateState::UpdatedFailed);

        if let Some(listener) = self.inner.listeners.get(business_id) {
            listener.on_error(code, message);
        }
        self.inner.metrics.download_finished(false);
    }
}

impl DownloadEvents for DownloadCallbacks {
    fn on_start(&self, business_id: &str) {
        debug!(business_id, "Download started");
        self.inner
            .patch_registry()
            .set_update_state(business_id, UpdateState::Updating);
    }

    fn on_progress(&self, business_id: &str, percent: u8) {
        if let Some(listener) = self.inner.listeners.get(business_id) {
            listener.on_progress(percent.min(100));
        }
    }

    fn on_success(&self, business_id: &str, new_hash: &str) {
        if !self.claim_terminal(business_id) {
            return;
        }
        info!(business_id, new_hash, "Download succeeded");

        let registry = self.inner.patch_registry();
        registry.set_local_hash(business_id, new_hash);
        registry.set_update_state(business_id, UpdateState::UpdatedSuccess);

        if let Some(listener) = self.inner.listeners.get(business_id) {
            listener.on_success();
        }
        self.inner.metrics.download_finished(true);
    }

    fn on_error(&self, business_id: &str, code: i32, message: &str) {
        if !self.claim_terminal(business_id) {
            return;
        }
        warn!(business_id, code, message, "Download failed");
        self.fail(business_id, code, message);
    }
}

impl Drop for DownloadCallbacks {
    fn drop(&mut self) {
        if !self.accepted.load(Ordering::Acquire) || self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        warn!(business_id = %self.business_id, "Download dropped without an outcome");
        self.fail(&self.business_id, CODE_IO, DOWNLOAD_DROPPED_MESSAGE);
    }
}
