//! Check → fan-out → download coordination.
//!
//! [`UpdateOrchestrator`] is an explicitly constructed service owning the
//! check state and the two registries (server infos, download listeners).
//! Its collaborators are injected through [`Collaborators`].
//!
//! # Flow
//!
//! 1. `check_for_update` enters `WAITING_FOR_RESPONSE` (refused while a
//!    check is already waiting), builds the request from local patches and
//!    submits the round trip to the executor.
//! 2. On completion the check state is set and the caller's callback runs
//!    exactly once.
//! 3. After a successful check, every returned business is recorded and a
//!    download is submitted for each one carrying a non-empty latest patch.
//!    A submission failure marks that business `UPDATED_FAILED` and the pass
//!    moves on.
//!
//! Nothing is returned as an error from the public surface; outcomes arrive
//! through callbacks, listeners, or polled state.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hotpatch::{Collaborators, UpdateOrchestrator};
//!
//! let orchestrator = UpdateOrchestrator::new(Collaborators {
//!     check_transport: Arc::new(check),
//!     download_transport: Arc::new(download),
//!     patch_registry: registry.clone(),
//!     executor: Arc::new(executor),
//! });
//!
//! orchestrator.add_download_task_listener("home", Arc::new(MyListener));
//! let outcome = orchestrator.check_for_update_async().await;
//! ```

mod error;
mod events;
mod listener;

pub use error::OrchestratorError;
pub use listener::{DownloadListenerRegistry, DownloadTaskListener};

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::business::{BusinessInfo, BusinessInfoRegistry, UpdateState};
use crate::check::{CheckRequest, CheckUpdateState, SharedCheckState};
use crate::executor::TaskExecutor;
use crate::registry::PatchRegistry;
use crate::telemetry::{MetricsSnapshot, OrchestratorMetrics};
use crate::transport::{CheckResult, CheckTransport, DownloadRequest, DownloadTransport};
use events::DownloadCallbacks;

/// Completion callback for a check: `(success, message)`.
pub type CheckCallback = Box<dyn FnOnce(bool, String) + Send + 'static>;

/// Message delivered to the callback of a successful check.
pub const CHECK_SUCCESS_MESSAGE: &str = "success";

/// Outcome of one check invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Whether the check succeeded.
    pub success: bool,
    /// `"success"` or a failure description.
    pub message: String,
}

impl CheckOutcome {
    fn failure(error: OrchestratorError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
        }
    }
}

/// Injected collaborators.
#[derive(Clone)]
pub struct Collaborators {
    /// Performs the check round trip.
    pub check_transport: Arc<dyn CheckTransport>,
    /// Prepares per-business downloads.
    pub download_transport: Arc<dyn DownloadTransport>,
    /// Local patch records.
    pub patch_registry: Arc<dyn PatchRegistry>,
    /// Runs submitted work off the calling thread.
    pub executor: Arc<dyn TaskExecutor>,
}

/// State shared between the orchestrator handle, check tasks and download
/// callbacks.
pub(crate) struct Inner {
    collaborators: Collaborators,
    check_state: SharedCheckState,
    pending_callback: Mutex<Option<CheckCallback>>,
    business_infos: BusinessInfoRegistry,
    listeners: DownloadListenerRegistry,
    metrics: OrchestratorMetrics,
}

impl Inner {
    fn patch_registry(&self) -> &dyn PatchRegistry {
        self.collaborators.patch_registry.as_ref()
    }

    /// Set the final check state and run the pending callback, once.
    fn complete_check(&self, result: Result<(), OrchestratorError>) {
        let Some(callback) = self.pending_callback.lock().take() else {
            debug!("Check already completed, ignoring result");
            return;
        };

        let (success, message) = match result {
            Ok(()) => (true, CHECK_SUCCESS_MESSAGE.to_string()),
            Err(e) => {
                warn!(error = %e, "Check for update failed");
                (false, e.to_string())
            }
        };

        self.check_state.finish(success);
        self.metrics.check_finished(success);
        callback(success, message);
    }

    /// Interpret the transport result of a check.
    fn on_check_result(self: &Arc<Self>, result: CheckResult) {
        match result {
            Err(e) => self.complete_check(Err(OrchestratorError::CheckTransport(e))),
            Ok(None) => self.complete_check(Err(OrchestratorError::EmptyResponse)),
            Ok(Some(response)) if !response.success => {
                self.complete_check(Err(OrchestratorError::ServerRejected(response.msg)))
            }
            Ok(Some(response)) => {
                self.complete_check(Ok(()));
                self.fan_out(response.into_businesses());
            }
        }
    }

    /// Record every returned business and submit downloads for pending patches.
    fn fan_out(self: &Arc<Self>, businesses: Vec<BusinessInfo>) {
        info!(count = businesses.len(), "Processing check response");

        for info in businesses {
            if info.id.is_empty() {
                warn!("Skipping business info without id");
                continue;
            }

            self.business_infos.upsert(info.clone());
            self.patch_registry().upsert_from_server(&info);

            let Some(patch) = info.pending_patch() else {
                debug!(business_id = %info.id, "No pending patch");
                continue;
            };

            let request = DownloadRequest::new(&info.id, &patch.download_url, &patch.hash_code);
            if let Err(e) = self.submit_download(request) {
                warn!(business_id = %info.id, error = %e, "Download not submitted");
                self.patch_registry()
                    .set_update_state(&info.id, UpdateState::UpdatedFailed);
            }
        }

        self.metrics.fanout_completed();
    }

    fn submit_download(self: &Arc<Self>, request: DownloadRequest) -> Result<(), OrchestratorError> {
        let business_id = request.business_id.clone();
        info!(business_id = %business_id, url = %request.url, "Submitting patch download");

        let events = Arc::new(DownloadCallbacks::new(Arc::clone(self), &business_id));
        let work = self
            .collaborators
            .download_transport
            .download(request, events.clone())
            .map_err(|e| {
                self.metrics.download_submit_failed();
                OrchestratorError::download_submit(&business_id, e)
            })?;

        self.metrics.download_submitted();
        // `events` stays alive across `execute`, so work dropped by the
        // executor is finalized only after it has been accepted.
        self.collaborators.executor.execute(work).map_err(|e| {
            self.metrics.download_rejected();
            OrchestratorError::download_submit(&business_id, e)
        })?;
        events.accept();
        Ok(())
    }
}

// =============================================================================
// Check task guard
// =============================================================================

const GUARD_PENDING: u8 = 0;
const GUARD_SUBMITTED: u8 = 1;
const GUARD_DROPPED_EARLY: u8 = 2;

/// Completes the check as abandoned if the check task is dropped before it
/// produces a result.
///
/// A task dropped while the executor is still deciding leaves the outcome
/// to the submitter, which knows whether the executor refused the work.
struct CheckGuard {
    inner: Option<Arc<Inner>>,
    submission: Arc<AtomicU8>,
}

impl CheckGuard {
    fn new(inner: Arc<Inner>) -> (Self, Arc<AtomicU8>) {
        let submission = Arc::new(AtomicU8::new(GUARD_PENDING));
        let guard = Self {
            inner: Some(inner),
            submission: Arc::clone(&submission),
        };
        (guard, submission)
    }

    fn complete(mut self, result: CheckResult) {
        if let Some(inner) = self.inner.take() {
            inner.on_check_result(result);
        }
    }
}

impl Drop for CheckGuard {
    fn drop(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        let handed_back = self
            .submission
            .compare_exchange(
                GUARD_PENDING,
                GUARD_DROPPED_EARLY,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if !handed_back {
            inner.complete_check(Err(OrchestratorError::CheckAbandoned));
        }
    }
}

/// Coordinates check-for-update and per-business patch downloads.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct UpdateOrchestrator {
    inner: Arc<Inner>,
}

impl UpdateOrchestrator {
    /// Create an orchestrator over the given collaborators.
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            inner: Arc::new(Inner {
                collaborators,
                check_state: SharedCheckState::new(),
                pending_callback: Mutex::new(None),
                business_infos: BusinessInfoRegistry::new(),
                listeners: DownloadListenerRegistry::new(),
                metrics: OrchestratorMetrics::new(),
            }),
        }
    }

    /// Start a check for newer patches.
    ///
    /// Never blocks. `callback` runs exactly once with `(success, message)`,
    /// on whichever thread the check completes on. While another check is
    /// waiting for its response the invocation is refused: the callback
    /// receives `(false, "check already in progress")` and the check state
    /// is left untouched.
    pub fn check_for_update<F>(&self, callback: F)
    where
        F: FnOnce(bool, String) + Send + 'static,
    {
        let inner = &self.inner;

        if inner.check_state.try_begin().is_none() {
            inner.metrics.check_rejected();
            warn!("Check for update refused, another check is in flight");
            callback(false, OrchestratorError::CheckInProgress.to_string());
            return;
        }
        inner.metrics.check_started();
        let callback: CheckCallback = Box::new(callback);
        *inner.pending_callback.lock() = Some(callback);

        let body = match self.build_check_request() {
            Ok(body) => body,
            Err(e) => {
                inner.complete_check(Err(e));
                return;
            }
        };

        let check = inner.collaborators.check_transport.check(body);
        let (guard, submission) = CheckGuard::new(Arc::clone(inner));
        let work = Box::pin(async move {
            let result = check.await;
            guard.complete(result);
        });

        match inner.collaborators.executor.execute(work) {
            Err(e) => inner.complete_check(Err(OrchestratorError::Submit(e))),
            Ok(()) => {
                let dropped_early = submission
                    .compare_exchange(
                        GUARD_PENDING,
                        GUARD_SUBMITTED,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_err();
                if dropped_early {
                    inner.complete_check(Err(OrchestratorError::CheckAbandoned));
                }
            }
        }
    }

    /// Start a check and wait for its outcome.
    pub async fn check_for_update_async(&self) -> CheckOutcome {
        let (tx, rx) = oneshot::channel();
        self.check_for_update(move |success, message| {
            let _ = tx.send(CheckOutcome { success, message });
        });
        rx.await
            .unwrap_or_else(|_| CheckOutcome::failure(OrchestratorError::CheckAbandoned))
    }

    fn build_check_request(&self) -> Result<String, OrchestratorError> {
        let patches = self.inner.patch_registry().local_patches();
        let request = CheckRequest::from_patches(patches);
        debug!(businesses = request.len(), "Checking for updates");
        Ok(request.to_json()?)
    }

    /// Whether the most recent check succeeded.
    pub fn is_check_update_state_success(&self) -> bool {
        self.inner.check_state.is_success()
    }

    /// State of the most recent check.
    pub fn check_state(&self) -> CheckUpdateState {
        self.inner.check_state.get()
    }

    /// Register the download listener for a business id.
    ///
    /// Replaces any existing listener for the id; ignored for an empty id.
    pub fn add_download_task_listener(
        &self,
        business_id: &str,
        listener: Arc<dyn DownloadTaskListener>,
    ) {
        self.inner.listeners.add(business_id, listener);
    }

    /// Remove the download listener for a business id, if any.
    pub fn remove_download_task_listener(&self, business_id: &str) {
        self.inner.listeners.remove(business_id);
    }

    /// Latest server info received for a business id.
    pub fn business_info(&self, business_id: &str) -> Option<BusinessInfo> {
        self.inner.business_infos.get(business_id)
    }

    /// Ids of all businesses returned by checks so far.
    pub fn business_ids(&self) -> Vec<String> {
        self.inner.business_infos.ids()
    }

    /// Counters for checks and downloads.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl fmt::Debug for UpdateOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateOrchestrator")
            .field("check_state", &self.check_state())
            .field("businesses", &self.inner.business_infos.len())
            .field("listeners", &self.inner.listeners)
            .finish_non_exhaustive()
    }
}
