//! Tokio-backed executor with an optional concurrency bound.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ExecutorError, TaskExecutor, Work};

/// Configuration for [`TokioTaskExecutor`].
#[derive(Clone, Debug, Default)]
pub struct ExecutorConfig {
    /// Maximum number of units of work running at once (`None` = unbounded).
    pub max_concurrent: Option<usize>,
}

impl ExecutorConfig {
    /// Unbounded executor.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Executor running at most `max` units of work at once (minimum 1).
    pub fn with_max_concurrent(max: usize) -> Self {
        Self {
            max_concurrent: Some(max.max(1)),
        }
    }
}

/// Decrements the active counter when the work finishes or panics.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// [`TaskExecutor`] spawning work onto a tokio runtime.
///
/// When bounded, each unit of work waits for a semaphore permit inside its
/// spawned task, so `execute` never blocks the caller. After
/// [`shutdown`](Self::shutdown) new work is refused; work already accepted
/// keeps running.
#[derive(Debug)]
pub struct TokioTaskExecutor {
    handle: Handle,
    limiter: Option<Arc<Semaphore>>,
    max_concurrent: Option<usize>,
    shutdown: CancellationToken,
    active: Arc<AtomicUsize>,
}

impl TokioTaskExecutor {
    /// Create an executor on the given runtime handle.
    pub fn new(handle: Handle, config: ExecutorConfig) -> Self {
        Self {
            handle,
            limiter: config
                .max_concurrent
                .map(|max| Arc::new(Semaphore::new(max))),
            max_concurrent: config.max_concurrent,
            shutdown: CancellationToken::new(),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create an executor on the runtime of the calling context.
    pub fn current(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        let handle = Handle::try_current().map_err(|e| ExecutorError::NoRuntime(e.to_string()))?;
        Ok(Self::new(handle, config))
    }

    /// Stop accepting new work.
    pub fn shutdown(&self) {
        debug!(active = self.active_tasks(), "Executor shutting down");
        self.shutdown.cancel();
    }

    /// Whether new work is refused.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Units of work accepted and not yet finished (including those waiting for a permit).
    pub fn active_tasks(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Configured concurrency bound, if any.
    pub fn max_concurrent(&self) -> Option<usize> {
        self.max_concurrent
    }
}

impl TaskExecutor for TokioTaskExecutor {
    fn execute(&self, work: Work) -> Result<(), ExecutorError> {
        if self.shutdown.is_cancelled() {
            return Err(ExecutorError::ShuttingDown);
        }

        let limiter = self.limiter.clone();
        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard(Arc::clone(&self.active));

        self.handle.spawn(async move {
            let _guard = guard;
            let _permit = match limiter {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            work.await;
        });

        Ok(())
    }
}
