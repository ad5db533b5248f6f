//! Task execution off the calling thread.
//!
//! The orchestrator submits every network round trip as a unit of work to a
//! [`TaskExecutor`] and never waits on it. Submission may be refused (for
//! example after shutdown); refusal is reported synchronously so the caller
//! can record the failure.
//!
//! # Example
//!
//! ```ignore
//! use hotpatch::executor::{ExecutorConfig, TaskExecutor, TokioTaskExecutor};
//!
//! let executor = TokioTaskExecutor::current(ExecutorConfig::with_max_concurrent(4))?;
//! executor.execute(Box::pin(async {
//!     // network work here...
//! }))?;
//! ```

mod pool;

pub use pool::{ExecutorConfig, TokioTaskExecutor};

use thiserror::Error;

use crate::transport::BoxFuture;

/// A unit of work submitted to an executor.
pub type Work = BoxFuture<'static, ()>;

/// Errors raised when submitting work.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// The executor no longer accepts work.
    #[error("executor is shutting down")]
    ShuttingDown,

    /// No async runtime is available to run work on.
    #[error("no async runtime available: {0}")]
    NoRuntime(String),
}

/// Runs submitted work off the calling thread.
///
/// No ordering or priority guarantees are assumed between submissions.
pub trait TaskExecutor: Send + Sync {
    /// Submit work. Returns once the work is accepted, not when it completes.
    fn execute(&self, work: Work) -> Result<(), ExecutorError>;
}
