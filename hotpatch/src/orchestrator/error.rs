//! Orchestrator error types.
//!
//! These never cross the orchestrator's public boundary as `Err` values;
//! their `Display` text is what check callbacks and logs receive.

use thiserror::Error;

use crate::executor::ExecutorError;
use crate::transport::TransportError;

/// Failures inside the check and download flows.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Another check is still waiting for its response.
    #[error("check already in progress")]
    CheckInProgress,

    /// The request body could not be assembled.
    #[error("failed to build check request: {0}")]
    RequestBuild(#[from] serde_json::Error),

    /// The executor refused the work.
    #[error("failed to submit check task: {0}")]
    Submit(#[from] ExecutorError),

    /// The check transport failed.
    #[error("{0}")]
    CheckTransport(TransportError),

    /// The server sent no response body.
    #[error("server response is empty")]
    EmptyResponse,

    /// The server answered with its failure flag set.
    #[error("server error: {0}")]
    ServerRejected(String),

    /// The check task was dropped before it produced a result.
    #[error("check task was dropped before completion")]
    CheckAbandoned,

    /// A download could not be submitted.
    #[error("failed to submit download for {business_id}: {reason}")]
    DownloadSubmit { business_id: String, reason: String },
}

impl OrchestratorError {
    pub(crate) fn download_submit(business_id: &str, reason: impl ToString) -> Self {
        OrchestratorError::DownloadSubmit {
            business_id: business_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            OrchestratorError::ServerRejected("quota".into()).to_string(),
            "server error: quota"
        );
        assert_eq!(
            OrchestratorError::from(ExecutorError::ShuttingDown).to_string(),
            "failed to submit check task: executor is shutting down"
        );
        assert_eq!(
            OrchestratorError::CheckTransport(TransportError::Network("reset".into())).to_string(),
            "network error: reset"
        );
    }

    #[test]
    fn test_download_submit_message() {
        let err = OrchestratorError::download_submit("c", ExecutorError::ShuttingDown);
        assert_eq!(
            err.to_string(),
            "failed to submit download for c: executor is shutting down"
        );
    }
}
