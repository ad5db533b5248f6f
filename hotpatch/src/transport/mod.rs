//! Network collaborators for checking and downloading patches.
//!
//! The orchestrator only calls these traits and consumes their callbacks;
//! retry, backoff and timeout behavior belong to the implementations.
//!
//! - [`CheckTransport`] - one request/response round trip
//! - [`DownloadTransport`] - per-business download driving [`DownloadEvents`]
//!
//! # Dyn Compatibility
//!
//! Async methods return [`BoxFuture`] so the orchestrator can hold
//! `Arc<dyn CheckTransport>` and hand the futures to any executor.

mod checksum;
mod http;
mod progress;

pub use checksum::{calculate_file_checksum, hashes_match, is_sha256_hex};
pub use http::{HttpCheckTransport, HttpDownloadTransport};
pub use progress::ProgressTracker;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::check::CheckForUpdateResponse;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error code for network and local I/O failures.
pub const CODE_IO: i32 = -1;

/// Error code for undecodable responses.
pub const CODE_DECODE: i32 = -2;

/// Error code for a downloaded artifact whose hash differs from the expected one.
pub const CODE_HASH_MISMATCH: i32 = -3;

/// Error code for requests rejected before they were sent.
pub const CODE_INVALID_REQUEST: i32 = -4;

/// Errors reported by transports.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request could not be sent or the connection failed.
    #[error("network error: {0}")]
    Network(String),

    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The downloaded artifact does not match the advertised hash.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    /// The URL is unusable; raised synchronously at submission time.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl TransportError {
    /// Numeric code forwarded to listeners alongside the message.
    pub fn code(&self) -> i32 {
        match self {
            TransportError::Http { status, .. } => i32::from(*status),
            TransportError::Network(_) | TransportError::Io(_) => CODE_IO,
            TransportError::Decode(_) => CODE_DECODE,
            TransportError::HashMismatch { .. } => CODE_HASH_MISMATCH,
            TransportError::InvalidUrl { .. } => CODE_INVALID_REQUEST,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

/// Result of a check round trip. `Ok(None)` is an absent response.
pub type CheckResult = Result<Option<CheckForUpdateResponse>, TransportError>;

/// Performs the check-for-update round trip.
pub trait CheckTransport: Send + Sync {
    /// Send the request body and resolve with the parsed response.
    fn check(&self, body: String) -> BoxFuture<'static, CheckResult>;
}

/// Everything needed to fetch one business's patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Business the patch belongs to.
    pub business_id: String,
    /// Artifact location.
    pub url: String,
    /// Hash advertised by the server.
    pub expected_hash: String,
}

impl DownloadRequest {
    /// Create a download request.
    pub fn new(
        business_id: impl Into<String>,
        url: impl Into<String>,
        expected_hash: impl Into<String>,
    ) -> Self {
        Self {
            business_id: business_id.into(),
            url: url.into(),
            expected_hash: expected_hash.into(),
        }
    }
}

/// Callbacks a download reports through, keyed by business id.
///
/// A completed download calls `on_start`, zero or more `on_progress`, then
/// exactly one of `on_success` / `on_error`. Calls may arrive on any thread.
pub trait DownloadEvents: Send + Sync {
    /// The download began transferring.
    fn on_start(&self, business_id: &str);

    /// Transfer progress in percent (0..=100).
    fn on_progress(&self, business_id: &str, percent: u8);

    /// The artifact is stored locally under `new_hash`.
    fn on_success(&self, business_id: &str, new_hash: &str);

    /// The download failed.
    fn on_error(&self, business_id: &str, code: i32, message: &str);
}

/// Prepares per-business downloads.
pub trait DownloadTransport: Send + Sync {
    /// Validate the request and return the work that performs the download.
    ///
    /// Returning `Err` is a submission-time failure: no events have been
    /// or will be emitted for this request.
    fn download(
        &self,
        request: DownloadRequest,
        events: Arc<dyn DownloadEvents>,
    ) -> Result<BoxFuture<'static, ()>, TransportError>;
}
