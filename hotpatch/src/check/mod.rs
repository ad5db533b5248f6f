//! Check-for-update protocol pieces.
//!
//! - [`CheckUpdateState`] / [`SharedCheckState`] - lifecycle of the most
//!   recent check attempt, shared across worker threads
//! - [`CheckRequest`] - outgoing request body built from local patches
//! - [`CheckForUpdateResponse`] - parsed server reply

mod request;
mod response;
mod state;

pub use request::{CheckRequest, LocalBusinessEntry};
pub use response::CheckForUpdateResponse;
pub use state::{CheckUpdateState, SharedCheckState};
