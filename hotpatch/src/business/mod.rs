//! Business unit data model.
//!
//! A business unit is an independently versioned component of the host
//! application with its own patch stream. This module holds the two views
//! of a business the orchestrator works with:
//!
//! - [`BusinessInfo`] - what the server reported on the most recent check
//! - [`BusinessPatch`] - what is installed locally, plus its [`UpdateState`]
//!
//! [`BusinessInfoRegistry`] keeps the latest server-side info per id.

mod info;
mod patch;

pub use info::{BusinessInfo, BusinessInfoRegistry, LatestPatch};
pub use patch::{BusinessPatch, UpdateState};
