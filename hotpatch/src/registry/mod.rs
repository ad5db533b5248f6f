//! Local patch registry.
//!
//! The orchestrator reads locally installed patch fingerprints from the
//! registry to build the check request and writes two fields (local hash,
//! update state) as a side effect of download events. The
//! [`PatchRegistry`] trait is the seam; [`InMemoryPatchRegistry`] is the
//! process-local implementation.
//!
//! # Missing Records
//!
//! Every write is keyed by business id and is a no-op when the registry has
//! no record for that id. Writes report whether a record was touched so
//! callers can log the miss, but a miss is never an error.

mod memory;

pub use memory::InMemoryPatchRegistry;

use crate::business::{BusinessInfo, BusinessPatch, UpdateState};

/// Store of locally installed patches, keyed by business id.
///
/// Implementations must be safe to call from arbitrary worker threads and
/// must scope each update to the single business id involved.
pub trait PatchRegistry: Send + Sync {
    /// All locally known patches, in no particular order.
    fn local_patches(&self) -> Vec<BusinessPatch>;

    /// The record for a business id, if one exists.
    fn get_patch(&self, business_id: &str) -> Option<BusinessPatch>;

    /// Set the update state of a business. Returns `false` if no record exists.
    fn set_update_state(&self, business_id: &str, state: UpdateState) -> bool;

    /// Set the installed hash of a business. Returns `false` if no record exists.
    fn set_local_hash(&self, business_id: &str, hash: &str) -> bool;

    /// Push the latest server info for a business into the local record.
    fn upsert_from_server(&self, info: &BusinessInfo);
}
