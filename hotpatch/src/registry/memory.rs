//! In-memory patch registry.

use dashmap::DashMap;
use tracing::debug;

use super::PatchRegistry;
use crate::business::{BusinessInfo, BusinessPatch, UpdateState};

/// Process-local [`PatchRegistry`] backed by a sharded concurrent map.
///
/// Records are locked per shard, so concurrent download events for
/// different business ids do not serialize behind one global lock.
///
/// # Example
///
/// ```
/// use hotpatch::{InMemoryPatchRegistry, PatchRegistry, UpdateState};
///
/// let registry = InMemoryPatchRegistry::new();
/// registry.insert_local("home", "abc123");
///
/// assert!(registry.set_update_state("home", UpdateState::Updating));
/// assert!(!registry.set_update_state("missing", UpdateState::Updating));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryPatchRegistry {
    patches: DashMap<String, BusinessPatch>,
}

impl InMemoryPatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with `(business id, installed hash)` pairs.
    pub fn from_local<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let registry = Self::new();
        for (id, hash) in entries {
            registry.insert_local(id, hash);
        }
        registry
    }

    /// Record a locally installed patch, replacing any existing record.
    pub fn insert_local(&self, business_id: impl Into<String>, local_hash: impl Into<String>) {
        let patch = BusinessPatch::new(business_id, local_hash);
        self.patches.insert(patch.business_id.clone(), patch);
    }

    /// Remove a record, returning it if present.
    pub fn remove(&self, business_id: &str) -> Option<BusinessPatch> {
        self.patches.remove(business_id).map(|(_, patch)| patch)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Whether the registry has no records.
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

impl PatchRegistry for InMemoryPatchRegistry {
    fn local_patches(&self) -> Vec<BusinessPatch> {
        self.patches.iter().map(|entry| entry.value().clone()).collect()
    }

    fn get_patch(&self, business_id: &str) -> Option<BusinessPatch> {
        self.patches.get(business_id).map(|entry| entry.value().clone())
    }

    fn set_update_state(&self, business_id: &str, state: UpdateState) -> bool {
        match self.patches.get_mut(business_id) {
            Some(mut patch) => {
                patch.update_state = state;
                true
            }
            None => {
                debug!(business_id, %state, "No local patch record, update state not stored");
                false
            }
        }
    }

    fn set_local_hash(&self, business_id: &str, hash: &str) -> bool {
        match self.patches.get_mut(business_id) {
            Some(mut patch) => {
                patch.local_hash = hash.to_string();
                true
            }
            None => {
                debug!(business_id, "No local patch record, hash not stored");
                false
            }
        }
    }

    fn upsert_from_server(&self, info: &BusinessInfo) {
        self.patches
            .entry(info.id.clone())
            .and_modify(|patch| patch.server_info = Some(info.clone()))
            .or_insert_with(|| BusinessPatch::from_server(info));
    }
}
