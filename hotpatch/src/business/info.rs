//! Server-reported business information.
//!
//! [`BusinessInfo`] mirrors one entry of a check-for-update response. Only
//! the identifier and the optional [`LatestPatch`] carry meaning for the
//! orchestrator; every other field the server sends is retained verbatim in
//! [`BusinessInfo::metadata`] so it can be handed to the patch registry.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A downloadable patch advertised by the server for one business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPatch {
    /// Where the patch artifact can be fetched from.
    #[serde(default)]
    pub download_url: String,

    /// Content hash identifying the patch.
    #[serde(default)]
    pub hash_code: String,
}

impl LatestPatch {
    /// Create a new patch descriptor.
    pub fn new(download_url: impl Into<String>, hash_code: impl Into<String>) -> Self {
        Self {
            download_url: download_url.into(),
            hash_code: hash_code.into(),
        }
    }

    /// A patch without a download URL cannot be fetched and counts as absent.
    pub fn is_empty(&self) -> bool {
        self.download_url.trim().is_empty()
    }
}

/// Server-side state for one business unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    /// Stable business identifier (unique key).
    pub id: String,

    /// Newer patch available for this business, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_patch: Option<LatestPatch>,

    /// Remaining server fields, kept opaque.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl BusinessInfo {
    /// Create info for a business with no pending patch.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            latest_patch: None,
            metadata: Map::new(),
        }
    }

    /// Attach a latest patch (builder pattern).
    pub fn with_patch(mut self, download_url: impl Into<String>, hash_code: impl Into<String>) -> Self {
        self.latest_patch = Some(LatestPatch::new(download_url, hash_code));
        self
    }

    /// Attach an opaque metadata field (builder pattern).
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the patch to download, if the server advertised a non-empty one.
    pub fn pending_patch(&self) -> Option<&LatestPatch> {
        self.latest_patch.as_ref().filter(|patch| !patch.is_empty())
    }
}

/// Latest server-reported [`BusinessInfo`] per business id.
///
/// Entries are overwritten wholesale on every check (no merge). Backed by a
/// sharded concurrent map, so updates for unrelated ids never contend on a
/// single lock.
#[derive(Debug, Default)]
pub struct BusinessInfoRegistry {
    entries: DashMap<String, BusinessInfo>,
}

impl BusinessInfoRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the info for `info.id`, returning the previous entry.
    pub fn upsert(&self, info: BusinessInfo) -> Option<BusinessInfo> {
        self.entries.insert(info.id.clone(), info)
    }

    /// Get a copy of the info for a business id.
    pub fn get(&self, id: &str) -> Option<BusinessInfo> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Whether info has been received for a business id.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All known business ids, sorted for stable output.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of businesses with received info.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no info has been received yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_patch_requires_url() {
        let info = BusinessInfo::new("a").with_patch("", "h1");
        assert!(info.pending_patch().is_none());

        let info = BusinessInfo::new("a").with_patch("   ", "h1");
        assert!(info.pending_patch().is_none());

        let info = BusinessInfo::new("a").with_patch("https://cdn/a.patch", "h1");
        assert_eq!(info.pending_patch().unwrap().hash_code, "h1");
    }

    #[test]
    fn test_pending_patch_absent() {
        let info = BusinessInfo::new("a");
        assert!(info.pending_patch().is_none());
    }

    #[test]
    fn test_deserialize_keeps_unknown_fields() {
        let json = r#"{
            "id": "home",
            "name": "Home Page",
            "verifyCode": 7,
            "latestPatch": {"downloadUrl": "https://cdn/home.patch", "hashCode": "abc"}
        }"#;

        let info: BusinessInfo = serde_json::from_str(json).unwrap();

        assert_eq!(info.id, "home");
        assert_eq!(info.metadata.get("name").unwrap(), "Home Page");
        assert_eq!(info.metadata.get("verifyCode").unwrap(), 7);
        assert!(!info.metadata.contains_key("latestPatch"));
        assert_eq!(
            info.pending_patch(),
            Some(&LatestPatch::new("https://cdn/home.patch", "abc"))
        );
    }

    #[test]
    fn test_deserialize_null_patch() {
        let info: BusinessInfo =
            serde_json::from_str(r#"{"id": "a", "latestPatch": null}"#).unwrap();
        assert!(info.latest_patch.is_none());
    }

    #[test]
    fn test_registry_upsert_overwrites() {
        let registry = BusinessInfoRegistry::new();

        assert!(registry.upsert(BusinessInfo::new("a").with_metadata("v", 1)).is_none());
        let previous = registry
            .upsert(BusinessInfo::new("a").with_patch("https://cdn/a", "h2"))
            .unwrap();

        assert_eq!(previous.metadata.get("v").unwrap(), 1);
        let current = registry.get("a").unwrap();
        assert!(current.metadata.is_empty());
        assert!(current.pending_patch().is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_ids_sorted() {
        let registry = BusinessInfoRegistry::new();
        registry.upsert(BusinessInfo::new("b"));
        registry.upsert(BusinessInfo::new("a"));

        assert_eq!(registry.ids(), vec!["a".to_string(), "b".to_string()]);
        assert!(registry.contains("a"));
        assert!(!registry.contains("c"));
    }
}
