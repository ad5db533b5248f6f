//! Outgoing check-for-update request body.
//!
//! The body is a JSON object with a single array field listing every
//! locally known business and the hash of its installed patch:
//!
//! ```json
//! {"localBusinessList":[{"businessId":"home","localPackageHashCode":"abc"}]}
//! ```
//!
//! An empty registry produces `{"localBusinessList":[]}`, never an empty
//! string, so the server always receives valid structured data.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::business::BusinessPatch;

/// One local business fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalBusinessEntry {
    /// Business identifier.
    pub business_id: String,
    /// Hash of the locally installed patch.
    pub local_package_hash_code: String,
}

/// Check-for-update request payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    /// Local fingerprints, sorted by business id.
    pub local_business_list: Vec<LocalBusinessEntry>,
}

impl CheckRequest {
    /// Build a request from local patch records.
    ///
    /// Records without a business id cannot be matched by the server; they
    /// are logged and skipped without affecting the rest of the batch.
    pub fn from_patches<I>(patches: I) -> Self
    where
        I: IntoIterator<Item = BusinessPatch>,
    {
        let mut local_business_list: Vec<LocalBusinessEntry> = patches
            .into_iter()
            .filter_map(|patch| {
                if patch.business_id.trim().is_empty() {
                    warn!(
                        local_hash = %patch.local_hash,
                        "Skipping local patch without business id"
                    );
                    return None;
                }
                Some(LocalBusinessEntry {
                    business_id: patch.business_id,
                    local_package_hash_code: patch.local_hash,
                })
            })
            .collect();

        local_business_list.sort_by(|a, b| a.business_id.cmp(&b.business_id));

        Self {
            local_business_list,
        }
    }

    /// Number of businesses in the request.
    pub fn len(&self) -> usize {
        self.local_business_list.len()
    }

    /// Whether the request lists no businesses.
    pub fn is_empty(&self) -> bool {
        self.local_business_list.is_empty()
    }

    /// Serialize to the JSON request body.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let body = serde_json::to_string(self)?;
        debug!(body = %body, "Built check request");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_empty_registry_is_valid_json() {
        let request = CheckRequest::from_patches(Vec::new());
        let body = request.to_json().unwrap();

        let parsed: Value = serde_json::from_str(&body).unwrap();
        let list = parsed.get("localBusinessList").unwrap().as_array().unwrap();
        assert!(list.is_empty());
        assert!(request.is_empty());
    }

    #[test]
    fn test_body_shape() {
        let request = CheckRequest::from_patches(vec![
            BusinessPatch::new("b", "h2"),
            BusinessPatch::new("a", "h1"),
        ]);

        let body = request.to_json().unwrap();
        assert_eq!(
            body,
            r#"{"localBusinessList":[{"businessId":"a","localPackageHashCode":"h1"},{"businessId":"b","localPackageHashCode":"h2"}]}"#
        );
    }

    #[test]
    fn test_entry_without_id_is_skipped() {
        let request = CheckRequest::from_patches(vec![
            BusinessPatch::new("", "orphan"),
            BusinessPatch::new("a", "h1"),
        ]);

        assert_eq!(request.len(), 1);
        assert_eq!(request.local_business_list[0].business_id, "a");
    }

    #[test]
    fn test_empty_local_hash_is_kept() {
        let request = CheckRequest::from_patches(vec![BusinessPatch::new("fresh", "")]);

        assert_eq!(request.len(), 1);
        assert!(request.local_business_list[0].local_package_hash_code.is_empty());
    }
}
