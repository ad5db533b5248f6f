//! Parsed check-for-update response.

use serde::{Deserialize, Serialize};

use crate::business::BusinessInfo;

/// Server reply to a check-for-update request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckForUpdateResponse {
    /// Whether the server processed the request.
    #[serde(default)]
    pub success: bool,

    /// Server message (error description when `success` is false).
    #[serde(default)]
    pub msg: String,

    /// Per-business info. Missing or `null` means no businesses.
    #[serde(default)]
    pub data: Option<Vec<BusinessInfo>>,
}

impl CheckForUpdateResponse {
    /// A successful response carrying the given businesses.
    pub fn success(businesses: Vec<BusinessInfo>) -> Self {
        Self {
            success: true,
            msg: "ok".to_string(),
            data: Some(businesses),
        }
    }

    /// An unsuccessful response with a server message.
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: msg.into(),
            data: None,
        }
    }

    /// Parse a response body.
    ///
    /// An empty body or a literal `null` is an absent response (`Ok(None)`).
    pub fn parse(body: &str) -> Result<Option<Self>, serde_json::Error> {
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(body)
    }

    /// Returned businesses (empty when the server sent none).
    pub fn businesses(&self) -> &[BusinessInfo] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Consume the response, returning its businesses.
    pub fn into_businesses(self) -> Vec<BusinessInfo> {
        self.data.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_response() {
        let body = r#"{
            "success": true,
            "msg": "ok",
            "data": [
                {"id": "a"},
                {"id": "b", "latestPatch": {"downloadUrl": "https://cdn/b", "hashCode": "H"}}
            ]
        }"#;

        let response = CheckForUpdateResponse::parse(body).unwrap().unwrap();

        assert!(response.success);
        assert_eq!(response.businesses().len(), 2);
        assert!(response.businesses()[0].pending_patch().is_none());
        assert_eq!(
            response.businesses()[1].pending_patch().unwrap().download_url,
            "https://cdn/b"
        );
    }

    #[test]
    fn test_parse_absent_response() {
        assert!(CheckForUpdateResponse::parse("").unwrap().is_none());
        assert!(CheckForUpdateResponse::parse("  \n").unwrap().is_none());
        assert!(CheckForUpdateResponse::parse("null").unwrap().is_none());
    }

    #[test]
    fn test_parse_missing_data() {
        let response = CheckForUpdateResponse::parse(r#"{"success": false, "msg": "denied"}"#)
            .unwrap()
            .unwrap();

        assert!(!response.success);
        assert_eq!(response.msg, "denied");
        assert!(response.businesses().is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(CheckForUpdateResponse::parse("{not json").is_err());
    }
}
