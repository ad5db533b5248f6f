//! Locally installed patch records.

use std::fmt;

use super::info::BusinessInfo;

/// Download lifecycle state of one business unit.
///
/// Transitions are driven exclusively by download events, never by the
/// check phase:
///
/// ```text
/// Idle ──on_start──► Updating ──on_success──► UpdatedSuccess
///                        │
///                        └──────on_error────► UpdatedFailed
/// ```
///
/// A download that cannot even be submitted moves straight to
/// `UpdatedFailed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UpdateState {
    /// No download has been attempted.
    #[default]
    Idle,
    /// A download is running.
    Updating,
    /// The last download completed.
    UpdatedSuccess,
    /// The last download (or its submission) failed.
    UpdatedFailed,
}

impl UpdateState {
    /// Get a short description for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateState::Idle => "IDLE",
            UpdateState::Updating => "UPDATING",
            UpdateState::UpdatedSuccess => "UPDATED_SUCCESS",
            UpdateState::UpdatedFailed => "UPDATED_FAILED",
        }
    }

    /// Whether the last download reached an outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UpdateState::UpdatedSuccess | UpdateState::UpdatedFailed)
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local record of one business unit's installed patch.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessPatch {
    /// Business identifier.
    pub business_id: String,

    /// Hash of the locally installed patch (empty if nothing installed yet).
    pub local_hash: String,

    /// Current download lifecycle state.
    pub update_state: UpdateState,

    /// Most recent server info pushed into the registry.
    pub server_info: Option<BusinessInfo>,
}

impl BusinessPatch {
    /// Create an idle record with the given installed hash.
    pub fn new(business_id: impl Into<String>, local_hash: impl Into<String>) -> Self {
        Self {
            business_id: business_id.into(),
            local_hash: local_hash.into(),
            update_state: UpdateState::Idle,
            server_info: None,
        }
    }

    /// Create a record for a business that is only known from the server.
    pub fn from_server(info: &BusinessInfo) -> Self {
        Self {
            business_id: info.id.clone(),
            local_hash: String::new(),
            update_state: UpdateState::Idle,
            server_info: Some(info.clone()),
        }
    }
}
