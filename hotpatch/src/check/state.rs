//! Process-wide check lifecycle state.
//!
//! # State Machine
//!
//! ```text
//! NotStart ──begin──► WaitingForResponse ──finish(true)──► CheckUpdateSuccess
//!                            ▲       │
//!                            │       └────finish(false)──► CheckUpdateFailed
//!                            │                                   │
//!                            └────────────begin──────────────────┘
//! ```
//!
//! `begin` is refused while a check is already waiting for its response.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the most recent check-for-update attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CheckUpdateState {
    /// No check has been started.
    #[default]
    NotStart,
    /// A check request is in flight.
    WaitingForResponse,
    /// The last check completed with a successful response.
    CheckUpdateSuccess,
    /// The last check failed (build, transport, or protocol failure).
    CheckUpdateFailed,
}

impl CheckUpdateState {
    /// Get a short description for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckUpdateState::NotStart => "NOT_START",
            CheckUpdateState::WaitingForResponse => "WAITING_FOR_RESPONSE",
            CheckUpdateState::CheckUpdateSuccess => "CHECK_UPDATE_SUCCESS",
            CheckUpdateState::CheckUpdateFailed => "CHECK_UPDATE_FAILED",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            CheckUpdateState::NotStart => 0,
            CheckUpdateState::WaitingForResponse => 1,
            CheckUpdateState::CheckUpdateSuccess => 2,
            CheckUpdateState::CheckUpdateFailed => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => CheckUpdateState::WaitingForResponse,
            2 => CheckUpdateState::CheckUpdateSuccess,
            3 => CheckUpdateState::CheckUpdateFailed,
            _ => CheckUpdateState::NotStart,
        }
    }
}

impl fmt::Display for CheckUpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-free holder for the current [`CheckUpdateState`].
///
/// Readers on any thread observe a complete value; there is no torn state.
#[derive(Debug, Default)]
pub struct SharedCheckState {
    state: AtomicU8,
}

impl SharedCheckState {
    /// Create a holder in `NotStart`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn get(&self) -> CheckUpdateState {
        CheckUpdateState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Overwrite the state unconditionally.
    pub fn set(&self, state: CheckUpdateState) {
        tracing::debug!(%state, "Set check update state");
        self.state.store(state.to_u8(), Ordering::Release);
    }

    /// Enter `WaitingForResponse` unless a check is already waiting.
    ///
    /// Returns the previous state on success, or `None` if refused.
    pub fn try_begin(&self) -> Option<CheckUpdateState> {
        let waiting = CheckUpdateState::WaitingForResponse.to_u8();
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != waiting).then_some(waiting)
            })
            .ok()
            .map(|previous| {
                tracing::debug!(
                    from = %CheckUpdateState::from_u8(previous),
                    "Set check update state = WAITING_FOR_RESPONSE"
                );
                CheckUpdateState::from_u8(previous)
            })
    }

    /// Leave `WaitingForResponse` with the outcome of the check.
    pub fn finish(&self, success: bool) {
        if success {
            self.set(CheckUpdateState::CheckUpdateSuccess);
        } else {
            self.set(CheckUpdateState::CheckUpdateFailed);
        }
    }

    /// Whether the most recent check succeeded.
    pub fn is_success(&self) -> bool {
        self.get() == CheckUpdateState::CheckUpdateSuccess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_not_started() {
        let state = SharedCheckState::new();
        assert_eq!(state.get(), CheckUpdateState::NotStart);
        assert!(!state.is_success());
    }

    #[test]
    fn test_begin_then_finish() {
        let state = SharedCheckState::new();

        assert_eq!(state.try_begin(), Some(CheckUpdateState::NotStart));
        assert_eq!(state.get(), CheckUpdateState::WaitingForResponse);

        state.finish(true);
        assert!(state.is_success());

        assert_eq!(state.try_begin(), Some(CheckUpdateState::CheckUpdateSuccess));
        state.finish(false);
        assert_eq!(state.get(), CheckUpdateState::CheckUpdateFailed);
    }

    #[test]
    fn test_begin_refused_while_waiting() {
        let state = SharedCheckState::new();

        assert!(state.try_begin().is_some());
        assert!(state.try_begin().is_none());
        assert_eq!(state.get(), CheckUpdateState::WaitingForResponse);
    }

    #[test]
    fn test_only_one_concurrent_begin_wins() {
        let state = Arc::new(SharedCheckState::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || state.try_begin().is_some())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CheckUpdateState::WaitingForResponse.to_string(),
            "WAITING_FOR_RESPONSE"
        );
    }

    proptest! {
        #[test]
        fn test_state_reflects_latest_attempt(outcomes in proptest::collection::vec(any::<bool>(), 1..32)) {
            let state = SharedCheckState::new();
            for outcome in outcomes {
                prop_assert!(state.try_begin().is_some());
                state.finish(outcome);
                prop_assert_eq!(state.is_success(), outcome);
            }
        }
    }
}
