//! Per-business download listeners.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

/// Observer of one business's download progress and outcome.
///
/// For a download that completes while the listener is registered, exactly
/// one of [`on_success`](Self::on_success) / [`on_error`](Self::on_error)
/// is called. Progress is not buffered: a listener registered late only
/// sees events from that point on.
pub trait DownloadTaskListener: Send + Sync {
    /// Download progress in percent (0..=100).
    fn on_progress(&self, percent: u8);

    /// The patch was downloaded and recorded locally.
    fn on_success(&self);

    /// The download failed.
    fn on_error(&self, code: i32, message: &str);
}

/// At most one listener per business id.
///
/// Listeners are returned as cloned `Arc`s so callbacks run without any
/// map lock held; a listener may add or remove listeners from inside its
/// own callback.
#[derive(Default)]
pub struct DownloadListenerRegistry {
    listeners: DashMap<String, Arc<dyn DownloadTaskListener>>,
}

impl DownloadListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, replacing any existing one for the id.
    ///
    /// Returns `false` (and registers nothing) for an empty id.
    pub fn add(&self, business_id: &str, listener: Arc<dyn DownloadTaskListener>) -> bool {
        if business_id.is_empty() {
            return false;
        }
        if self
            .listeners
            .insert(business_id.to_string(), listener)
            .is_some()
        {
            debug!(business_id, "Replaced download listener");
        }
        true
    }

    /// Remove the listener for an id, returning it if present.
    pub fn remove(&self, business_id: &str) -> Option<Arc<dyn DownloadTaskListener>> {
        if business_id.is_empty() {
            return None;
        }
        self.listeners.remove(business_id).map(|(_, listener)| listener)
    }

    /// The listener registered for an id.
    pub fn get(&self, business_id: &str) -> Option<Arc<dyn DownloadTaskListener>> {
        self.listeners
            .get(business_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a listener is registered for an id.
    pub fn contains(&self, business_id: &str) -> bool {
        self.listeners.contains_key(business_id)
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for DownloadListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<String> = self.listeners.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        f.debug_struct("DownloadListenerRegistry")
            .field("business_ids", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingListener {
        successes: AtomicUsize,
    }

    impl DownloadTaskListener for CountingListener {
        fn on_progress(&self, _percent: u8) {}
        fn on_success(&self) {
            self.successes.fetch_add(1, Ordering::SeqCst);
        }
        fn on_error(&self, _code: i32, _message: &str) {}
    }

    #[test]
    fn test_empty_id_is_ignored() {
        let registry = DownloadListenerRegistry::new();

        assert!(!registry.add("", Arc::new(CountingListener::default())));
        assert!(registry.is_empty());
        assert!(registry.remove("").is_none());
    }

    #[test]
    fn test_second_add_replaces_first() {
        let registry = DownloadListenerRegistry::new();
        let first = Arc::new(CountingListener::default());
        let second = Arc::new(CountingListener::default());

        registry.add("a", first.clone());
        registry.add("a", second.clone());
        registry.get("a").unwrap().on_success();

        assert_eq!(registry.len(), 1);
        assert_eq!(first.successes.load(Ordering::SeqCst), 0);
        assert_eq!(second.successes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_is_scoped_to_id() {
        let registry = DownloadListenerRegistry::new();
        registry.add("x", Arc::new(CountingListener::default()));
        registry.add("y", Arc::new(CountingListener::default()));

        assert!(registry.remove("x").is_some());
        assert!(registry.remove("x").is_none());
        assert!(!registry.contains("x"));
        assert!(registry.contains("y"));
    }

    #[test]
    fn test_debug_lists_ids() {
        let registry = DownloadListenerRegistry::new();
        registry.add("b", Arc::new(CountingListener::default()));
        registry.add("a", Arc::new(CountingListener::default()));

        assert_eq!(
            format!("{:?}", registry),
            r#"DownloadListenerRegistry { business_ids: ["a", "b"] }"#
        );
    }
}
