use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Map of per-key async slots. The outer lock is only held to look up or
/// insert an entry; locking the inner `Mutex` serializes all work on one key,
/// so concurrent callers for the same key coalesce instead of racing.
///
/// Entries are never removed: handing out a fresh slot while another task
/// still holds the old one would allow two holders for the same key. The map
/// stays bounded by the set of distinct keys seen.
pub struct KeyedLocks<T> {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<T>>>>>,
}

impl<T> Clone for KeyedLocks<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> KeyedLocks<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the slot for `key`, creating it (with `T::default()`) if absent.
    pub async fn entry(&self, key: &str) -> Arc<Mutex<T>> {
        let mut map = self.inner.lock().await;
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(T::default())))
            .clone()
    }
}

impl<T: Default> Default for KeyedLocks<T> {
    fn default() -> Self {
        Self::new()
    }
}
