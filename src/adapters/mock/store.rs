//! In-memory last-event-id store for testing.
//!
//! Provides a store that keeps ids in a map, suitable for testing without
//! file system access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::traits::{LastEventIdStore, StoreError};

/// In-memory last-event-id store for testing.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// an event source persisted.
///
/// # Example
///
/// ```ignore
/// use eventsource::adapters::mock::InMemoryLastEventIdStore;
/// use eventsource::traits::LastEventIdStore;
///
/// let store = InMemoryLastEventIdStore::new();
/// store.save("key", "42").await?;
/// assert_eq!(store.load("key").await?, Some("42".to_string()));
///
/// store.set_should_fail(true);
/// assert!(store.load("key").await.is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryLastEventIdStore {
    /// Stored ids by key
    entries: Arc<Mutex<HashMap<String, String>>>,
    /// Whether every operation should fail
    should_fail: Arc<Mutex<bool>>,
    /// Number of successful saves
    save_count: Arc<Mutex<usize>>,
}

impl InMemoryLastEventIdStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure whether every operation should fail.
    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }

    /// Get an entry synchronously (for testing), bypassing failure injection.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Set an entry synchronously (for testing), bypassing failure injection.
    pub fn insert(&self, key: &str, id: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), id.to_string());
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        *self.save_count.lock().unwrap()
    }

    fn failing(&self) -> bool {
        *self.should_fail.lock().unwrap()
    }
}

#[async_trait]
impl LastEventIdStore for InMemoryLastEventIdStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.failing() {
            return Err(StoreError::LoadFailed("Mock load failure".to_string()));
        }

        Ok(self.get(key))
    }

    async fn save(&self, key: &str, id: &str) -> Result<(), StoreError> {
        if self.failing() {
            return Err(StoreError::SaveFailed("Mock save failure".to_string()));
        }

        self.insert(key, id);
        *self.save_count.lock().unwrap() += 1;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.failing() {
            return Err(StoreError::RemoveFailed("Mock remove failure".to_string()));
        }

        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
