//! Last-event-id persistence trait abstraction.
//!
//! Provides a key-value abstraction for remembering the last event id of
//! each stream target across process restarts.

use async_trait::async_trait;
use std::fmt;

/// Persistence operation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Failed to read the backing storage
    LoadFailed(String),
    /// Failed to write the backing storage
    SaveFailed(String),
    /// Failed to remove an entry
    RemoveFailed(String),
    /// Serialization/deserialization error
    Serialization(String),
    /// Other error
    Other(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::LoadFailed(msg) => write!(f, "Failed to load last event id: {}", msg),
            StoreError::SaveFailed(msg) => write!(f, "Failed to save last event id: {}", msg),
            StoreError::RemoveFailed(msg) => {
                write!(f, "Failed to remove last event id: {}", msg)
            }
            StoreError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            StoreError::Other(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Trait for last-event-id storage.
///
/// One string value per key; keys are namespaced per stream target by the
/// caller so independent subscriptions never clobber each other. An absent
/// entry means there is no resumption point.
///
/// Implementations that touch the file system must not block the calling
/// task; the event source awaits a save for every new id it receives.
///
/// # Example
///
/// ```ignore
/// use eventsource::traits::LastEventIdStore;
///
/// async fn resume_point<S: LastEventIdStore>(store: &S, key: &str) -> Option<String> {
///     store.load(key).await.ok().flatten()
/// }
/// ```
#[async_trait]
pub trait LastEventIdStore: Send + Sync {
    /// Load the stored id for `key`.
    ///
    /// # Returns
    /// - `Ok(Some(id))` if an id is stored
    /// - `Ok(None)` if nothing is stored
    /// - `Err(error)` if the storage could not be read
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `id` under `key`, replacing any previous value.
    async fn save(&self, key: &str, id: &str) -> Result<(), StoreError>;

    /// Remove the entry for `key`. Removing a missing entry succeeds.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
