//! File-based last-event-id store adapter.
//!
//! Keeps every persisted id in one JSON document so that resumption points
//! survive process restarts. File access runs on the blocking thread pool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::traits::{LastEventIdStore, StoreError};

/// Directory under the platform data directory that holds the store.
const APP_DIR: &str = "eventsource";

/// Name of the store file.
const FILE_NAME: &str = "last_event_ids.json";

/// On-disk layout of the store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IdFile {
    #[serde(default)]
    ids: BTreeMap<String, String>,
}

/// File-based last-event-id store.
///
/// Ids are stored in `<data dir>/eventsource/last_event_ids.json` unless a
/// path is given. Writes from one process are serialized; concurrent
/// writers in different processes may lose updates.
///
/// # Example
///
/// ```ignore
/// use eventsource::adapters::FileLastEventIdStore;
/// use eventsource::traits::LastEventIdStore;
///
/// let store = FileLastEventIdStore::new()?;
/// store.save("eventsource.lastEventId.https.example.com.443./events", "42").await?;
/// ```
#[derive(Debug, Clone)]
pub struct FileLastEventIdStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileLastEventIdStore {
    /// Create a store in the platform data directory.
    ///
    /// # Returns
    /// The store, or an error if the data directory cannot be determined.
    pub fn new() -> Result<Self, StoreError> {
        let dir = dirs::data_dir().ok_or_else(|| {
            StoreError::Other("Failed to determine data directory".to_string())
        })?;
        Ok(Self::with_path(dir.join(APP_DIR).join(FILE_NAME)))
    }

    /// Create a store backed by the file at `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the path to the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` against the store file on the blocking pool, holding the
    /// in-process write lock.
    async fn with_file<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.path.clone();
        let lock = self.lock.clone();

        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            op(&path)
        })
        .await
        .map_err(|e| StoreError::Other(format!("Store task failed: {}", e)))?
    }
}

fn read_file(path: &Path) -> Result<IdFile, StoreError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(IdFile::default()),
        Err(e) => return Err(StoreError::LoadFailed(e.to_string())),
    };

    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn write_file(path: &Path, contents: &IdFile) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| StoreError::SaveFailed(e.to_string()))?;
        }
    }

    let file = File::create(path).map_err(|e| StoreError::SaveFailed(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, contents)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    writer
        .flush()
        .map_err(|e| StoreError::SaveFailed(e.to_string()))
}

#[async_trait]
impl LastEventIdStore for FileLastEventIdStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.with_file(move |path| Ok(read_file(path)?.ids.get(&key).cloned()))
            .await
    }

    async fn save(&self, key: &str, id: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let id = id.to_string();
        self.with_file(move |path| {
            // A corrupt file is replaced rather than blocking persistence forever.
            let mut contents = match read_file(path) {
                Err(StoreError::Serialization(_)) => IdFile::default(),
                other => other?,
            };
            contents.ids.insert(key, id);
            write_file(path, &contents)
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_file(move |path| {
            let mut contents = match read_file(path) {
                Ok(contents) => contents,
                Err(StoreError::Serialization(_)) => IdFile::default(),
                Err(e) => return Err(StoreError::RemoveFailed(e.to_string())),
            };
            if contents.ids.remove(&key).is_none() {
                return Ok(());
            }
            write_file(path, &contents).map_err(|e| StoreError::RemoveFailed(e.to_string()))
        })
        .await
    }
}
