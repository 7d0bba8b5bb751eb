use std::{
    collections::HashMap,
    io::ErrorKind,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};

use crate::error::StorageError;

const EVENT_CAPACITY: usize = 64;

/// A string key/value store.
///
/// Implementations only persist; change notification is handled by
/// [`StorageArea`] so every backend behaves the same for subscribers.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Returns whether the key was present.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

/// In-process storage, gone when the process exits.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.lock().await.remove(key).is_some())
    }
}

/// Durable storage: one JSON object in a file, rewritten on every change.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("spotlyze/cache/storage.json");
        path
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match async_fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.write_all(&entries).await?;
        Ok(true)
    }
}

/// Identifies one client context sharing a [`StorageArea`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ContextId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub struct StorageEvent {
    pub key: String,
    pub origin: ContextId,
}

/// A storage backend shared by several contexts, plus the channel that tells
/// each of them about writes made by the others.
#[derive(Clone)]
pub struct StorageArea {
    backend: Arc<dyn Storage>,
    events: broadcast::Sender<StorageEvent>,
}

impl StorageArea {
    pub fn new(backend: Arc<dyn Storage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { backend, events }
    }

    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn file(path: PathBuf) -> Self {
        Self::new(Arc::new(FileStorage::new(path)))
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.backend.get(key).await
    }

    pub async fn set(&self, origin: ContextId, key: &str, value: &str) -> Result<(), StorageError> {
        self.backend.set(key, value).await?;
        self.publish(origin, key);
        Ok(())
    }

    pub async fn remove(&self, origin: ContextId, key: &str) -> Result<bool, StorageError> {
        let removed = self.backend.remove(key).await?;
        if removed {
            self.publish(origin, key);
        }
        Ok(removed)
    }

    /// Removes several keys as one change: subscribers see a single event,
    /// carrying the first removed key, or none if nothing was stored.
    pub async fn remove_all(&self, origin: ContextId, keys: &[&str]) -> Result<bool, StorageError> {
        let mut first_removed = None;
        for key in keys {
            if self.backend.remove(key).await? && first_removed.is_none() {
                first_removed = Some(*key);
            }
        }

        match first_removed {
            Some(key) => {
                self.publish(origin, key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }

    fn publish(&self, origin: ContextId, key: &str) {
        // no receivers is fine
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            origin,
        });
    }
}
