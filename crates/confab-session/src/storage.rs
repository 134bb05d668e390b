//! Durable client-side state: the active thread id and the offline queue.
//!
//! Both records must survive a full restart and are read back on
//! `initialize()`. The store is the only component allowed to touch them.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use confab_types::{QueuedMessage, ThreadId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait SessionStore: Send + Sync {
    fn load_thread_id(&self) -> Result<Option<ThreadId>, StoreError>;
    fn save_thread_id(&self, thread_id: &ThreadId) -> Result<(), StoreError>;
    fn load_queue(&self) -> Result<Vec<QueuedMessage>, StoreError>;
    fn save_queue(&self, queue: &[QueuedMessage]) -> Result<(), StoreError>;
}

const THREAD_FILE: &str = "thread.json";
const QUEUE_FILE: &str = "queue.json";

/// File-backed store: one JSON document per record under a state directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        match fs::read_to_string(self.dir.join(name)) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        fs::write(self.dir.join(name), serde_json::to_vec_pretty(value)?)?;
        Ok(())
    }
}

impl SessionStore for JsonFileStore {
    fn load_thread_id(&self) -> Result<Option<ThreadId>, StoreError> {
        self.read(THREAD_FILE)
    }

    fn save_thread_id(&self, thread_id: &ThreadId) -> Result<(), StoreError> {
        self.write(THREAD_FILE, thread_id)
    }

    fn load_queue(&self) -> Result<Vec<QueuedMessage>, StoreError> {
        Ok(self.read(QUEUE_FILE)?.unwrap_or_default())
    }

    fn save_queue(&self, queue: &[QueuedMessage]) -> Result<(), StoreError> {
        self.write(QUEUE_FILE, &queue)
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    thread_id: Mutex<Option<ThreadId>>,
    queue: Mutex<Vec<QueuedMessage>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load_thread_id(&self) -> Result<Option<ThreadId>, StoreError> {
        Ok(lock(&self.thread_id).clone())
    }

    fn save_thread_id(&self, thread_id: &ThreadId) -> Result<(), StoreError> {
        *lock(&self.thread_id) = Some(thread_id.clone());
        Ok(())
    }

    fn load_queue(&self) -> Result<Vec<QueuedMessage>, StoreError> {
        Ok(lock(&self.queue).clone())
    }

    fn save_queue(&self, queue: &[QueuedMessage]) -> Result<(), StoreError> {
        *lock(&self.queue) = queue.to_vec();
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_read_as_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        assert!(store.load_thread_id().unwrap().is_none());
        assert!(store.load_queue().unwrap().is_empty());
    }

    #[test]
    fn test_state_survives_a_store_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileStore::new(dir.path()).unwrap();
            store.save_thread_id(&ThreadId::new("thread_42")).unwrap();
            store
                .save_queue(&[QueuedMessage::new(ThreadId::new("thread_42"), "later")])
                .unwrap();
        }

        let reopened = JsonFileStore::new(dir.path()).unwrap();
        assert_eq!(
            reopened.load_thread_id().unwrap(),
            Some(ThreadId::new("thread_42"))
        );
        let queue = reopened.load_queue().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].content, "later");
    }
}
