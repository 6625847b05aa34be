#[cfg(any(test, feature = "test-util"))]
use std::sync::{Arc, Mutex};

use serde_json::error::Category;
use thiserror::Error;

use crate::tasks::{Task, TaskError};

/// Errors produced by task storage implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Nothing has been persisted yet.
    #[error("task file not found: {location}")]
    NotFound { location: String },
    /// Stored bytes are not valid JSON.
    #[error("task file is not valid JSON: {reason}")]
    Corrupt { reason: String },
    /// Stored bytes are valid JSON but not a list of tasks.
    #[error("task file has an unexpected shape: {reason}")]
    Invalid { reason: String },
    /// Underlying read or write failure.
    #[error("storage failure: {reason}")]
    Io { reason: String },
}

impl From<StorageError> for TaskError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Corrupt { reason } => TaskError::CorruptStorage { reason },
            other => TaskError::StorageIo {
                reason: other.to_string(),
            },
        }
    }
}

/// Persistence contract for the whole task collection.
pub trait TaskStorage {
    /// Read the full collection.
    fn load(&self) -> Result<Vec<Task>, StorageError>;

    /// Replace the stored collection, rotating the previous copy into the backup first.
    fn save(&self, tasks: &[Task]) -> Result<(), StorageError>;

    /// Overwrite the stored collection with an empty one without touching the backup.
    fn reset(&self) -> Result<(), StorageError>;
}

/// Serialize a collection the way it is written to disk.
pub fn encode_tasks(tasks: &[Task]) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec_pretty(tasks).map_err(|e| StorageError::Io {
        reason: e.to_string(),
    })
}

/// Parse stored bytes, separating malformed JSON from well-formed JSON of the wrong shape.
pub fn decode_tasks(bytes: &[u8]) -> Result<Vec<Task>, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| {
        let reason = e.to_string();
        match e.classify() {
            Category::Syntax | Category::Eof => StorageError::Corrupt { reason },
            Category::Data => StorageError::Invalid { reason },
            Category::Io => StorageError::Io { reason },
        }
    })
}

#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
struct MemoryState {
    primary: Option<Vec<u8>>,
    backup: Option<Vec<u8>>,
    writes: usize,
    fail_writes: bool,
}

/// In-memory storage with the same backup semantics as the file store.
/// Clones share state, so tests can keep a handle after moving one into a store.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default, Clone)]
pub struct InMemoryTaskStorage {
    inner: Arc<Mutex<MemoryState>>,
}

#[cfg(any(test, feature = "test-util"))]
impl InMemoryTaskStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from raw stored bytes, as if a previous run had written them.
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        let storage = Self::new();
        if let Ok(mut state) = storage.inner.lock() {
            state.primary = Some(bytes.into());
        }
        storage
    }

    /// Number of successful writes (saves and resets).
    pub fn writes(&self) -> usize {
        self.state(|s| s.writes)
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.state(|s| s.primary.clone())
    }

    pub fn backup(&self) -> Option<Vec<u8>> {
        self.state(|s| s.backup.clone())
    }

    /// Replace the primary bytes without counting a write.
    pub fn corrupt_with(&self, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut state) = self.inner.lock() {
            state.primary = Some(bytes.into());
        }
    }

    /// Make every subsequent write fail with `StorageError::Io`.
    pub fn fail_writes(&self, fail: bool) {
        if let Ok(mut state) = self.inner.lock() {
            state.fail_writes = fail;
        }
    }

    fn state<T: Default>(&self, read: impl FnOnce(&MemoryState) -> T) -> T {
        self.inner.lock().map(|s| read(&s)).unwrap_or_default()
    }

    fn write(&self, bytes: Vec<u8>, rotate: bool) -> Result<(), StorageError> {
        let mut state = self.inner.lock().map_err(|err| StorageError::Io {
            reason: format!("lock poisoned: {err}"),
        })?;
        if state.fail_writes {
            return Err(StorageError::Io {
                reason: "simulated write failure".to_string(),
            });
        }
        if rotate {
            if let Some(previous) = state.primary.take() {
                state.backup = Some(previous);
            }
        }
        state.primary = Some(bytes);
        state.writes += 1;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-util"))]
impl TaskStorage for InMemoryTaskStorage {
    fn load(&self) -> Result<Vec<Task>, StorageError> {
        let state = self.inner.lock().map_err(|err| StorageError::Io {
            reason: format!("lock poisoned: {err}"),
        })?;
        let bytes = state.primary.as_ref().ok_or_else(|| StorageError::NotFound {
            location: "memory".to_string(),
        })?;
        decode_tasks(bytes)
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StorageError> {
        self.write(encode_tasks(tasks)?, true)
    }

    fn reset(&self) -> Result<(), StorageError> {
        self.write(encode_tasks(&[])?, false)
    }
}
