// SPDX-License-Identifier: Apache-2.0
//! Storage port for raw snapshot blobs, plus an in-memory implementation.

use std::cell::RefCell;
use std::collections::BTreeMap;

use relay_records::SnapshotError;
use thiserror::Error;

/// Storage port for raw snapshot blobs (keyed by logical name).
pub trait SnapshotStore {
    /// Load a raw snapshot blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, PersistError>;
    /// Persist a raw snapshot blob, replacing any previous one.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), PersistError>;
    /// Delete a blob. Deleting a missing key is not an error.
    fn remove_raw(&self, key: &str) -> Result<(), PersistError>;
    /// Keys of all stored blobs, sorted.
    fn keys(&self) -> Result<Vec<String>, PersistError>;
}

/// Error type for persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// Key cannot be used as a storage name.
    #[error("invalid snapshot key: {0:?}")]
    InvalidKey(String),
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Snapshot rejected by strict hydration.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Rejects keys that are empty or could escape a directory-backed store.
pub fn validate_key(key: &str) -> Result<(), PersistError> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\', '\0']);
    if bad {
        Err(PersistError::InvalidKey(key.to_owned()))
    } else {
        Ok(())
    }
}

/// Snapshot store that keeps blobs in memory.
///
/// Single-threaded, like the record sources it persists.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    blobs: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.borrow().len()
    }

    /// Returns `true` if no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.borrow().is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, PersistError> {
        validate_key(key)?;
        self.blobs
            .borrow()
            .get(key)
            .cloned()
            .ok_or(PersistError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), PersistError> {
        validate_key(key)?;
        self.blobs.borrow_mut().insert(key.to_owned(), data.to_vec());
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<(), PersistError> {
        validate_key(key)?;
        self.blobs.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, PersistError> {
        Ok(self.blobs.borrow().keys().cloned().collect())
    }
}
