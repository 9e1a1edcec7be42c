// SPDX-License-Identifier: Apache-2.0
//! Snapshot service: serializes record sources and delegates storage to a
//! [`SnapshotStore`].

use relay_records::{MemoryRecordSource, RecordSource};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::PersistConfig;
use crate::store::{PersistError, SnapshotStore};

/// Thin service that (de)serializes record sources for a `SnapshotStore`.
pub struct SnapshotService<S> {
    store: S,
    config: PersistConfig,
}

impl<S> SnapshotService<S> {
    /// Create a new service with the default config.
    pub fn new(store: S) -> Self {
        Self::with_config(store, PersistConfig::default())
    }

    /// Create a new service with an explicit config.
    pub fn with_config(store: S, config: PersistConfig) -> Self {
        Self { store, config }
    }

    /// The active config.
    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> SnapshotService<S>
where
    S: SnapshotStore,
{
    /// Load the snapshot stored under `key`. Returns `Ok(None)` if missing or
    /// empty.
    ///
    /// Strict configs fail on the first malformed entry; lenient configs skip
    /// such entries (they stay unknown).
    #[instrument(skip(self), fields(strict = self.config.strict))]
    pub fn load(&self, key: &str) -> Result<Option<MemoryRecordSource>, PersistError> {
        let bytes = match self.store.load_raw(key) {
            Ok(bytes) => bytes,
            Err(PersistError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        let snapshot: Value = serde_json::from_slice(&bytes)?;
        let source = if self.config.strict {
            MemoryRecordSource::try_from_json(snapshot)?
        } else {
            MemoryRecordSource::from_json(snapshot)
        };
        debug!(tracked = source.len(), "loaded snapshot");
        Ok(Some(source))
    }

    /// Serialize `source` and persist it under `key`.
    #[instrument(skip(self, source), fields(tracked = source.len()))]
    pub fn save(&self, key: &str, source: &dyn RecordSource) -> Result<(), PersistError> {
        let snapshot = source.to_json();
        let data = if self.config.pretty {
            serde_json::to_vec_pretty(&snapshot)?
        } else {
            serde_json::to_vec(&snapshot)?
        };
        self.store.save_raw(key, &data)
    }

    /// Delete the snapshot stored under `key`, if any.
    #[instrument(skip(self))]
    pub fn discard(&self, key: &str) -> Result<(), PersistError> {
        self.store.remove_raw(key)
    }

    /// Keys of all stored snapshots, sorted.
    pub fn keys(&self) -> Result<Vec<String>, PersistError> {
        self.store.keys()
    }
}
