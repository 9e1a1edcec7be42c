// SPDX-License-Identifier: Apache-2.0
//! Filesystem-backed `SnapshotStore` (uses the platform data dir by default).

use directories::ProjectDirs;
use relay_records_persist::{validate_key, PersistConfig, PersistError, SnapshotStore};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSION: &str = "json";

/// Store snapshots as `<key>.json` files under one directory.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    base: PathBuf,
}

impl FsSnapshotStore {
    /// Create a store rooted at the user data directory (e.g.
    /// `~/.local/share/relay-records`).
    pub fn new() -> Result<Self, PersistError> {
        let proj = ProjectDirs::from("dev", "relay", "relay-records")
            .ok_or_else(|| PersistError::Other("could not resolve data dir".into()))?;
        Self::with_base(proj.data_dir())
    }

    /// Create a store rooted at `base`, creating the directory if needed.
    pub fn with_base(base: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Create a store from `config.base_dir`, falling back to the platform
    /// data directory.
    pub fn from_config(config: &PersistConfig) -> Result<Self, PersistError> {
        match &config.base_dir {
            Some(base) => Self::with_base(base.clone()),
            None => Self::new(),
        }
    }

    /// Directory holding the snapshot files.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistError> {
        validate_key(key)?;
        Ok(self.base.join(format!("{key}.{EXTENSION}")))
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, PersistError> {
        let path = self.path_for(key)?;
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(PersistError::NotFound),
            Err(err) => Err(PersistError::Io(err)),
        }
    }

    /// Writes to a sibling temp file and renames it into place, so readers
    /// never observe a half-written snapshot.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), PersistError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = data.len(), "wrote snapshot");
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<(), PersistError> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PersistError::Io(err)),
        }
    }

    fn keys(&self) -> Result<Vec<String>, PersistError> {
        let entries = match fs::read_dir(&self.base) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(PersistError::Io(err)),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
