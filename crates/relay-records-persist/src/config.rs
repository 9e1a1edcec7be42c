// SPDX-License-Identifier: Apache-2.0
//! Persistence configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::PersistError;

/// How snapshots are written and read back.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistConfig {
    /// Write indented JSON instead of compact JSON.
    pub pretty: bool,
    /// Reject snapshots with malformed entries instead of skipping them.
    pub strict: bool,
    /// Directory for filesystem stores; `None` uses the platform data dir.
    pub base_dir: Option<PathBuf>,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            strict: false,
            base_dir: None,
        }
    }
}

impl PersistConfig {
    /// Parse a JSON config document.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, PersistError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Read and parse the JSON config file at `path`.
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let bytes = std::fs::read(path)?;
        Self::from_json_slice(&bytes)
    }
}
