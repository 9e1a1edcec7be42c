// SPDX-License-Identifier: Apache-2.0
//! Identifier and storage-key utilities.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record key holding the record's own [`DataId`].
pub const ID_KEY: &str = "__id";
/// Record key holding the record's type discriminator.
pub const TYPENAME_KEY: &str = "__typename";
/// Object key marking a singular link (`{"__ref": "<id>"}`).
pub const REF_KEY: &str = "__ref";
/// Object key marking a plural link (`{"__refs": [...]}`).
pub const REFS_KEY: &str = "__refs";
/// Record key holding the invalidation epoch.
pub const INVALIDATED_AT_KEY: &str = "__invalidated_at";

/// Id of the singleton root record that query roots hang off.
pub const ROOT_ID: &str = "client:root";
/// Type of the root record.
pub const ROOT_TYPE: &str = "__Root";
/// Prefix shared by every client-generated id.
pub const CLIENT_ID_PREFIX: &str = "client:";

/// Opaque identifier of one logical entity in the record graph.
///
/// Uniqueness across entity types is the caller's responsibility; the store
/// never inspects the shape or provenance of an id.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataId(String);

impl DataId {
    /// Wraps an id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DataId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DataId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DataId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for DataId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&String> for DataId {
    fn from(id: &String) -> Self {
        Self(id.clone())
    }
}

impl PartialEq<str> for DataId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for DataId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Returns `true` if `id` was generated on the client.
pub fn is_client_id(id: &str) -> bool {
    id.starts_with(CLIENT_ID_PREFIX)
}

/// Derives a stable client id for a record nested under `parent` at
/// `storage_key` (and `index`, for items of a plural field).
///
/// The result is always client-prefixed; a parent that is already a client
/// id is not prefixed twice.
pub fn generate_client_id(parent: &str, storage_key: &str, index: Option<usize>) -> DataId {
    let mut key = format!("{parent}:{storage_key}");
    if let Some(index) = index {
        key.push(':');
        key.push_str(&index.to_string());
    }
    if !is_client_id(&key) {
        key.insert_str(0, CLIENT_ID_PREFIX);
    }
    DataId(key)
}

static LOCAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates a fresh `client:local:<n>` id, unique within the process.
pub fn generate_unique_client_id() -> DataId {
    let n = LOCAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    DataId(format!("{CLIENT_ID_PREFIX}local:{n}"))
}

/// Builds the storage key for field `name` called with `args`.
///
/// Null arguments are dropped. With no remaining arguments the key is the
/// bare field name; otherwise `name(a:<json>,b:<json>)` with argument names
/// in sorted order and values rendered as compact JSON (object keys sorted).
pub fn format_storage_key(name: &str, args: &BTreeMap<String, Value>) -> String {
    let rendered: Vec<String> = args
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(arg, value)| format!("{arg}:{value}"))
        .collect();
    if rendered.is_empty() {
        name.to_owned()
    } else {
        format!("{name}({})", rendered.join(","))
    }
}
