// SPDX-License-Identifier: Apache-2.0
//! In-memory record source.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{RecordError, SnapshotError};
use crate::ident::DataId;
use crate::record::{json_kind, Record};
use crate::state::RecordLookup;
use crate::{MutableRecordSource, RecordSource};

/// What is stored for a tracked id. Untracked ids are simply absent.
#[derive(Clone, PartialEq, Debug)]
enum Slot {
    Tombstone,
    Record(Record),
}

impl Slot {
    fn lookup(&self) -> RecordLookup<'_> {
        match self {
            Self::Tombstone => RecordLookup::Nonexistent,
            Self::Record(record) => RecordLookup::Existent(record),
        }
    }

    fn from_json(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Null => Ok(Self::Tombstone),
            other => Record::from_json(other).map(Self::Record),
        }
    }
}

/// A 32-byte BLAKE3 digest of a snapshot's canonical JSON rendering.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SnapshotDigest(pub [u8; 32]);

impl SnapshotDigest {
    /// View the digest as bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for SnapshotDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Record source holding every record in memory.
///
/// Ids are kept in a `BTreeMap`, so [`record_ids`](RecordSource::record_ids),
/// [`iter`](MemoryRecordSource::iter) and [`to_json`](RecordSource::to_json)
/// are deterministic (sorted by id).
///
/// # Existence Invariants
///
/// - An id absent from the map is `Unknown`.
/// - [`delete`](MutableRecordSource::delete) stores a tombstone; repeating it
///   changes nothing.
/// - [`remove`](MutableRecordSource::remove) and
///   [`clear`](MutableRecordSource::clear) are the only ways back to `Unknown`.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct MemoryRecordSource {
    records: BTreeMap<DataId, Slot>,
}

impl MemoryRecordSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hydrate from a snapshot (id → record object or `null`).
    ///
    /// Never fails. `null` entries become tombstones and every object becomes
    /// a record, whether or not it carries `__id` / `__typename`. Entries
    /// that are neither are skipped with a warning and stay `Unknown`; a
    /// snapshot that is not an object yields an empty source.
    pub fn from_json(snapshot: Value) -> Self {
        let Value::Object(entries) = snapshot else {
            warn!(
                kind = json_kind(&snapshot),
                "record snapshot is not an object, starting empty"
            );
            return Self::new();
        };
        let mut records = BTreeMap::new();
        let mut skipped = 0_usize;
        for (key, value) in entries {
            match Slot::from_json(value) {
                Ok(slot) => {
                    records.insert(DataId::from(key), slot);
                }
                Err(err) => {
                    skipped += 1;
                    warn!(id = %key, error = %err, "skipping malformed snapshot entry");
                }
            }
        }
        debug!(tracked = records.len(), skipped, "hydrated record source");
        Self { records }
    }

    /// Hydrate from a snapshot, rejecting the first malformed entry.
    pub fn try_from_json(snapshot: Value) -> Result<Self, SnapshotError> {
        let Value::Object(entries) = snapshot else {
            return Err(SnapshotError::NotAnObject);
        };
        let records = entries
            .into_iter()
            .map(|(key, value)| {
                let id = DataId::from(key);
                match Slot::from_json(value) {
                    Ok(slot) => Ok((id, slot)),
                    Err(source) => Err(SnapshotError::MalformedEntry { id, source }),
                }
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        debug!(tracked = records.len(), "hydrated record source (strict)");
        Ok(Self { records })
    }

    /// Iterate tracked ids with their lookups, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&DataId, RecordLookup<'_>)> {
        self.records.iter().map(|(id, slot)| (id, slot.lookup()))
    }

    /// Digest of the canonical snapshot: compact JSON with every object's
    /// keys sorted. Equal contents give equal digests regardless of the order
    /// in which they were written.
    pub fn snapshot_digest(&self) -> SnapshotDigest {
        let mut canonical = String::new();
        write_canonical(&self.to_json(), &mut canonical);
        SnapshotDigest(*blake3::hash(canonical.as_bytes()).as_bytes())
    }
}

/// Compact JSON with object keys sorted at every depth. Sorts explicitly so
/// the result does not depend on the map type behind `serde_json::Map`.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

impl RecordSource for MemoryRecordSource {
    fn get(&self, id: &str) -> RecordLookup<'_> {
        self.records
            .get(id)
            .map_or(RecordLookup::Unknown, Slot::lookup)
    }

    fn has(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    fn record_ids(&self) -> Vec<DataId> {
        self.records.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .records
            .iter()
            .map(|(id, slot)| {
                let value = match slot {
                    Slot::Tombstone => Value::Null,
                    Slot::Record(record) => record.to_json(),
                };
                (id.to_string(), value)
            })
            .collect();
        Value::Object(map)
    }
}

impl MutableRecordSource for MemoryRecordSource {
    fn set(&mut self, id: DataId, record: Record) {
        self.records.insert(id, Slot::Record(record));
    }

    fn delete(&mut self, id: DataId) {
        self.records.insert(id, Slot::Tombstone);
    }

    fn remove(&mut self, id: &str) {
        self.records.remove(id);
    }

    fn clear(&mut self) {
        debug!(dropped = self.records.len(), "clearing record source");
        self.records.clear();
    }
}

impl Serialize for MemoryRecordSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for (id, slot) in &self.records {
            map.serialize_entry(id, &slot.lookup().record())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MemoryRecordSource {
    /// Strict: a malformed entry fails deserialization.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from_json(value).map_err(D::Error::custom)
    }
}
