// SPDX-License-Identifier: Apache-2.0
//! Flat records: one entity's currently known fields.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::RecordError;
use crate::ident::{is_client_id, DataId, ID_KEY, INVALIDATED_AT_KEY, TYPENAME_KEY};
use crate::value::{FieldValue, Scalar};

/// Materialised record for a single entity.
///
/// A record is flat: nested objects with their own identity are stored as
/// separate records and referenced through [`FieldValue::Link`] or
/// [`FieldValue::Links`].
///
/// Invariants
/// - String `__id` / `__typename` entries are held outside the field table.
///   Snapshot objects may lack either; a non-string one stays in the field
///   table verbatim so the object round-trips unchanged.
/// - No setter writes `__id` or `__typename`.
/// - The field table is copy-on-write. `clone` is O(1); the first mutation of
///   a record whose table is shared copies it, leaving other clones intact.
/// - Nothing checks that the id matches the key the record is stored under.
#[derive(Clone, PartialEq, Debug)]
pub struct Record {
    id: Option<DataId>,
    typename: Option<String>,
    fields: Arc<BTreeMap<String, FieldValue>>,
}

impl Record {
    /// Creates a record holding only its identity and type.
    pub fn new(id: impl Into<DataId>, typename: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            typename: Some(typename.into()),
            fields: Arc::new(BTreeMap::new()),
        }
    }

    /// The record's own id, if it carries one.
    pub fn data_id(&self) -> Option<&DataId> {
        self.id.as_ref()
    }

    /// The record's type discriminator, if it carries one.
    pub fn typename(&self) -> Option<&str> {
        self.typename.as_deref()
    }

    /// Number of fields, excluding identity and type.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` if the record has no fields besides identity and type.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in storage-key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Raw field access, regardless of kind.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// `true` if the two records share one field table.
    pub fn shares_fields_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }

    /// Reads a scalar or nested value.
    ///
    /// Returns `Ok(None)` when the field has never been written.
    pub fn value(&self, key: &str) -> Result<Option<&FieldValue>, RecordError> {
        match self.fields.get(key) {
            Some(FieldValue::Link(_) | FieldValue::Links(_)) => Err(RecordError::UnexpectedLink {
                key: key.to_owned(),
            }),
            other => Ok(other),
        }
    }

    /// Writes a field value.
    ///
    /// The identity keys (`__id`, `__typename`) are owned by the record and
    /// cannot be overwritten through any setter; such writes are dropped
    /// with a warning.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.write_field(key.into(), value.into());
    }

    /// Reads a singular link.
    ///
    /// `Ok(None)`: never written. `Ok(Some(None))`: explicitly null.
    /// `Ok(Some(Some(id)))`: linked record id.
    pub fn linked_record_id(&self, key: &str) -> Result<Option<Option<&DataId>>, RecordError> {
        match self.fields.get(key) {
            None => Ok(None),
            Some(FieldValue::Scalar(Scalar::Null)) => Ok(Some(None)),
            Some(FieldValue::Link(id)) => Ok(Some(Some(id))),
            Some(_) => Err(RecordError::NotALink {
                key: key.to_owned(),
            }),
        }
    }

    /// Writes a singular link.
    pub fn set_linked_record_id(&mut self, key: impl Into<String>, id: impl Into<DataId>) {
        self.write_field(key.into(), FieldValue::Link(id.into()));
    }

    /// Reads a plural link, with the same three outcomes as
    /// [`Record::linked_record_id`].
    pub fn linked_record_ids(
        &self,
        key: &str,
    ) -> Result<Option<Option<&[Option<DataId>]>>, RecordError> {
        match self.fields.get(key) {
            None => Ok(None),
            Some(FieldValue::Scalar(Scalar::Null)) => Ok(Some(None)),
            Some(FieldValue::Links(ids)) => Ok(Some(Some(ids.as_slice()))),
            Some(_) => Err(RecordError::NotAPluralLink {
                key: key.to_owned(),
            }),
        }
    }

    /// Writes a plural link. `None` items are null list entries.
    pub fn set_linked_record_ids(&mut self, key: impl Into<String>, ids: Vec<Option<DataId>>) {
        self.write_field(key.into(), FieldValue::Links(ids));
    }

    /// Epoch at which the record was last invalidated, if ever.
    pub fn invalidation_epoch(&self) -> Option<u64> {
        match self.fields.get(INVALIDATED_AT_KEY) {
            Some(FieldValue::Scalar(scalar)) => scalar.as_u64(),
            _ => None,
        }
    }

    /// Marks the record invalidated at `epoch`.
    pub fn set_invalidation_epoch(&mut self, epoch: u64) {
        self.write_field(INVALIDATED_AT_KEY.to_owned(), FieldValue::from(epoch));
    }

    /// Copies every field of `source` into `sink`, leaving the sink's id and
    /// type untouched.
    pub fn copy_fields(source: &Self, sink: &mut Self) {
        let mut copied = source
            .fields
            .iter()
            .filter(|(key, _)| !is_identity_key(key))
            .peekable();
        if copied.peek().is_none() {
            return;
        }
        let fields = sink.fields_mut();
        for (key, value) in copied {
            fields.insert(key.clone(), value.clone());
        }
    }

    /// Applies the fields of `next` on top of `prev`.
    ///
    /// Returns `prev` itself when `next` changes nothing, otherwise a new
    /// record. The ids must match; a type change is applied and logged.
    pub fn update<'a>(prev: &'a Self, next: &Self) -> Result<Cow<'a, Self>, RecordError> {
        ensure_same_id(prev, next)?;
        let mut updated: Option<Self> = None;
        if let Some(typename) = next.retyped_from(prev) {
            let mut record = prev.clone();
            record.set_typename(typename);
            updated = Some(record);
        }
        for (key, value) in next.fields.iter() {
            if is_identity_key(key) || prev.fields.get(key) == Some(value) {
                continue;
            }
            updated
                .get_or_insert_with(|| prev.clone())
                .fields_mut()
                .insert(key.clone(), value.clone());
        }
        Ok(updated.map_or(Cow::Borrowed(prev), Cow::Owned))
    }

    /// Returns a new record with the fields of `b` layered over `a`.
    ///
    /// Same id/type rules as [`Record::update`], but always allocates.
    pub fn merge(a: &Self, b: &Self) -> Result<Self, RecordError> {
        ensure_same_id(a, b)?;
        let mut merged = a.clone();
        if let Some(typename) = b.retyped_from(a) {
            merged.set_typename(typename);
        }
        Self::copy_fields(b, &mut merged);
        Ok(merged)
    }

    /// Renders the record in snapshot form.
    pub fn to_json(&self) -> Value {
        let mut map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        if let Some(id) = &self.id {
            map.insert(ID_KEY.to_owned(), Value::String(id.to_string()));
        }
        if let Some(typename) = &self.typename {
            map.insert(TYPENAME_KEY.to_owned(), Value::String(typename.clone()));
        }
        Value::Object(map)
    }

    /// Parses a record from snapshot form.
    ///
    /// Any object is accepted. String `__id` and `__typename` entries become
    /// the identity; every other entry becomes a field.
    pub fn from_json(value: Value) -> Result<Self, RecordError> {
        let Value::Object(mut map) = value else {
            return Err(RecordError::MalformedRecord(format!(
                "expected an object, got {}",
                json_kind(&value)
            )));
        };
        let id = take_string(&mut map, ID_KEY).map(DataId::from);
        let typename = take_string(&mut map, TYPENAME_KEY);
        let fields = map
            .into_iter()
            .map(|(key, value)| (key, FieldValue::from_json(value)))
            .collect();
        Ok(Self {
            id,
            typename,
            fields: Arc::new(fields),
        })
    }

    fn write_field(&mut self, key: String, value: FieldValue) {
        if is_identity_key(&key) {
            warn!(id = ?self.id, key = %key, "ignoring write to reserved record key");
            return;
        }
        self.fields_mut().insert(key, value);
    }

    /// The type `self` would impose when merged over `prev`, if it differs.
    fn retyped_from(&self, prev: &Self) -> Option<&str> {
        let next = self.typename.as_deref()?;
        if prev.typename.as_deref() == Some(next) {
            return None;
        }
        let client = self.id.as_ref().is_some_and(|id| is_client_id(id.as_str()));
        if prev.typename.is_some() && !client {
            warn!(
                id = ?prev.id,
                from = ?prev.typename,
                to = %next,
                "record type changed while merging"
            );
        }
        Some(next)
    }

    fn set_typename(&mut self, typename: &str) {
        if self.fields.contains_key(TYPENAME_KEY) {
            self.fields_mut().remove(TYPENAME_KEY);
        }
        self.typename = Some(typename.to_owned());
    }

    fn fields_mut(&mut self) -> &mut BTreeMap<String, FieldValue> {
        Arc::make_mut(&mut self.fields)
    }
}

fn is_identity_key(key: &str) -> bool {
    key == ID_KEY || key == TYPENAME_KEY
}

fn ensure_same_id(prev: &Record, next: &Record) -> Result<(), RecordError> {
    if prev.id == next.id {
        Ok(())
    } else {
        Err(RecordError::DataIdMismatch {
            expected: prev.id.clone(),
            found: next.id.clone(),
        })
    }
}

/// Removes `key` only when it holds a string.
fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    if !matches!(map.get(key), Some(Value::String(_))) {
        return None;
    }
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let identity = usize::from(self.id.is_some()) + usize::from(self.typename.is_some());
        let mut map = serializer.serialize_map(Some(self.fields.len() + identity))?;
        if let Some(id) = &self.id {
            map.serialize_entry(ID_KEY, id)?;
        }
        if let Some(typename) = &self.typename {
            map.serialize_entry(TYPENAME_KEY, typename)?;
        }
        for (key, value) in self.fields.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(D::Error::custom)
    }
}
