// SPDX-License-Identifier: Apache-2.0
//! Field values stored in a [`Record`](crate::Record).
//!
//! The JSON encoding is the persisted snapshot layout:
//!
//! | variant  | JSON                                   |
//! |----------|----------------------------------------|
//! | `Scalar` | `null`, `true`, `1`, `1.5`, `"text"`   |
//! | `Link`   | `{"__ref": "<id>"}`                    |
//! | `Links`  | `{"__refs": ["<id>", null, ...]}`      |
//! | `Nested` | any other object or array              |
//!
//! Decoding is total: every JSON value maps to exactly one variant, and
//! encoding a decoded value reproduces the input.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::ident::{DataId, REFS_KEY, REF_KEY};

/// A leaf JSON value.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number, kept in its original integer/float representation.
    Number(Number),
    /// JSON string.
    String(String),
}

impl Scalar {
    /// The string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number as `i64`, if it is an integer in range.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// The number as `u64`, if it is a non-negative integer in range.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// The number as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// `true` for [`Scalar::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn into_json(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Number(n) => Value::Number(n),
            Self::String(s) => Value::String(s),
        }
    }
}

/// The value of one record field.
#[derive(Clone, PartialEq, Debug)]
pub enum FieldValue {
    /// Leaf value.
    Scalar(Scalar),
    /// Reference to one other record.
    Link(DataId),
    /// References to a list of records; `None` entries are null items.
    Links(Vec<Option<DataId>>),
    /// Plain object or array without identity of its own.
    Nested(Value),
}

impl FieldValue {
    /// Shorthand for `FieldValue::Scalar(Scalar::Null)`.
    pub const NULL: Self = Self::Scalar(Scalar::Null);

    /// Decodes a snapshot value. Never fails.
    ///
    /// An object is a link only when `__ref` (or `__refs`) is its sole key and
    /// the payload has the link shape; anything else is kept as
    /// [`FieldValue::Nested`] so it re-encodes unchanged.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::NULL,
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Object(map) => match link_from_object(&map) {
                Some(link) => link,
                None => Self::Nested(Value::Object(map)),
            },
            array @ Value::Array(_) => Self::Nested(array),
        }
    }

    /// Encodes the value in snapshot form.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(scalar) => scalar.clone().into_json(),
            Self::Link(id) => {
                let mut map = Map::with_capacity(1);
                map.insert(REF_KEY.to_owned(), Value::String(id.to_string()));
                Value::Object(map)
            }
            Self::Links(ids) => {
                let items = ids
                    .iter()
                    .map(|id| id.as_ref().map_or(Value::Null, |id| Value::String(id.to_string())))
                    .collect();
                let mut map = Map::with_capacity(1);
                map.insert(REFS_KEY.to_owned(), Value::Array(items));
                Value::Object(map)
            }
            Self::Nested(value) => value.clone(),
        }
    }

    /// The scalar payload, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// `true` for a null scalar.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }

    /// `true` for singular and plural links.
    pub fn is_link(&self) -> bool {
        matches!(self, Self::Link(_) | Self::Links(_))
    }
}

fn link_from_object(map: &Map<String, Value>) -> Option<FieldValue> {
    if map.len() != 1 {
        return None;
    }
    if let Some(Value::String(id)) = map.get(REF_KEY) {
        return Some(FieldValue::Link(DataId::from(id)));
    }
    let Some(Value::Array(items)) = map.get(REFS_KEY) else {
        return None;
    };
    items
        .iter()
        .map(|item| match item {
            Value::Null => Some(None),
            Value::String(id) => Some(Some(DataId::from(id))),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(FieldValue::Links)
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(scalar) => scalar.serialize(serializer),
            Self::Link(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(REF_KEY, id)?;
                map.end()
            }
            Self::Links(ids) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(REFS_KEY, ids)?;
                map.end()
            }
            Self::Nested(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

impl From<Scalar> for FieldValue {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Scalar(Scalar::Number(n.into()))
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        Self::Scalar(Scalar::Number(n.into()))
    }
}

impl From<f64> for FieldValue {
    /// Non-finite floats have no JSON form and become null.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::NULL, |n| Self::Scalar(Scalar::Number(n)))
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::String(s.to_owned()))
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::String(s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_each_variant() {
        assert_eq!(FieldValue::from_json(json!(null)), FieldValue::NULL);
        assert_eq!(FieldValue::from_json(json!("Alice")), FieldValue::from("Alice"));
        assert_eq!(
            FieldValue::from_json(json!({"__ref": "4"})),
            FieldValue::Link(DataId::from("4"))
        );
        assert_eq!(
            FieldValue::from_json(json!({"__refs": ["4", null]})),
            FieldValue::Links(vec![Some(DataId::from("4")), None])
        );
        assert_eq!(
            FieldValue::from_json(json!({"lat": 1.5, "lng": 2})),
            FieldValue::Nested(json!({"lat": 1.5, "lng": 2}))
        );
        assert_eq!(
            FieldValue::from_json(json!([1, 2, 3])),
            FieldValue::Nested(json!([1, 2, 3]))
        );
    }

    #[test]
    fn link_lookalikes_stay_nested() {
        for value in [
            json!({"__ref": "4", "extra": true}),
            json!({"__ref": 4}),
            json!({"__refs": ["4", 5]}),
            json!({"__refs": "4"}),
        ] {
            let decoded = FieldValue::from_json(value.clone());
            assert!(!decoded.is_link(), "{value} decoded as link");
            assert_eq!(decoded.to_json(), value);
        }
    }

    #[test]
    fn integers_and_floats_keep_their_representation() {
        let int = FieldValue::from_json(json!(42));
        let float = FieldValue::from_json(json!(42.0));
        assert_eq!(serde_json::to_string(&int).unwrap(), "42");
        assert_eq!(serde_json::to_string(&float).unwrap(), "42.0");
        assert_eq!(int.as_scalar().and_then(Scalar::as_i64), Some(42));
    }

    #[test]
    fn serialize_matches_to_json() {
        let values = [
            FieldValue::NULL,
            FieldValue::from(true),
            FieldValue::Link(DataId::from("4")),
            FieldValue::Links(vec![None, Some(DataId::from("5"))]),
            FieldValue::Nested(json!({"a": [1, {"b": null}]})),
        ];
        for value in values {
            assert_eq!(serde_json::to_value(&value).unwrap(), value.to_json());
        }
    }

    #[test]
    fn non_finite_float_becomes_null() {
        assert!(FieldValue::from(f64::NAN).is_null());
        assert!(!FieldValue::from(0.5).is_null());
    }
}
