// SPDX-License-Identifier: Apache-2.0
//! Model-based checks: `MemoryRecordSource` against a plain map model.

#![allow(missing_docs)]
use std::collections::HashMap;

use proptest::prelude::*;
use relay_records::{
    FieldValue, MemoryRecordSource, MutableRecordSource, Record, RecordSource, RecordState,
};
use serde_json::{json, Value};

const IDS: u8 = 8;

#[derive(Debug, Clone)]
enum Op {
    Set(u8, String),
    Delete(u8),
    Remove(u8),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..IDS, "[a-z]{0,6}").prop_map(|(id, name)| Op::Set(id, name)),
        2 => (0..IDS).prop_map(Op::Delete),
        2 => (0..IDS).prop_map(Op::Remove),
        1 => Just(Op::Clear),
    ]
}

fn user(id: &str, name: &str) -> Record {
    let mut record = Record::new(id, "User");
    record.set_value("name", name);
    record
}

fn field_key() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z]{1,5}",
        1 => Just("__id".to_owned()),
        1 => Just("__typename".to_owned()),
        1 => Just("__ref".to_owned()),
        1 => Just("__refs".to_owned()),
        1 => Just("__invalidated_at".to_owned()),
    ]
}

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6..1.0e6_f64).prop_map(Value::from),
        "[a-z0-9:]{0,6}".prop_map(Value::from),
    ]
}

/// Arbitrary JSON, weighted towards values that look like links.
fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_key(), inner.clone(), 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
            "[a-z0-9]{0,4}".prop_map(|id| json!({"__ref": id})),
            prop::collection::vec(prop::option::of("[a-z0-9]{0,4}"), 0..4)
                .prop_map(|ids| json!({"__refs": ids})),
            inner.clone().prop_map(|other| json!({"__ref": other})),
            inner.prop_map(|other| json!({"__refs": [other]})),
            ("[a-z0-9]{1,4}", json_leaf()).prop_map(|(id, extra)| json!({"__ref": id, "x": extra})),
        ]
    })
}

/// Any object, with or without `__id` / `__typename`, or `null`.
fn snapshot() -> impl Strategy<Value = Value> {
    let entry = prop::option::of(
        prop::collection::btree_map(field_key(), json_value(), 0..5)
            .prop_map(|map| Value::Object(map.into_iter().collect())),
    );
    prop::collection::btree_map("[a-z0-9:]{1,6}", entry, 0..6).prop_map(|entries| {
        Value::Object(
            entries
                .into_iter()
                .map(|(id, entry)| (id, entry.unwrap_or(Value::Null)))
                .collect(),
        )
    })
}

/// `None` = tombstone, `Some(name)` = stored record.
type Model = HashMap<String, Option<String>>;

fn apply(source: &mut MemoryRecordSource, model: &mut Model, op: Op) {
    match op {
        Op::Set(id, name) => {
            let id = id.to_string();
            source.set(id.as_str().into(), user(&id, &name));
            model.insert(id, Some(name));
        }
        Op::Delete(id) => {
            let id = id.to_string();
            source.delete(id.as_str().into());
            model.insert(id, None);
        }
        Op::Remove(id) => {
            let id = id.to_string();
            source.remove(&id);
            model.remove(&id);
        }
        Op::Clear => {
            source.clear();
            model.clear();
        }
    }
}

proptest! {
    #[test]
    fn source_matches_model(ops in prop::collection::vec(op(), 0..64)) {
        let mut source = MemoryRecordSource::new();
        let mut model = Model::new();
        for op in ops {
            apply(&mut source, &mut model, op);
            prop_assert_eq!(source.len(), source.record_ids().len());
            prop_assert_eq!(source.len(), model.len());
        }

        for id in 0..IDS {
            let id = id.to_string();
            let expected = match model.get(&id) {
                None => RecordState::Unknown,
                Some(None) => RecordState::Nonexistent,
                Some(Some(_)) => RecordState::Existent,
            };
            prop_assert_eq!(source.status(&id), expected);
            prop_assert_eq!(source.has(&id), model.contains_key(&id));
            if let Some(Some(name)) = model.get(&id) {
                let record = source.get(&id).record();
                prop_assert!(record.is_some());
                let value = record.and_then(|r| r.field("name").cloned());
                prop_assert_eq!(value, Some(FieldValue::from(name.as_str())));
            } else {
                prop_assert!(source.get(&id).record().is_none());
            }
        }
    }

    #[test]
    fn snapshot_round_trips(ops in prop::collection::vec(op(), 0..64)) {
        let mut source = MemoryRecordSource::new();
        let mut model = Model::new();
        for op in ops {
            apply(&mut source, &mut model, op);
        }
        let snapshot = source.to_json();
        let hydrated = MemoryRecordSource::from_json(snapshot.clone());
        prop_assert_eq!(hydrated.to_json(), snapshot.clone());
        prop_assert_eq!(hydrated.snapshot_digest(), source.snapshot_digest());
        let strict = MemoryRecordSource::try_from_json(snapshot);
        prop_assert_eq!(strict.ok(), Some(hydrated));
    }

    #[test]
    fn any_object_snapshot_round_trips(snapshot in snapshot()) {
        let source = MemoryRecordSource::from_json(snapshot.clone());
        let Value::Object(entries) = &snapshot else {
            unreachable!("snapshot strategy yields objects");
        };
        prop_assert_eq!(source.len(), entries.len());
        for (id, entry) in entries {
            let expected = if entry.is_null() {
                RecordState::Nonexistent
            } else {
                RecordState::Existent
            };
            prop_assert_eq!(source.status(id), expected);
        }
        prop_assert_eq!(source.to_json(), snapshot.clone());
        prop_assert_eq!(serde_json::to_value(&source).ok(), Some(snapshot.clone()));

        let strict = MemoryRecordSource::try_from_json(snapshot);
        prop_assert_eq!(strict.ok(), Some(source));
    }
}
