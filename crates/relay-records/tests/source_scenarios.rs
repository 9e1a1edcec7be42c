// SPDX-License-Identifier: Apache-2.0
//! End-to-end scenarios for record sources, driven through the traits.

#![allow(missing_docs)]
use relay_records::{
    generate_client_id, DataId, FieldValue, MemoryRecordSource, MutableRecordSource, Record,
    RecordLookup, RecordSource, RecordState, ROOT_ID, ROOT_TYPE,
};
use serde_json::json;

// =============================================================================
// Lifecycle of one id
// =============================================================================

#[test]
fn user_lifecycle_scenario() {
    let mut source = MemoryRecordSource::from_json(json!({}));
    let object = json!({"id": "1", "__typename": "User", "name": "Alice"});
    let record = Record::from_json(object.clone())
        .unwrap_or_else(|err| unreachable!("any object is a record: {err}"));
    source.set("1".into(), record);

    let stored = source.get("1").record();
    assert_eq!(
        stored.and_then(|r| r.field("name")),
        Some(&FieldValue::from("Alice"))
    );
    assert_eq!(source.to_json(), json!({"1": object}));

    source.delete("1".into());
    assert_eq!(source.status("1"), RecordState::Nonexistent);

    source.remove("1");
    assert_eq!(source.status("1"), RecordState::Unknown);
    assert_eq!(source.get("1"), RecordLookup::Unknown);
}

// =============================================================================
// Independence of sources built from one snapshot
// =============================================================================

#[test]
fn sources_from_same_snapshot_are_independent() {
    let snapshot = json!({
        "1": {"__id": "1", "__typename": "User", "name": "Alice"},
        "2": null,
    });
    let mut a = MemoryRecordSource::from_json(snapshot.clone());
    let b = MemoryRecordSource::from_json(snapshot);

    a.set("3".into(), Record::new("3", "User"));
    let mut renamed = Record::new("1", "User");
    renamed.set_value("name", "Bob");
    a.set("1".into(), renamed);

    assert_eq!(b.record_ids(), vec![DataId::from("1"), DataId::from("2")]);
    assert_eq!(
        b.get("1").record().and_then(|r| r.field("name")),
        Some(&FieldValue::from("Alice"))
    );
    assert_eq!(b.status("3"), RecordState::Unknown);
}

#[test]
fn cloned_source_does_not_observe_record_edits() {
    let mut original = MemoryRecordSource::new();
    original.set("1".into(), Record::new("1", "User"));
    let snapshot = original.clone();

    let mut edited = original
        .get("1")
        .record()
        .cloned()
        .unwrap_or_else(|| unreachable!("record was just stored"));
    edited.set_value("name", "Alice");
    original.set("1".into(), edited);

    assert!(snapshot.get("1").record().is_some_and(Record::is_empty));
    assert_ne!(snapshot, original);
}

// =============================================================================
// Trait objects
// =============================================================================

fn write_root(source: &mut dyn MutableRecordSource, viewer: &str) {
    let mut root = Record::new(ROOT_ID, ROOT_TYPE);
    root.set_linked_record_id("viewer", viewer);
    source.set(ROOT_ID.into(), root);
    source.set(viewer.into(), Record::new(viewer, "User"));
}

fn follow_viewer(source: &dyn RecordSource) -> Option<RecordState> {
    let root = source.get(ROOT_ID).record()?;
    let Ok(Some(Some(viewer))) = root.linked_record_id("viewer") else {
        return None;
    };
    Some(source.status(viewer.as_str()))
}

#[test]
fn links_resolve_through_trait_objects() {
    let mut source = MemoryRecordSource::new();
    write_root(&mut source, "4");
    assert_eq!(follow_viewer(&source), Some(RecordState::Existent));
    source.delete("4".into());
    assert_eq!(follow_viewer(&source), Some(RecordState::Nonexistent));
    source.remove("4");
    assert_eq!(follow_viewer(&source), Some(RecordState::Unknown));
}

// =============================================================================
// Client records nested under a parent
// =============================================================================

#[test]
fn client_records_round_trip() {
    let mut source = MemoryRecordSource::new();
    let mut user = Record::new("4", "User");
    let address_id = generate_client_id("4", "address", None);
    user.set_linked_record_id("address", address_id.clone());
    let mut address = Record::new(address_id.clone(), "Address");
    address.set_value("city", "Lisbon");
    source.set("4".into(), user);
    source.set(address_id, address);

    let snapshot = source.to_json();
    assert_eq!(
        snapshot,
        json!({
            "4": {"__id": "4", "__typename": "User", "address": {"__ref": "client:4:address"}},
            "client:4:address": {"__id": "client:4:address", "__typename": "Address", "city": "Lisbon"},
        })
    );
    assert_eq!(MemoryRecordSource::from_json(snapshot), source);
}

// =============================================================================
// Sharing across threads
// =============================================================================

#[test]
fn source_can_move_behind_a_mutex() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MemoryRecordSource>();
    assert_send_sync::<Record>();

    let shared = std::sync::Arc::new(std::sync::Mutex::new(MemoryRecordSource::new()));
    let writer = {
        let shared = std::sync::Arc::clone(&shared);
        std::thread::spawn(move || {
            let mut source = shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            source.set(ROOT_ID.into(), Record::new(ROOT_ID, ROOT_TYPE));
        })
    };
    writer.join().unwrap_or_else(|_| unreachable!("writer thread panicked"));

    let source = shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    assert_eq!(source.status(ROOT_ID), RecordState::Existent);
}
