// SPDX-License-Identifier: Apache-2.0
//! Filesystem snapshot store behavior, through the snapshot service.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
use relay_records::{MemoryRecordSource, MutableRecordSource, Record, RecordSource, RecordState};
use relay_records_fs::FsSnapshotStore;
use relay_records_persist::{PersistConfig, PersistError, SnapshotService, SnapshotStore};

fn sample() -> MemoryRecordSource {
    let mut source = MemoryRecordSource::new();
    let mut user = Record::new("4", "User");
    user.set_value("name", "Alice");
    user.set_linked_record_ids("friends", vec![Some("5".into()), None]);
    source.set("4".into(), user);
    source.delete("5".into());
    source
}

#[test]
fn snapshot_survives_a_new_store_instance() {
    let dir = tempfile::tempdir().unwrap();
    let service = SnapshotService::new(FsSnapshotStore::with_base(dir.path()).unwrap());
    service.save("session", &sample()).unwrap();

    let reopened = SnapshotService::new(FsSnapshotStore::with_base(dir.path()).unwrap());
    let loaded = reopened.load("session").unwrap().unwrap();
    assert_eq!(loaded, sample());
    assert_eq!(loaded.status("5"), RecordState::Nonexistent);
    assert!(dir.path().join("session.json").is_file());
}

#[test]
fn missing_snapshot_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let service = SnapshotService::new(FsSnapshotStore::with_base(dir.path()).unwrap());
    assert!(service.load("nothing").unwrap().is_none());
}

#[test]
fn keys_lists_only_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSnapshotStore::with_base(dir.path()).unwrap();
    store.save_raw("b", b"{}").unwrap();
    store.save_raw("a", b"{}").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
    assert_eq!(store.keys().unwrap(), vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
fn remove_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSnapshotStore::with_base(dir.path()).unwrap();
    store.save_raw("a", b"{}").unwrap();
    store.remove_raw("a").unwrap();
    store.remove_raw("a").unwrap();
    assert!(matches!(store.load_raw("a"), Err(PersistError::NotFound)));
}

#[test]
fn path_escaping_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSnapshotStore::with_base(dir.path().join("nested")).unwrap();
    assert!(matches!(
        store.save_raw("../escape", b"{}"),
        Err(PersistError::InvalidKey(_))
    ));
    assert!(!dir.path().join("escape.json").exists());
}

#[test]
fn config_base_dir_is_honored() {
    let dir = tempfile::tempdir().unwrap();
    let config = PersistConfig {
        pretty: false,
        base_dir: Some(dir.path().join("cache")),
        ..PersistConfig::default()
    };
    let store = FsSnapshotStore::from_config(&config).unwrap();
    assert_eq!(store.base(), dir.path().join("cache").as_path());
    let service = SnapshotService::with_config(store, config);
    service.save("s", &sample()).unwrap();
    let raw = std::fs::read_to_string(dir.path().join("cache").join("s.json")).unwrap();
    assert!(!raw.contains('\n'));
    assert_eq!(
        MemoryRecordSource::from_json(serde_json::from_str(&raw).unwrap()).len(),
        2
    );
}
