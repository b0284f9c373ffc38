//! Tests for snapshot persistence
//!
//! These tests verify:
//! - Namespace persist/load round trips
//! - Whole-table persist/load across namespaces
//! - Header, CRC and scope validation
//! - I/O failures surface as errors and change nothing
//! - Atomic replacement via temporary file
//! - Concurrent writers to the same path

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

use cachetable::config::SnapshotSync;
use cachetable::snapshot::{SnapshotReader, SnapshotScope, SnapshotWriter};
use cachetable::table::{TableKind, TableMeta};
use cachetable::{CacheError, CacheStore, Config, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_snapshot() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cache.ctab");
    (temp_dir, path)
}

/// Populate `ns` with k1..kN -> v1..vN
fn populate(store: &CacheStore, ns: &str, count: usize) {
    for i in 1..=count {
        store
            .set(ns, format!("k{}", i), format!("v{}", i))
            .unwrap();
    }
}

fn flip_byte(path: &Path, offset: u64) {
    let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    let mut bytes = fs::read(path).unwrap();
    bytes[offset as usize] ^= 0xFF;
    file.seek(SeekFrom::Start(0)).unwrap();
    file.write_all(&bytes).unwrap();
}

// =============================================================================
// Namespace Snapshot Tests
// =============================================================================

#[test]
fn test_persist_clear_load_roundtrip() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();
    populate(&store, "users", 5);

    assert_eq!(store.persist("users", &path).unwrap(), 5);
    store.clear("users").unwrap();
    assert_eq!(store.size("users").unwrap(), 0);

    assert_eq!(store.load("users", &path).unwrap(), 5);

    assert_eq!(store.size("users").unwrap(), 5);
    for i in 1..=5 {
        assert_eq!(
            store.get("users", format!("k{}", i)).unwrap(),
            Some(Value::from(format!("v{}", i)))
        );
    }
}

#[test]
fn test_persist_only_includes_namespace() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();
    populate(&store, "users", 3);
    populate(&store, "sessions", 4);

    assert_eq!(store.persist("users", &path).unwrap(), 3);

    let fresh = CacheStore::default();
    fresh.load("users", &path).unwrap();
    assert_eq!(fresh.size("users").unwrap(), 3);
    assert_eq!(fresh.size("sessions").unwrap(), 0);
}

#[test]
fn test_load_into_different_namespace() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();
    populate(&store, "users", 2);

    store.persist("users", &path).unwrap();
    store.load("users_backup", &path).unwrap();

    assert_eq!(store.size("users_backup").unwrap(), 2);
    assert_eq!(
        store.get("users_backup", "k1").unwrap(),
        Some(Value::from("v1"))
    );
}

#[test]
fn test_load_merges_into_existing_entries() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();
    store.set("users", "k1", "saved").unwrap();
    store.persist("users", &path).unwrap();

    store.set("users", "k1", "changed").unwrap();
    store.set("users", "extra", "kept").unwrap();
    store.load("users", &path).unwrap();

    assert_eq!(store.get("users", "k1").unwrap(), Some(Value::from("saved")));
    assert_eq!(store.get("users", "extra").unwrap(), Some(Value::from("kept")));
}

#[test]
fn test_persist_empty_namespace() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();

    assert_eq!(store.persist("nothing", &path).unwrap(), 0);
    assert_eq!(store.load("nothing", &path).unwrap(), 0);
    assert!(store.is_empty("nothing").unwrap());
}

#[test]
fn test_persist_preserves_value_types() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();

    let entries = vec![
        (Value::Int(1), Value::Float(2.5)),
        (Value::symbol("flag"), Value::Bool(true)),
        (Value::Bytes(vec![0, 1, 2]), Value::Nil),
        (
            Value::List(vec![Value::from("a"), Value::Int(-1)]),
            Value::List(vec![]),
        ),
    ];
    for (k, v) in &entries {
        store.set("typed", k, v).unwrap();
    }

    store.persist("typed", &path).unwrap();
    store.clear("typed").unwrap();
    store.load("typed", &path).unwrap();

    for (k, v) in &entries {
        assert_eq!(store.get("typed", k).unwrap().as_ref(), Some(v));
    }
}

#[test]
fn test_persist_overwrites_previous_snapshot() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();

    populate(&store, "users", 5);
    store.persist("users", &path).unwrap();

    store.clear("users").unwrap();
    populate(&store, "users", 2);
    store.persist("users", &path).unwrap();

    let fresh = CacheStore::default();
    assert_eq!(fresh.load("users", &path).unwrap(), 2);
}

#[test]
fn test_persist_leaves_no_temp_file() {
    let (temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();
    populate(&store, "users", 3);

    store.persist("users", &path).unwrap();

    let names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("cache.ctab")]);
}

#[test]
fn test_abandoned_writer_leaves_no_temp_file() {
    let (temp, path) = setup_temp_snapshot();

    let mut writer = SnapshotWriter::create(
        &path,
        TableMeta::SHARED,
        SnapshotScope::Namespace,
        SnapshotSync::Never,
    )
    .unwrap();
    writer.append(&(Value::Int(1), Value::Int(1))).unwrap();
    drop(writer);

    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    assert!(!path.exists());
}

#[test]
fn test_concurrent_persists_to_same_path() {
    let (temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();
    populate(&store, "users", 2000);

    let num_threads = 4;
    let rounds = 20;

    for _ in 0..rounds {
        let barrier = Arc::new(Barrier::new(num_threads));
        let handles: Vec<_> = (0..num_threads)
            .map(|_| {
                let store = store.clone();
                let path = path.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.persist("users", &path)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 2000);
        }

        let fresh = CacheStore::default();
        assert_eq!(fresh.load("users", &path).unwrap(), 2000);
    }

    let names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("cache.ctab")]);
}

#[test]
fn test_persist_without_sync() {
    let (_temp, path) = setup_temp_snapshot();
    let config = Config::builder().snapshot_sync(SnapshotSync::Never).build();
    let store = CacheStore::open(config).unwrap();
    populate(&store, "users", 3);

    assert_eq!(store.persist("users", &path).unwrap(), 3);
    assert_eq!(CacheStore::default().load("users", &path).unwrap(), 3);
}

// =============================================================================
// Whole-Table Snapshot Tests
// =============================================================================

#[test]
fn test_persist_all_restores_each_namespace() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();
    populate(&store, "users", 3);
    populate(&store, "sessions", 2);
    store.increment("hits", "/").unwrap();

    assert_eq!(store.persist_all(&path).unwrap(), 6);

    let fresh = CacheStore::default();
    assert_eq!(fresh.load_all(&path).unwrap(), 6);

    assert_eq!(fresh.size("users").unwrap(), 3);
    assert_eq!(fresh.size("sessions").unwrap(), 2);
    assert_eq!(fresh.get("hits", "/").unwrap(), Some(Value::Int(1)));
    assert_eq!(
        fresh.get("sessions", "k2").unwrap(),
        Some(Value::from("v2"))
    );
}

#[test]
fn test_scope_mismatch_rejected() {
    let (temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();
    populate(&store, "users", 2);

    store.persist("users", &path).unwrap();
    let err = store.load_all(&path).unwrap_err();
    assert!(matches!(err, CacheError::SnapshotMismatch(_)));

    let raw_path = temp.path().join("all.ctab");
    store.persist_all(&raw_path).unwrap();
    let err = store.load("users", &raw_path).unwrap_err();
    assert!(matches!(err, CacheError::SnapshotMismatch(_)));
}

#[test]
fn test_load_all_rejects_namespace_over_length_limit() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();
    populate(&store, "short", 1);
    populate(&store, "much_longer_name", 1);
    store.persist_all(&path).unwrap();

    let config = Config::builder().max_namespace_len(8).build();
    let strict = CacheStore::open(config).unwrap();
    let err = strict.load_all(&path).unwrap_err();

    assert!(matches!(err, CacheError::SnapshotMismatch(_)));
    assert_eq!(strict.total_size(), 0);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_load_missing_file() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();

    match store.load("users", &path) {
        Err(CacheError::Io(e)) => assert_eq!(e.kind(), ErrorKind::NotFound),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_persist_into_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("no_such_dir").join("cache.ctab");
    let store = CacheStore::default();
    populate(&store, "users", 1);

    let err = store.persist("users", &path).unwrap_err();

    assert!(matches!(err, CacheError::Io(_)));
    assert!(!err.is_usage());
    assert!(!path.exists());
}

#[test]
fn test_corrupted_data_rejected_without_partial_load() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();
    populate(&store, "users", 5);
    store.persist("users", &path).unwrap();
    store.clear("users").unwrap();

    // First byte of the data block
    flip_byte(&path, 17);

    let err = store.load("users", &path).unwrap_err();
    assert!(matches!(err, CacheError::SnapshotCorruption(_)));
    assert_eq!(store.size("users").unwrap(), 0);
}

#[test]
fn test_bad_magic_rejected() {
    let (_temp, path) = setup_temp_snapshot();
    let store = CacheStore::default();
    populate(&store, "users", 1);
    store.persist("users", &path).unwrap();

    flip_byte(&path, 0);

    let err = store.load("users", &path).unwrap_err();
    assert!(matches!(err, CacheError::SnapshotCorruption(_)));
}

#[test]
fn test_truncated_file_rejected() {
    let (_temp, path) = setup_temp_snapshot();
    fs::write(&path, b"CTAB").unwrap();

    let err = CacheStore::default().load("users", &path).unwrap_err();

    assert!(matches!(err, CacheError::SnapshotCorruption(_)));
}

#[test]
fn test_table_meta_mismatch_rejected() {
    let (_temp, path) = setup_temp_snapshot();
    let ordered = TableMeta {
        kind: TableKind::OrderedSet,
        key_position: 1,
    };

    let mut writer =
        SnapshotWriter::create(&path, ordered, SnapshotScope::Namespace, SnapshotSync::Always)
            .unwrap();
    writer.append(&(Value::from("k"), Value::from("v"))).unwrap();
    writer.finish().unwrap();

    let err = CacheStore::default().load("users", &path).unwrap_err();
    assert!(matches!(err, CacheError::SnapshotMismatch(_)));
}

// =============================================================================
// Writer / Reader Tests
// =============================================================================

#[test]
fn test_writer_reader_roundtrip() {
    let (_temp, path) = setup_temp_snapshot();

    let mut writer = SnapshotWriter::create(
        &path,
        TableMeta::SHARED,
        SnapshotScope::Namespace,
        SnapshotSync::Always,
    )
    .unwrap();
    for i in 0..10 {
        writer.append(&(Value::Int(i), Value::Int(i * i))).unwrap();
    }
    let info = writer.finish().unwrap();

    assert_eq!(info.entry_count, 10);
    assert_eq!(info.path, path);
    assert_eq!(info.file_size, fs::metadata(&path).unwrap().len());

    let reader = SnapshotReader::open(&path).unwrap();
    assert_eq!(reader.meta(), TableMeta::SHARED);
    assert_eq!(reader.scope(), SnapshotScope::Namespace);
    assert_eq!(reader.entry_count(), 10);
    reader
        .check(TableMeta::SHARED, SnapshotScope::Namespace)
        .unwrap();

    let records: Vec<(Value, Value)> = reader.records().unwrap();
    assert_eq!(records.len(), 10);
    assert_eq!(records[3], (Value::Int(3), Value::Int(9)));
}

#[test]
fn test_reader_detects_wrong_entry_count() {
    let (_temp, path) = setup_temp_snapshot();

    let mut writer = SnapshotWriter::create(
        &path,
        TableMeta::SHARED,
        SnapshotScope::Namespace,
        SnapshotSync::Never,
    )
    .unwrap();
    writer.append(&(Value::Int(1), Value::Int(1))).unwrap();
    writer.finish().unwrap();

    // Entry count lives at offset 9 in the header (not covered by the CRC)
    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(9)).unwrap();
    file.write_all(&5u64.to_le_bytes()).unwrap();
    drop(file);

    let reader = SnapshotReader::open(&path).unwrap();
    let err = reader.records::<(Value, Value)>().unwrap_err();
    assert!(matches!(err, CacheError::SnapshotCorruption(_)));
}
