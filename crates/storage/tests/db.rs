//! Integration tests for the RocksDB wrapper

use tempfile::TempDir;
use tessera_storage::{Database, DatabaseConfig};

fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        path: temp_dir.path().to_string_lossy().to_string(),
        ..Default::default()
    };
    let db = Database::open(config).unwrap();
    (db, temp_dir)
}

#[test]
fn test_open_database() {
    let (_db, _temp_dir) = create_test_db();
}

#[test]
fn test_put_get() {
    let (db, _temp_dir) = create_test_db();

    db.put(b"key1", b"value1").unwrap();
    let value = db.get(b"key1").unwrap();
    assert_eq!(value, Some(b"value1".to_vec()));
}

#[test]
fn test_delete() {
    let (db, _temp_dir) = create_test_db();

    db.put(b"key1", b"value1").unwrap();
    db.delete(b"key1").unwrap();
    assert_eq!(db.get(b"key1").unwrap(), None);
}

#[test]
fn test_exists() {
    let (db, _temp_dir) = create_test_db();

    db.put(b"key1", b"value1").unwrap();
    assert!(db.exists(b"key1").unwrap());
    assert!(!db.exists(b"key2").unwrap());
}

#[test]
fn test_put_sync_durable_read() {
    let (db, _temp_dir) = create_test_db();

    db.put_sync(b"version", b"v2").unwrap();
    assert_eq!(db.get(b"version").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn test_is_empty() {
    let (db, _temp_dir) = create_test_db();
    assert!(db.is_empty().unwrap());

    db.put(b"key1", b"value1").unwrap();
    assert!(!db.is_empty().unwrap());

    db.delete(b"key1").unwrap();
    assert!(db.is_empty().unwrap());
}

#[test]
fn test_iterator_ascending() {
    let (db, _temp_dir) = create_test_db();

    db.put(b"c", b"3").unwrap();
    db.put(b"a", b"1").unwrap();
    db.put(b"b", b"2").unwrap();

    let keys: Vec<_> = db
        .iterator()
        .map(|r| r.unwrap().0.to_vec())
        .collect();
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn test_prefix_iterator_bounded() {
    let (db, _temp_dir) = create_test_db();

    db.put(b"aa/1", b"1").unwrap();
    db.put(b"aa/2", b"2").unwrap();
    db.put(b"ab/1", b"3").unwrap();
    db.put(b"b/1", b"4").unwrap();

    let entries: Vec<_> = db
        .prefix_iterator(b"aa/")
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(&*entries[0].0, b"aa/1");
    assert_eq!(&*entries[1].0, b"aa/2");
}

#[test]
fn test_prefix_iterator_empty_prefix_scans_all() {
    let (db, _temp_dir) = create_test_db();

    db.put(b"x", b"1").unwrap();
    db.put(b"y", b"2").unwrap();

    let count = db.prefix_iterator(b"").count();
    assert_eq!(count, 2);
}

#[test]
fn test_reopen_preserves_data() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_string_lossy().to_string();

    {
        let db = Database::open_default(&path).unwrap();
        db.put(b"persisted", b"yes").unwrap();
        db.flush().unwrap();
    }

    let db = Database::open_default(&path).unwrap();
    assert_eq!(db.get(b"persisted").unwrap(), Some(b"yes".to_vec()));
}
