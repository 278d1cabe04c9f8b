//! Commit atomicity, rollback and auto-wrapping

use crate::common::{event, TestStore};
use eventfile::{EventStore, Stream, StreamName, TransactionalEventStore, Value};

#[test]
fn test_failed_write_leaves_file_unchanged() {
    let test = TestStore::new();
    test.store
        .create(Stream::new("s", vec![event("A", "n", 1, 1)]))
        .unwrap();
    let before = test.file_bytes();

    // A directory at the staging path makes the temp file write fail
    let blocker = test.dir.path().join("store.json.tmp");
    std::fs::create_dir(&blocker).unwrap();
    std::fs::write(blocker.join("keep"), b"x").unwrap();

    test.store.begin_transaction().unwrap();
    test.store
        .append_to(&StreamName::new("s"), vec![event("B", "n", 2, 2)])
        .unwrap();
    let err = test.store.commit().unwrap_err();

    assert!(err.is_persistence());
    assert_eq!(test.file_bytes(), before);
    // Memory keeps the change and the transaction stays open
    assert!(test.store.in_transaction());
    assert_eq!(test.store.snapshot().event_count(), 2);

    std::fs::remove_dir_all(&blocker).unwrap();
    test.store.commit().unwrap();
    let test = test.reopen();
    assert_eq!(test.store.snapshot().event_count(), 2);
}

#[test]
fn test_non_representable_value_fails_commit() {
    let test = TestStore::new();
    let before = test.file_bytes();

    let err = test
        .store
        .create(Stream::new("s", vec![event("A", "ratio", f64::NAN, 1)]))
        .unwrap_err();

    assert!(err.is_persistence());
    assert_eq!(test.file_bytes(), before);
    assert!(!test.store.has_stream(&StreamName::new("s")));
}

#[test]
fn test_rollback_restores_prior_state() {
    let test = TestStore::new();
    let store = &test.store;
    store
        .create(Stream::new("keep", vec![event("A", "n", 1, 1)]))
        .unwrap();
    let before = store.snapshot();

    store.begin_transaction().unwrap();
    store
        .append_to(&StreamName::new("keep"), vec![event("B", "n", 2, 2)])
        .unwrap();
    store.create(Stream::new("new", vec![])).unwrap();
    store.delete(&StreamName::new("keep")).unwrap();
    store.save_projection_data("p", Value::from(1)).unwrap();
    store.rollback().unwrap();

    assert_eq!(store.snapshot(), before);
    assert!(store.fetch_projection_data("p").is_none());
    assert_eq!(
        store
            .load(&StreamName::new("keep"), 1, None, None)
            .unwrap()
            .count(),
        1
    );
}

#[test]
fn test_nested_begin_leaves_transaction_untouched() {
    let test = TestStore::new();
    test.store.begin_transaction().unwrap();
    test.store.create(Stream::new("pending", vec![])).unwrap();

    let err = test.store.begin_transaction().unwrap_err();
    assert!(err.is_invalid_state());

    test.store.commit().unwrap();
    let test = test.reopen();
    assert!(test.store.has_stream(&StreamName::new("pending")));
}

#[test]
fn test_auto_wrap_matches_explicit_transaction() {
    let auto = TestStore::new();
    auto.store
        .create(Stream::new("s", vec![event("A", "n", 1, 1)]))
        .unwrap();
    auto.store
        .append_to(&StreamName::new("s"), vec![event("B", "n", 2, 2)])
        .unwrap();

    let explicit = TestStore::new();
    explicit.store.begin_transaction().unwrap();
    explicit
        .store
        .create(Stream::new("s", vec![event("A", "n", 1, 1)]))
        .unwrap();
    explicit.store.commit().unwrap();
    explicit.store.begin_transaction().unwrap();
    explicit
        .store
        .append_to(&StreamName::new("s"), vec![event("B", "n", 2, 2)])
        .unwrap();
    explicit.store.commit().unwrap();

    let auto = auto.reopen();
    let explicit = explicit.reopen();
    let messages = |test: &TestStore| -> Vec<(String, i64)> {
        test.store
            .load(&StreamName::new("s"), 1, None, None)
            .unwrap()
            .map(|m| (m.message_name().to_string(), m.payload()["n"].as_int().unwrap()))
            .collect()
    };
    assert_eq!(messages(&auto), messages(&explicit));
    assert_eq!(messages(&auto), vec![("A".to_string(), 1), ("B".to_string(), 2)]);
}

#[test]
fn test_transactional_groups_writes_into_one_commit() {
    let test = TestStore::new();
    test.store
        .transactional(|s| {
            s.create(Stream::new("a", vec![]))?;
            s.create(Stream::new("b", vec![]))?;
            s.append_to(&StreamName::new("a"), vec![event("A", "n", 1, 1)])
        })
        .unwrap();

    let metrics = test.store.metrics();
    assert_eq!(metrics.total_started, 1);
    assert_eq!(metrics.total_committed, 1);
    assert!(!metrics.active);
}
