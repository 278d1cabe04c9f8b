//! Stream and category listings

use crate::common::{event, metadata, TestStore};
use eventfile::{EventStore, FieldType, MetadataMatcher, Operator, Stream, StreamName, Value};

fn seeded() -> TestStore {
    let test = TestStore::new();
    test.store
        .transactional(|s| {
            for (name, region) in [
                ("user-1", "eu"),
                ("user-2", "us"),
                ("order-1", "eu"),
                ("audit", "eu"),
            ] {
                s.create(
                    Stream::new(name, vec![event("Created", "n", 1, 1)])
                        .with_metadata(metadata([("region", Value::from(region))])),
                )?;
            }
            Ok(())
        })
        .unwrap();
    test
}

fn names(names: Vec<StreamName>) -> Vec<String> {
    names.into_iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_stream_names_sorted_and_paginated() {
    let test = seeded().reopen();
    let all = test.store.fetch_stream_names(None, None, 20, 0).unwrap();
    assert_eq!(names(all), vec!["audit", "order-1", "user-1", "user-2"]);

    let page = test.store.fetch_stream_names(None, None, 2, 1).unwrap();
    assert_eq!(names(page), vec!["order-1", "user-1"]);

    assert!(test
        .store
        .fetch_stream_names(None, None, 1, 10)
        .unwrap()
        .is_empty());
    assert!(test
        .store
        .fetch_stream_names(None, None, 0, 0)
        .unwrap_err()
        .is_out_of_range());
}

#[test]
fn test_stream_names_with_matcher() {
    let test = seeded();
    let matcher = MetadataMatcher::new()
        .with_metadata_match("region", Operator::Equals, Value::from("eu"), FieldType::Metadata)
        .unwrap();
    let found = test
        .store
        .fetch_stream_names_regex("^user-", Some(&matcher), 20, 0)
        .unwrap();
    assert_eq!(names(found), vec!["user-1"]);
}

#[test]
fn test_category_names() {
    let test = seeded();
    assert_eq!(
        test.store.fetch_category_names(None, 20, 0).unwrap(),
        vec!["order", "user"]
    );
    assert_eq!(
        test.store.fetch_category_names_regex("^us", 20, 0).unwrap(),
        vec!["user"]
    );
    assert!(test
        .store
        .fetch_category_names_regex("(", 20, 0)
        .unwrap_err()
        .is_invalid_argument());
}

#[test]
fn test_load_reverse_and_count() {
    let test = TestStore::new();
    test.store
        .create(Stream::new(
            "s",
            (1..=5).map(|n| event("Tick", "n", n as i64, n)).collect(),
        ))
        .unwrap();
    let test = test.reopen();

    let ticks: Vec<i64> = test
        .store
        .load_reverse(&StreamName::new("s"), Some(4), Some(2), None)
        .unwrap()
        .map(|m| m.payload()["n"].as_int().unwrap())
        .collect();
    assert_eq!(ticks, vec![4, 3]);

    let ticks: Vec<i64> = test
        .store
        .load(&StreamName::new("s"), 2, Some(2), None)
        .unwrap()
        .map(|m| m.payload()["n"].as_int().unwrap())
        .collect();
    assert_eq!(ticks, vec![2, 3]);
}
