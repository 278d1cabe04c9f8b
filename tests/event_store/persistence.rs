//! Round-trip and file format

use crate::common::{event, metadata, TestStore};
use chrono::{DateTime, Utc};
use eventfile::{
    DomainEvent, EventRegistry, EventStore, FileEventStore, Message, Metadata, Stream,
    StreamName, Timestamp, Value,
};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UserRegistered {
    id: String,
}

impl DomainEvent for UserRegistered {
    const MESSAGE_NAME: &'static str = "UserRegistered";
}

#[test]
fn test_user_registered_survives_reopen() {
    let created_at: DateTime<Utc> = "2024-01-01T00:00:00.123456789Z".parse().unwrap();
    let original = UserRegistered { id: "u1".to_string() }
        .to_message()
        .unwrap()
        .with_created_at(Timestamp::from_datetime(created_at).unwrap());

    let test = TestStore::new();
    test.store
        .create(Stream::new("user-u1", vec![original.clone()]))
        .unwrap();
    let test = test.reopen();

    let loaded: Vec<Message> = test
        .store
        .load(&StreamName::new("user-u1"), 1, None, None)
        .unwrap()
        .collect();
    assert_eq!(loaded, vec![original]);
    assert_eq!(
        loaded[0].created_at().to_datetime().unwrap(),
        "2024-01-01T00:00:00.123456Z".parse::<DateTime<Utc>>().unwrap()
    );
    assert_eq!(
        loaded[0].payload_as::<UserRegistered>().unwrap(),
        UserRegistered { id: "u1".to_string() }
    );
}

#[test]
fn test_state_round_trips_after_mixed_operations() {
    let test = TestStore::new();
    let store = &test.store;
    store
        .create(
            Stream::new("order-1", vec![event("Placed", "total", 10, 1)])
                .with_metadata(metadata([("region", Value::from("eu"))])),
        )
        .unwrap();
    store
        .create(Stream::new("order-2", vec![event("Placed", "total", 2.5, 2)]))
        .unwrap();
    store
        .create(Stream::new("scratch", vec![event("Noise", "n", true, 3)]))
        .unwrap();
    store
        .append_to(
            &StreamName::new("order-1"),
            vec![
                event("Shipped", "carrier", "post", 4),
                event("Delivered", "signed", Value::Null, 5),
            ],
        )
        .unwrap();
    store
        .update_stream_metadata(
            &StreamName::new("order-2"),
            metadata([("tags", Value::from(vec![Value::from("gift")]))]),
        )
        .unwrap();
    store.delete(&StreamName::new("scratch")).unwrap();

    let before = test.store.snapshot();
    let test = test.reopen();
    assert_eq!(test.store.snapshot(), before);
    assert!(!test.store.has_stream(&StreamName::new("scratch")));
}

#[test]
fn test_file_layout() {
    let test = TestStore::new();
    test.store
        .create(Stream::new("user-1", vec![event("Ping", "n", 1, 1_000_000)]))
        .unwrap();

    let document: serde_json::Value = serde_json::from_slice(&test.file_bytes()).unwrap();
    let record = &document["events"]["user-1"][0];
    assert_eq!(record["created_at"], "1970-01-01 00:00:01.000000");
    assert_eq!(record["message_name"], "Ping");
    assert_eq!(record["payload"]["n"], 1);
    assert!(record["uuid"].is_string());
    assert!(document["event_streams"]["user-1"].is_object());
}

#[test]
fn test_typed_registry_rebuilds_known_events() {
    let test = TestStore::new();
    test.store
        .create(Stream::new(
            "user-u1",
            vec![UserRegistered { id: "u1".to_string() }.to_message().unwrap()],
        ))
        .unwrap();
    let path = test.path();
    drop(test.store);

    let store = FileEventStore::builder()
        .path(&path)
        .registry(EventRegistry::new().register_event::<UserRegistered>())
        .open()
        .unwrap();
    assert_eq!(store.snapshot().event_count(), 1);
}

#[test]
fn test_typed_registry_rejects_bad_payload() {
    let test = TestStore::new();
    test.store
        .create(Stream::new(
            "user-u1",
            vec![Message::new("UserRegistered", Metadata::new())],
        ))
        .unwrap();
    let path = test.path();
    drop(test.store);

    let err = FileEventStore::builder()
        .path(&path)
        .registry(EventRegistry::new().register_event::<UserRegistered>())
        .open()
        .unwrap_err();
    assert!(err.is_codec_error());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_payload_strings_round_trip(text in "\\PC{0,24}") {
        let test = TestStore::new();
        test.store
            .create(Stream::new("s", vec![event("Said", "text", text.as_str(), 7)]))
            .unwrap();
        let test = test.reopen();

        let loaded: Vec<Message> = test
            .store
            .load(&StreamName::new("s"), 1, None, None)
            .unwrap()
            .collect();
        prop_assert_eq!(loaded[0].payload()["text"].as_str(), Some(text.as_str()));
    }
}
