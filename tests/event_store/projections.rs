//! Projection manager over a file store

use crate::common::{event, TestStore};
use eventfile::{
    EventStore, FileEventStore, InMemoryProjectionManager, ProjectionOptions, ProjectionStatus,
    QueryOptions, ReadModel, ReadModelProjectionOptions, Result, Stream, Value,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn manager(test: TestStore) -> (InMemoryProjectionManager, Arc<FileEventStore>, tempfile::TempDir) {
    let TestStore { store, dir } = test;
    let store = Arc::new(store);
    let manager = InMemoryProjectionManager::new(Arc::clone(&store) as Arc<dyn EventStore>);
    (manager, store, dir)
}

#[test]
fn test_registration_is_first_write_wins() {
    let (manager, store, _dir) = manager(TestStore::new());
    store
        .create(Stream::new("user-1", vec![event("Ping", "n", 1, 1)]))
        .unwrap();

    let mut first = manager.create_projection("p1", ProjectionOptions::default());
    let mut second = manager.create_projection(
        "p1",
        ProjectionOptions::default()
            .with_cache_size(10)
            .with_sleep(Duration::from_millis(1)),
    );
    first
        .init(|| Value::from(serde_json::json!({"owner": "first"})))
        .unwrap()
        .from_all()
        .unwrap()
        .when_any(|_, _, _| Ok(()))
        .unwrap();
    second
        .init(|| Value::from(serde_json::json!({"owner": "second"})))
        .unwrap()
        .from_all()
        .unwrap()
        .when_any(|_, _, _| Ok(()))
        .unwrap();

    first.run(false).unwrap();
    second.reset().unwrap();

    assert_eq!(
        manager.fetch_projection_state("p1").unwrap().get("owner"),
        Some(&Value::from("first"))
    );
}

#[test]
fn test_projection_name_pagination() {
    let (manager, _store, _dir) = manager(TestStore::new());
    manager.create_projection("a", ProjectionOptions::default());
    manager.create_projection("b", ProjectionOptions::default());

    assert!(manager
        .fetch_projection_names(None, 0, 0)
        .unwrap_err()
        .is_out_of_range());
    assert!(manager
        .fetch_projection_names(None, 1, 5)
        .unwrap()
        .is_empty());
    assert_eq!(
        manager.fetch_projection_names(None, 1, 1).unwrap(),
        vec!["b"]
    );
}

#[test]
fn test_manager_control_is_unsupported() {
    let (manager, _store, _dir) = manager(TestStore::new());
    manager.create_projection("p", ProjectionOptions::default());
    let err = manager.stop_projection("p").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unsupported operation: Stopping a projection is not supported in InMemoryProjectionManager"
    );
}

#[test]
fn test_query_counts_events_per_stream() {
    let (manager, store, _dir) = manager(TestStore::new());
    store
        .transactional(|s| {
            s.create(Stream::new("user-1", vec![event("A", "n", 1, 1), event("B", "n", 2, 2)]))?;
            s.create(Stream::new("user-2", vec![event("A", "n", 3, 3)]))
        })
        .unwrap();

    let mut query = manager.create_query(QueryOptions::default());
    query
        .from_streams(["user-1", "user-2"])
        .unwrap()
        .when("A", |state, _, context| {
            let key = context.stream_name().to_string();
            if let Some(object) = state.as_object_mut() {
                let seen = object.get(&key).and_then(Value::as_int).unwrap_or(0);
                object.insert(key, Value::Int(seen + 1));
            }
            Ok(())
        })
        .unwrap();
    query.run().unwrap();

    assert_eq!(
        query.state(),
        &Value::from(serde_json::json!({"user-1": 1, "user-2": 1}))
    );
    assert_eq!(query.stream_positions()["user-1"], 2);
}

#[derive(Default)]
struct Totals {
    ready: bool,
    rows: BTreeMap<String, i64>,
    flushed: BTreeMap<String, i64>,
}

impl ReadModel for Totals {
    fn init(&mut self) -> Result<()> {
        self.ready = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.ready
    }

    fn reset(&mut self) -> Result<()> {
        self.rows.clear();
        self.flushed.clear();
        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        self.ready = false;
        self.reset()
    }

    fn persist(&mut self) -> Result<()> {
        self.flushed = self.rows.clone();
        Ok(())
    }
}

#[test]
fn test_read_model_projection_tracked_by_manager() {
    let (manager, store, _dir) = manager(TestStore::new());
    store
        .create(Stream::new(
            "order-1",
            vec![event("Placed", "total", 5, 1), event("Placed", "total", 7, 2)],
        ))
        .unwrap();

    let mut projector = manager.create_read_model_projection(
        "order_totals",
        Totals::default(),
        ReadModelProjectionOptions::default().with_persist_block_size(1),
    );
    projector
        .from_category("order")
        .unwrap()
        .when("Placed", |_, message, context| {
            let total = message.payload()["total"].as_int().unwrap_or(0);
            let stream = context.stream_name().to_string();
            *context.read_model().rows.entry(stream).or_insert(0) += total;
            Ok(())
        })
        .unwrap();
    projector.run(false).unwrap();

    assert_eq!(projector.read_model().flushed["order-1"], 12);
    assert_eq!(
        manager.fetch_projection_status("order_totals").unwrap(),
        ProjectionStatus::Idle
    );
    assert_eq!(
        manager
            .fetch_projection_stream_positions("order_totals")
            .unwrap()["order-1"],
        2
    );
    assert!(store.fetch_projection_data("order_totals").is_some());
}
