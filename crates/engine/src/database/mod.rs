//! Transactional file-backed event store
//!
//! [`FileEventStore`] keeps all streams in an [`InMemoryEventStore`] and
//! rewrites the whole backing file on every commit.
//!
//! ## Write-through policy
//!
//! `create`, `append_to`, `update_stream_metadata`, `delete` and the
//! projection data writes share one rule:
//!
//! - No active transaction: the call runs in its own transaction, committed
//!   right after it succeeds and rolled back if it or the commit fails
//! - Active transaction: the call only changes memory; the caller commits or
//!   rolls back
//!
//! Reads never touch the file.
//!
//! ## Open
//!
//! 1. A missing backing file is created empty (its directory must exist)
//! 2. The file is decoded in full; any bad record fails the open
//! 3. The decoded state seeds the in-memory store

mod builder;
mod config;
mod transactions;

pub use builder::FileStoreBuilder;
pub use config::{FileStoreConfig, CONFIG_FILE_NAME};

use crate::coordinator::{TransactionCoordinator, TransactionMetrics};
use eventfile_core::{
    EventStore, Message, Metadata, MetadataMatcher, Result, Stream, StreamIterator, StreamName,
    TransactionalEventStore, Value,
};
use eventfile_durability::{
    DocumentCodec, GenericMessageFactory, MessageFactory, SnapshotReader, SnapshotWriter,
};
use eventfile_memory::{InMemoryEventStore, StoreSnapshot};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Event store persisted to a single JSON file
pub struct FileEventStore {
    config: FileStoreConfig,
    codec: DocumentCodec,
    writer: SnapshotWriter,
    inner: InMemoryEventStore,
    coordinator: TransactionCoordinator,
}

impl std::fmt::Debug for FileEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEventStore")
            .field("path", &self.config.path)
            .field("in_transaction", &self.coordinator.in_transaction())
            .finish_non_exhaustive()
    }
}

impl FileEventStore {
    /// Start configuring a store
    pub fn builder() -> FileStoreBuilder {
        FileStoreBuilder::new()
    }

    /// Open a store that accepts every message name on load
    pub fn open(config: FileStoreConfig) -> Result<Self> {
        Self::open_with_factory(config, Arc::new(GenericMessageFactory))
    }

    /// Open a store, rebuilding loaded messages through `factory`
    ///
    /// # Errors
    ///
    /// - `Persistence` if the file cannot be created, read or parsed, or a
    ///   record has a missing or malformed `created_at`
    /// - `UnknownEventType` if `factory` does not know a stored message name
    /// - `MalformedRecord` if a record has missing or ill-typed fields
    pub fn open_with_factory(
        config: FileStoreConfig,
        factory: Arc<dyn MessageFactory>,
    ) -> Result<Self> {
        let codec = DocumentCodec::new(factory, config.encoding);

        let bytes = SnapshotReader::read_or_create(&config.path)?;
        let snapshot = codec.decode(&config.path, &bytes).map_err(|e| {
            warn!(
                target: "eventfile::store",
                path = %config.path.display(),
                error = %e,
                "Failed to load backing file"
            );
            e
        })?;

        info!(
            target: "eventfile::store",
            path = %config.path.display(),
            streams = snapshot.stream_count(),
            events = snapshot.event_count(),
            projections = snapshot.projections.len(),
            "Opened file event store"
        );

        Ok(FileEventStore {
            codec,
            writer: SnapshotWriter::new(),
            inner: InMemoryEventStore::from_snapshot(snapshot),
            coordinator: TransactionCoordinator::new(),
            config,
        })
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    /// Copy of the current in-memory state, including uncommitted changes
    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.export_snapshot()
    }

    /// Transaction counters
    pub fn metrics(&self) -> TransactionMetrics {
        self.coordinator.metrics()
    }

    // Mutations run against memory directly inside a transaction, and in a
    // single-operation transaction otherwise.
    fn write_through<T>(&self, op: impl FnOnce(&InMemoryEventStore) -> Result<T>) -> Result<T> {
        if self.coordinator.in_transaction() {
            op(&self.inner)
        } else {
            self.transactional(|store| op(&store.inner))
        }
    }
}

impl Drop for FileEventStore {
    fn drop(&mut self) {
        if self.coordinator.in_transaction() {
            warn!(
                target: "eventfile::txn",
                path = %self.config.path.display(),
                "Store dropped with an open transaction, uncommitted changes are lost"
            );
        }
    }
}

impl EventStore for FileEventStore {
    fn create(&self, stream: Stream) -> Result<()> {
        self.write_through(|inner| inner.create(stream))
    }

    fn append_to(&self, stream_name: &StreamName, events: Vec<Message>) -> Result<()> {
        self.write_through(|inner| inner.append_to(stream_name, events))
    }

    fn update_stream_metadata(&self, stream_name: &StreamName, metadata: Metadata) -> Result<()> {
        self.write_through(|inner| inner.update_stream_metadata(stream_name, metadata))
    }

    fn delete(&self, stream_name: &StreamName) -> Result<()> {
        self.write_through(|inner| inner.delete(stream_name))
    }

    fn has_stream(&self, stream_name: &StreamName) -> bool {
        self.inner.has_stream(stream_name)
    }

    fn fetch_stream_metadata(&self, stream_name: &StreamName) -> Result<Metadata> {
        self.inner.fetch_stream_metadata(stream_name)
    }

    fn load(
        &self,
        stream_name: &StreamName,
        from_number: u64,
        count: Option<usize>,
        matcher: Option<&MetadataMatcher>,
    ) -> Result<StreamIterator> {
        self.inner.load(stream_name, from_number, count, matcher)
    }

    fn load_reverse(
        &self,
        stream_name: &StreamName,
        from_number: Option<u64>,
        count: Option<usize>,
        matcher: Option<&MetadataMatcher>,
    ) -> Result<StreamIterator> {
        self.inner
            .load_reverse(stream_name, from_number, count, matcher)
    }

    fn fetch_stream_names(
        &self,
        filter: Option<&str>,
        matcher: Option<&MetadataMatcher>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StreamName>> {
        self.inner.fetch_stream_names(filter, matcher, limit, offset)
    }

    fn fetch_stream_names_regex(
        &self,
        pattern: &str,
        matcher: Option<&MetadataMatcher>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StreamName>> {
        self.inner
            .fetch_stream_names_regex(pattern, matcher, limit, offset)
    }

    fn fetch_category_names(
        &self,
        filter: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        self.inner.fetch_category_names(filter, limit, offset)
    }

    fn fetch_category_names_regex(
        &self,
        pattern: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        self.inner.fetch_category_names_regex(pattern, limit, offset)
    }

    fn fetch_projection_data(&self, name: &str) -> Option<Value> {
        self.inner.fetch_projection_data(name)
    }

    fn save_projection_data(&self, name: &str, data: Value) -> Result<()> {
        self.write_through(|inner| inner.save_projection_data(name, data))
    }

    fn delete_projection_data(&self, name: &str) -> Result<()> {
        self.write_through(|inner| inner.delete_projection_data(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_in(dir: &TempDir) -> FileEventStore {
        FileEventStore::open(FileStoreConfig::new(dir.path().join("store.json"))).unwrap()
    }

    fn ping() -> Message {
        Message::new("Ping", Metadata::new())
    }

    #[test]
    fn test_open_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        assert!(store.path().exists());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_auto_wrapped_create_is_persisted() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        store.create(Stream::new("s", vec![ping()])).unwrap();

        assert!(!store.in_transaction());
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"Ping\""));
        assert_eq!(store.metrics().total_committed, 1);
    }

    #[test]
    fn test_failed_auto_wrapped_call_rolls_back() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        let err = store
            .append_to(&StreamName::new("missing"), vec![ping()])
            .unwrap_err();

        assert!(err.is_stream_not_found());
        assert!(!store.in_transaction());
        assert_eq!(store.metrics().total_rolled_back, 1);
        assert_eq!(std::fs::read(store.path()).unwrap(), b"");
    }

    #[test]
    fn test_writes_inside_transaction_wait_for_commit() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        store.begin_transaction().unwrap();
        store.create(Stream::new("s", vec![ping()])).unwrap();

        assert!(store.has_stream(&StreamName::new("s")));
        assert_eq!(std::fs::read(store.path()).unwrap(), b"");

        store.commit().unwrap();
        assert!(!std::fs::read(store.path()).unwrap().is_empty());
    }

    #[test]
    fn test_projection_data_is_persisted() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_in(&dir);
            store
                .save_projection_data("p", Value::from(serde_json::json!({"n": 1})))
                .unwrap();
        }
        let store = open_in(&dir);
        assert_eq!(
            store.fetch_projection_data("p").unwrap().get("n"),
            Some(&Value::Int(1))
        );
    }
}
