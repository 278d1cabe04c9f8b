//! eventfile - transactional single-file event store
//!
//! Streams of events live in memory and are written to one JSON file on
//! every commit. Reopening a store against the same file restores every
//! stream, its metadata and saved projection data.
//!
//! # Quick Start
//!
//! ```ignore
//! use eventfile::{EventStore, FileEventStore, Message, Metadata, Stream, StreamName};
//!
//! let store = FileEventStore::builder().path("events.json").open()?;
//!
//! // No transaction open: committed to the file right away
//! store.create(Stream::new("user-u1", vec![Message::new("UserRegistered", Metadata::new())]))?;
//!
//! // Several writes, one file rewrite
//! store.transactional(|s| {
//!     s.append_to(&StreamName::new("user-u1"), vec![Message::new("EmailChanged", Metadata::new())])?;
//!     s.append_to(&StreamName::new("user-u1"), vec![Message::new("UserDeactivated", Metadata::new())])
//! })?;
//! ```
//!
//! # Architecture
//!
//! - `eventfile-core`: values, messages, streams, errors and the store traits
//! - `eventfile-memory`: the in-memory stream store
//! - `eventfile-durability`: the event codec and atomic file writes
//! - `eventfile-engine`: the transactional file store and its configuration
//! - `eventfile-projection`: queries, projectors and the projection manager

pub use eventfile_core::{
    paginate, validate_limit, DomainEvent, Error, EventStore, FieldType, Message, Metadata,
    MetadataMatcher, Operator, Result, Stream, StreamIterator, StreamName, Timestamp,
    TransactionalEventStore, Value,
};
pub use eventfile_durability::{
    EncodeOptions, EventRegistry, GenericMessageFactory, MessageConverter, MessageFactory,
    MessageRecord,
};
pub use eventfile_engine::{
    FileEventStore, FileStoreBuilder, FileStoreConfig, TransactionMetrics, CONFIG_FILE_NAME,
};
pub use eventfile_memory::{InMemoryEventStore, StoreSnapshot};
pub use eventfile_projection::{
    InMemoryProjectionManager, ProjectionOptions, ProjectionProgress, ProjectionStatus,
    Projector, ProjectorContext, Query, QueryContext, QueryOptions, ReadModel,
    ReadModelContext, ReadModelProjectionOptions, ReadModelProjector, StopHandle,
    StreamPositions,
};
