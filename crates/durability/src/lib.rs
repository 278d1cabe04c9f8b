//! Durability layer for eventfile
//!
//! This crate handles everything that touches the backing file:
//!
//! - Codec: messages to records and back, through a message factory
//! - Document: the `{events, event_streams, projections}` file layout
//! - Encoding: JSON byte-layout options (pretty print, escaping)
//! - Snapshot I/O: read-or-create and atomic temp-file + rename writes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod document;
pub mod encoding;
pub mod snapshot;

pub use codec::{
    EventRegistry, GenericMessageFactory, MessageConverter, MessageFactory, MessageRecord,
    RecordError,
};
pub use document::DocumentCodec;
pub use encoding::EncodeOptions;
pub use snapshot::{SnapshotReader, SnapshotWriter, WriteInfo};
