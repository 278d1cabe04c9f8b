//! Core trait definitions for eventfile
//!
//! This module defines the store contracts:
//! - EventStore: Stream read/write surface shared by every store
//! - TransactionalEventStore: Explicit transaction control on top of it
//!
//! Implementations take `&self` and use interior locking so they can be
//! shared through `Arc` by projection engines.

use crate::error::Result;
use crate::matcher::MetadataMatcher;
use crate::message::Message;
use crate::types::{Metadata, Stream, StreamName};
use crate::value::Value;

/// Owned sequence of messages returned by `load` / `load_reverse`
///
/// Messages are copied out of the store, so the iterator stays valid while
/// the store keeps changing.
#[derive(Debug, Clone, Default)]
pub struct StreamIterator {
    inner: std::vec::IntoIter<Message>,
}

impl StreamIterator {
    /// Wrap already selected messages
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            inner: messages.into_iter(),
        }
    }

    /// Iterator with no messages
    pub fn empty() -> Self {
        Self::default()
    }
}

impl Iterator for StreamIterator {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for StreamIterator {}

/// Read/write surface of an event store
///
/// Positions are 1-based: the first message of a stream has number 1.
pub trait EventStore: Send + Sync {
    /// Create a stream with its initial events and metadata
    ///
    /// Fails with `StreamExistsAlready` if the name is taken.
    fn create(&self, stream: Stream) -> Result<()>;

    /// Append messages to an existing stream, preserving order
    ///
    /// Fails with `StreamNotFound` if the stream does not exist.
    fn append_to(&self, stream_name: &StreamName, events: Vec<Message>) -> Result<()>;

    /// Replace the metadata of an existing stream
    fn update_stream_metadata(&self, stream_name: &StreamName, metadata: Metadata) -> Result<()>;

    /// Remove a stream's events and metadata
    fn delete(&self, stream_name: &StreamName) -> Result<()>;

    /// Check whether a stream exists
    fn has_stream(&self, stream_name: &StreamName) -> bool;

    /// Metadata of an existing stream
    fn fetch_stream_metadata(&self, stream_name: &StreamName) -> Result<Metadata>;

    /// Messages from position `from_number` forward, at most `count`
    fn load(
        &self,
        stream_name: &StreamName,
        from_number: u64,
        count: Option<usize>,
        matcher: Option<&MetadataMatcher>,
    ) -> Result<StreamIterator>;

    /// Messages from position `from_number` (default: last) backward, at most `count`
    fn load_reverse(
        &self,
        stream_name: &StreamName,
        from_number: Option<u64>,
        count: Option<usize>,
        matcher: Option<&MetadataMatcher>,
    ) -> Result<StreamIterator>;

    /// Stream names, exact `filter` or all, sorted and paginated
    fn fetch_stream_names(
        &self,
        filter: Option<&str>,
        matcher: Option<&MetadataMatcher>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StreamName>>;

    /// Stream names matching a regex, sorted and paginated
    fn fetch_stream_names_regex(
        &self,
        pattern: &str,
        matcher: Option<&MetadataMatcher>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StreamName>>;

    /// Distinct categories, exact `filter` or all, sorted and paginated
    fn fetch_category_names(
        &self,
        filter: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>>;

    /// Distinct categories matching a regex, sorted and paginated
    fn fetch_category_names_regex(
        &self,
        pattern: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>>;

    /// Persisted projection data (opaque to the store)
    fn fetch_projection_data(&self, name: &str) -> Option<Value>;

    /// Store projection data under `name`
    fn save_projection_data(&self, name: &str, data: Value) -> Result<()>;

    /// Drop projection data stored under `name`; missing entries are ignored
    fn delete_projection_data(&self, name: &str) -> Result<()>;
}

/// Event store with explicit transaction control
///
/// At most one transaction is active at a time; nesting is an error.
pub trait TransactionalEventStore: EventStore {
    /// Start a transaction; `InvalidState` if one is already active
    fn begin_transaction(&self) -> Result<()>;

    /// Make the transaction's changes durable; `InvalidState` if none is active
    fn commit(&self) -> Result<()>;

    /// Discard the transaction's changes; `InvalidState` if none is active
    fn rollback(&self) -> Result<()>;

    /// Whether a transaction is active
    fn in_transaction(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_iterator_yields_in_order() {
        let a = Message::new("A", Metadata::new());
        let b = Message::new("B", Metadata::new());
        let names: Vec<_> = StreamIterator::new(vec![a, b])
            .map(|m| m.message_name().to_string())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_stream_iterator_len() {
        let it = StreamIterator::new(vec![Message::new("A", Metadata::new())]);
        assert_eq!(it.len(), 1);
        assert_eq!(StreamIterator::empty().len(), 0);
    }
}
