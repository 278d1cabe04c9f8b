//! Whole-store snapshot
//!
//! A `StoreSnapshot` is the full persisted state of a store:
//! - `events`: stream name → ordered messages
//! - `event_streams`: stream name → stream metadata
//! - `projections`: projection name → opaque data
//!
//! The file store rewrites exactly this structure on every commit, and keeps
//! one copy aside for the lifetime of a transaction so it can roll back.

use eventfile_core::{Message, Metadata, StreamName, Value};
use std::collections::BTreeMap;

/// Full state of an event store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Messages per stream, in commit order
    pub events: BTreeMap<StreamName, Vec<Message>>,
    /// Metadata per stream
    pub event_streams: BTreeMap<StreamName, Metadata>,
    /// Projection checkpoints and state, passed through uninterpreted
    pub projections: BTreeMap<String, Value>,
}

impl StoreSnapshot {
    /// Empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Make both stream maps agree on the set of streams
    ///
    /// A stream known to only one of the maps gets an empty entry in the
    /// other, so partially written documents still load as whole streams.
    pub fn normalize(&mut self) {
        for name in self.events.keys() {
            self.event_streams.entry(name.clone()).or_default();
        }
        for name in self.event_streams.keys() {
            self.events.entry(name.clone()).or_default();
        }
    }

    /// Number of streams
    pub fn stream_count(&self) -> usize {
        self.event_streams.len()
    }

    /// Number of messages across all streams
    pub fn event_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    /// True if there are no streams and no projection data
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.event_streams.is_empty() && self.projections.is_empty()
    }
}
