//! InMemoryEventStore: stream storage in process memory
//!
//! ## Semantics
//!
//! - Streams must be created before they can be appended to
//! - Positions are 1-based and follow append order
//! - Deleting a stream removes both its messages and its metadata
//! - Name enumerations are sorted lexicographically, then paginated
//! - A category is the part of a stream name before the first `-`

use crate::snapshot::StoreSnapshot;
use eventfile_core::{
    paginate, validate_limit, Error, EventStore, Message, Metadata, MetadataMatcher, Result,
    Stream, StreamIterator, StreamName, Value,
};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

/// Stream store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    state: RwLock<StoreSnapshot>,
}

impl InMemoryEventStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded from a snapshot
    pub fn from_snapshot(mut snapshot: StoreSnapshot) -> Self {
        snapshot.normalize();
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Copy of the entire current state
    pub fn export_snapshot(&self) -> StoreSnapshot {
        self.state.read().clone()
    }

    /// Replace the entire current state
    pub fn import_snapshot(&self, mut snapshot: StoreSnapshot) {
        snapshot.normalize();
        *self.state.write() = snapshot;
    }

    /// Run `f` against the current state without copying it
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&StoreSnapshot) -> R) -> R {
        f(&self.state.read())
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::InvalidArgument(format!("Invalid regex pattern given: {}", e)))
}

fn matches(matcher: Option<&MetadataMatcher>, message: &Message) -> bool {
    matcher.map_or(true, |m| m.matches_message(message))
}

impl EventStore for InMemoryEventStore {
    fn create(&self, stream: Stream) -> Result<()> {
        let mut state = self.state.write();
        if state.event_streams.contains_key(&stream.name) {
            return Err(Error::StreamExistsAlready(stream.name.to_string()));
        }

        debug!(
            target: "eventfile::memory",
            stream = %stream.name,
            events = stream.events.len(),
            "Stream created"
        );
        state
            .event_streams
            .insert(stream.name.clone(), stream.metadata);
        state.events.insert(stream.name, stream.events);
        Ok(())
    }

    fn append_to(&self, stream_name: &StreamName, events: Vec<Message>) -> Result<()> {
        let mut state = self.state.write();
        if !state.event_streams.contains_key(stream_name) {
            return Err(Error::StreamNotFound(stream_name.to_string()));
        }
        state
            .events
            .entry(stream_name.clone())
            .or_default()
            .extend(events);
        Ok(())
    }

    fn update_stream_metadata(&self, stream_name: &StreamName, metadata: Metadata) -> Result<()> {
        let mut state = self.state.write();
        match state.event_streams.get_mut(stream_name) {
            Some(existing) => {
                *existing = metadata;
                Ok(())
            }
            None => Err(Error::StreamNotFound(stream_name.to_string())),
        }
    }

    fn delete(&self, stream_name: &StreamName) -> Result<()> {
        let mut state = self.state.write();
        if state.event_streams.remove(stream_name).is_none() {
            return Err(Error::StreamNotFound(stream_name.to_string()));
        }
        state.events.remove(stream_name);
        debug!(target: "eventfile::memory", stream = %stream_name, "Stream deleted");
        Ok(())
    }

    fn has_stream(&self, stream_name: &StreamName) -> bool {
        self.state.read().event_streams.contains_key(stream_name)
    }

    fn fetch_stream_metadata(&self, stream_name: &StreamName) -> Result<Metadata> {
        self.state
            .read()
            .event_streams
            .get(stream_name)
            .cloned()
            .ok_or_else(|| Error::StreamNotFound(stream_name.to_string()))
    }

    fn load(
        &self,
        stream_name: &StreamName,
        from_number: u64,
        count: Option<usize>,
        matcher: Option<&MetadataMatcher>,
    ) -> Result<StreamIterator> {
        let state = self.state.read();
        if !state.event_streams.contains_key(stream_name) {
            return Err(Error::StreamNotFound(stream_name.to_string()));
        }

        let skip = from_number.saturating_sub(1) as usize;
        let selected = state
            .events
            .get(stream_name)
            .map(|events| {
                events
                    .iter()
                    .skip(skip)
                    .filter(|m| matches(matcher, m))
                    .take(count.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(StreamIterator::new(selected))
    }

    fn load_reverse(
        &self,
        stream_name: &StreamName,
        from_number: Option<u64>,
        count: Option<usize>,
        matcher: Option<&MetadataMatcher>,
    ) -> Result<StreamIterator> {
        let state = self.state.read();
        if !state.event_streams.contains_key(stream_name) {
            return Err(Error::StreamNotFound(stream_name.to_string()));
        }

        let selected = state
            .events
            .get(stream_name)
            .map(|events| {
                let upto = from_number
                    .map(|n| (n as usize).min(events.len()))
                    .unwrap_or(events.len());
                events[..upto]
                    .iter()
                    .rev()
                    .filter(|m| matches(matcher, m))
                    .take(count.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(StreamIterator::new(selected))
    }

    fn fetch_stream_names(
        &self,
        filter: Option<&str>,
        matcher: Option<&MetadataMatcher>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StreamName>> {
        validate_limit(limit)?;
        let state = self.state.read();
        let names = state
            .event_streams
            .iter()
            .filter(|(name, _)| filter.map_or(true, |f| name.as_str() == f))
            .filter(|(_, md)| matcher.map_or(true, |m| m.matches_metadata(md)))
            .map(|(name, _)| name.clone())
            .collect();
        Ok(paginate(names, limit, offset))
    }

    fn fetch_stream_names_regex(
        &self,
        pattern: &str,
        matcher: Option<&MetadataMatcher>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StreamName>> {
        validate_limit(limit)?;
        let re = compile(pattern)?;
        let state = self.state.read();
        let names = state
            .event_streams
            .iter()
            .filter(|(name, _)| re.is_match(name.as_str()))
            .filter(|(_, md)| matcher.map_or(true, |m| m.matches_metadata(md)))
            .map(|(name, _)| name.clone())
            .collect();
        Ok(paginate(names, limit, offset))
    }

    fn fetch_category_names(
        &self,
        filter: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        validate_limit(limit)?;
        let state = self.state.read();
        let categories: BTreeSet<&str> = state
            .event_streams
            .keys()
            .filter_map(StreamName::category)
            .filter(|c| filter.map_or(true, |f| *c == f))
            .collect();
        Ok(paginate(
            categories.into_iter().map(str::to_string).collect(),
            limit,
            offset,
        ))
    }

    fn fetch_category_names_regex(
        &self,
        pattern: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        validate_limit(limit)?;
        let re = compile(pattern)?;
        let state = self.state.read();
        let categories: BTreeSet<&str> = state
            .event_streams
            .keys()
            .filter_map(StreamName::category)
            .filter(|c| re.is_match(c))
            .collect();
        Ok(paginate(
            categories.into_iter().map(str::to_string).collect(),
            limit,
            offset,
        ))
    }

    fn fetch_projection_data(&self, name: &str) -> Option<Value> {
        self.state.read().projections.get(name).cloned()
    }

    fn save_projection_data(&self, name: &str, data: Value) -> Result<()> {
        self.state
            .write()
            .projections
            .insert(name.to_string(), data);
        Ok(())
    }

    fn delete_projection_data(&self, name: &str) -> Result<()> {
        self.state.write().projections.remove(name);
        Ok(())
    }
}
