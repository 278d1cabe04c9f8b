//! Stream identity types
//!
//! This module defines:
//! - StreamName: Validated stream identifier with category derivation
//! - Stream: Input to `create` (name, initial events, stream metadata)
//! - Metadata: Ordered field mapping used for stream and message metadata

use crate::message::Message;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Ordered metadata mapping
pub type Metadata = BTreeMap<String, Value>;

/// Unique name of a stream
///
/// The category of a stream is the part of its name before the first `-`:
/// `user-u1` belongs to category `user`. Streams without a dash have no
/// category. Names starting with `$` are reserved for internal streams and
/// are skipped when projecting from all streams.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamName(String);

impl StreamName {
    /// Create a stream name
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty. Use [`StreamName::try_new`] for untrusted input.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "stream name cannot be empty");
        StreamName(name)
    }

    /// Create a stream name, rejecting empty input
    pub fn try_new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            None
        } else {
            Some(StreamName(name))
        }
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Category of this stream (prefix before the first `-`)
    pub fn category(&self) -> Option<&str> {
        self.0.split_once('-').map(|(category, _)| category)
    }

    /// Internal streams are prefixed with `$`
    pub fn is_internal(&self) -> bool {
        self.0.starts_with('$')
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamName {
    fn from(s: &str) -> Self {
        StreamName::new(s)
    }
}

impl From<String> for StreamName {
    fn from(s: String) -> Self {
        StreamName::new(s)
    }
}

impl AsRef<str> for StreamName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A stream to create: name, initial events and stream metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Stream name
    pub name: StreamName,
    /// Events appended as part of creation, in order
    pub events: Vec<Message>,
    /// Metadata describing the stream itself
    pub metadata: Metadata,
}

impl Stream {
    /// Create a stream description
    pub fn new(name: impl Into<StreamName>, events: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            events,
            metadata: Metadata::new(),
        }
    }

    /// Attach stream metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}
