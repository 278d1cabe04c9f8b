//! Core types and traits for eventfile
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: Unified value enum for payloads, metadata and projection state
//! - Timestamp: Microsecond UTC timestamps with the fixed text format
//! - Message: Immutable event record (name, payload, metadata, created_at)
//! - StreamName / Stream: Stream identity and creation input
//! - MetadataMatcher: Filters applied by load and stream enumeration
//! - Error: Error type hierarchy
//! - Traits: EventStore and TransactionalEventStore contracts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod error;
pub mod matcher;
pub mod message;
pub mod traits;
pub mod types;
pub mod value;

pub use contract::{Timestamp, TimestampError, TIMESTAMP_FORMAT};
pub use error::{Error, Result};
pub use matcher::{FieldType, MetadataMatcher, Operator};
pub use message::{DomainEvent, Message};
pub use traits::{EventStore, StreamIterator, TransactionalEventStore};
pub use types::{Metadata, Stream, StreamName};
pub use value::Value;

/// Validate pagination arguments shared by every enumeration call
///
/// Offsets are unsigned, so only the limit can be out of range.
pub fn validate_limit(limit: usize) -> Result<()> {
    if limit < 1 {
        return Err(Error::OutOfRange(format!(
            "Invalid limit \"{}\" given. Must be greater than 0.",
            limit
        )));
    }
    Ok(())
}

/// Apply offset/limit to an already sorted list of names
pub fn paginate<T>(items: Vec<T>, limit: usize, offset: usize) -> Vec<T> {
    items.into_iter().skip(offset).take(limit).collect()
}
