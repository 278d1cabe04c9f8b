//! Contract types shared by every layer
//!
//! - `timestamp`: Microsecond UTC timestamps and their fixed text format

pub mod timestamp;

pub use timestamp::{Timestamp, TimestampError, TIMESTAMP_FORMAT};
