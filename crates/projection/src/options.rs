//! Engine options
//!
//! | option | default |
//! |--------|---------|
//! | `cache_size` | 1000 stream names per fetch |
//! | `sleep` | 100 000 µs between polls when kept running |
//! | `signal_dispatch` | off |
//! | `persist_block_size` | 1000 events (read models only) |

use std::time::Duration;

/// Default number of stream names fetched per page
pub const DEFAULT_CACHE_SIZE: usize = 1000;
/// Default pause between polls, in microseconds
pub const DEFAULT_SLEEP_MICROS: u64 = 100_000;
/// Default number of events between read model persists
pub const DEFAULT_PERSIST_BLOCK_SIZE: usize = 1000;

/// Options for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOptions {
    /// Check for a stop request between events, not only between streams
    pub signal_dispatch: bool,
}

/// Options for a projector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionOptions {
    /// Stream names fetched per page when resolving categories or all streams
    pub cache_size: usize,
    /// Pause between polls when running with `keep_running`
    pub sleep: Duration,
    /// Check for a stop request between events, not only between streams
    pub signal_dispatch: bool,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            sleep: Duration::from_micros(DEFAULT_SLEEP_MICROS),
            signal_dispatch: false,
        }
    }
}

impl ProjectionOptions {
    /// Set the stream name page size
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Set the poll pause
    pub fn with_sleep(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    /// Set signal dispatch
    pub fn with_signal_dispatch(mut self, on: bool) -> Self {
        self.signal_dispatch = on;
        self
    }
}

/// Options for a read model projector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadModelProjectionOptions {
    /// Shared projector options
    pub projection: ProjectionOptions,
    /// Events handled between two read model persists
    pub persist_block_size: usize,
}

impl Default for ReadModelProjectionOptions {
    fn default() -> Self {
        Self {
            projection: ProjectionOptions::default(),
            persist_block_size: DEFAULT_PERSIST_BLOCK_SIZE,
        }
    }
}

impl ReadModelProjectionOptions {
    /// Set the persist block size
    pub fn with_persist_block_size(mut self, size: usize) -> Self {
        self.persist_block_size = size;
        self
    }
}
