//! Microsecond-precision UTC timestamp type
//!
//! Every message carries the instant it was created. The backing file stores
//! that instant as text in a fixed layout:
//!
//! ```text
//! YYYY-MM-DD HH:MM:SS.ffffff
//! ```
//!
//! always interpreted as UTC, always six fractional digits.
//!
//! ## Precision
//!
//! Timestamps are stored as microseconds since Unix epoch (1970-01-01 00:00:00 UTC).
//! Converting from a `chrono::DateTime` truncates nanoseconds; that loss is part
//! of the contract, so a timestamp survives a text round trip exactly.
//!
//! ## Usage
//!
//! ```
//! use eventfile_core::Timestamp;
//!
//! let ts = Timestamp::parse("2024-01-01 00:00:00.123456").unwrap();
//! assert_eq!(ts.format().unwrap(), "2024-01-01 00:00:00.123456");
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// `chrono` pattern used when writing timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Length of a formatted timestamp (`YYYY-MM-DD HH:MM:SS.ffffff`)
const FORMATTED_LEN: usize = 26;

/// Error converting a timestamp to or from its text form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// Text does not follow `YYYY-MM-DD HH:MM:SS.ffffff`
    Malformed(String),
    /// Instant cannot be represented in the text layout (before 1970 or after year 9999)
    OutOfRange(String),
}

impl std::fmt::Display for TimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimestampError::Malformed(s) => {
                write!(f, "malformed timestamp \"{}\" (expected Y-m-d H:i:s.u)", s)
            }
            TimestampError::OutOfRange(s) => write!(f, "timestamp out of range: {}", s),
        }
    }
}

impl std::error::Error for TimestampError {}

/// Microsecond-precision timestamp
///
/// Represents a point in time as microseconds since Unix epoch, UTC.
///
/// ## Invariants
///
/// - Timestamps are always non-negative (u64)
/// - Timestamps are always in microseconds
/// - `parse(format(t)) == t` for every formattable `t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a timestamp for the current moment
    ///
    /// Returns epoch if the system clock is before Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as u64)
    }

    /// Create a timestamp from microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Create a timestamp from seconds since epoch
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000))
    }

    /// Create a timestamp from a `chrono` UTC datetime
    ///
    /// Sub-microsecond precision is truncated. Returns `None` for instants
    /// before Unix epoch.
    pub fn from_datetime(dt: DateTime<Utc>) -> Option<Self> {
        u64::try_from(dt.timestamp_micros()).ok().map(Timestamp)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get microseconds since Unix epoch
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Get seconds since Unix epoch (truncates)
    #[inline]
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Convert to a `chrono` UTC datetime
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let micros = i64::try_from(self.0).ok()?;
        DateTime::<Utc>::from_timestamp_micros(micros)
    }

    // =========================================================================
    // Text format
    // =========================================================================

    /// Render as `YYYY-MM-DD HH:MM:SS.ffffff` (UTC)
    pub fn format(&self) -> Result<String, TimestampError> {
        let dt = self
            .to_datetime()
            .ok_or_else(|| TimestampError::OutOfRange(format!("{} micros", self.0)))?;
        let text = dt.format(TIMESTAMP_FORMAT).to_string();
        if text.len() != FORMATTED_LEN {
            return Err(TimestampError::OutOfRange(text));
        }
        Ok(text)
    }

    /// Parse `YYYY-MM-DD HH:MM:SS.ffffff`, interpreting it as UTC
    pub fn parse(text: &str) -> Result<Self, TimestampError> {
        let malformed = || TimestampError::Malformed(text.to_string());

        let bytes = text.as_bytes();
        if bytes.len() != FORMATTED_LEN || bytes[10] != b' ' || bytes[19] != b'.' {
            return Err(malformed());
        }
        if !bytes[20..].iter().all(u8::is_ascii_digit) {
            return Err(malformed());
        }

        let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .map_err(|_| malformed())?;
        let micros = naive.and_utc().timestamp_micros();
        u64::try_from(micros)
            .map(Timestamp)
            .map_err(|_| TimestampError::OutOfRange(text.to_string()))
    }

    // =========================================================================
    // Duration Operations
    // =========================================================================

    /// Compute duration since an earlier timestamp
    ///
    /// Returns `None` if `earlier` is actually later than `self`.
    pub fn duration_since(&self, earlier: Timestamp) -> Option<Duration> {
        self.0.checked_sub(earlier.0).map(Duration::from_micros)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.format() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{}us", self.0),
        }
    }
}

impl From<u64> for Timestamp {
    fn from(micros: u64) -> Self {
        Timestamp::from_micros(micros)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

// ============================================================================
// Tests
// ============================================================================
