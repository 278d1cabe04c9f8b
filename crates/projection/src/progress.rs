//! Live projection progress
//!
//! Each projector publishes its status, per-stream positions and state into
//! a [`ProjectionProgress`] it shares with the projection manager. The
//! manager only reads it.

use crate::status::ProjectionStatus;
use eventfile_core::{Error, Result, Value};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Last processed position per stream name
pub type StreamPositions = BTreeMap<String, u64>;

/// Snapshot of a projector's progress
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionProgress {
    /// Lifecycle status
    pub status: ProjectionStatus,
    /// Last processed position per stream
    pub positions: StreamPositions,
    /// Aggregated state
    pub state: Value,
}

impl Default for ProjectionProgress {
    fn default() -> Self {
        Self {
            status: ProjectionStatus::Idle,
            positions: StreamPositions::new(),
            state: Value::object(),
        }
    }
}

/// Progress shared between a projector and the manager
pub type SharedProgress = Arc<RwLock<ProjectionProgress>>;

// ============================================================================
// Persisted form
// ============================================================================

const KEY_STATE: &str = "state";
const KEY_POSITIONS: &str = "positions";
const KEY_STATUS: &str = "status";

impl ProjectionProgress {
    /// Form stored in the event store's projection map
    pub fn to_value(&self) -> Value {
        let positions = self
            .positions
            .iter()
            .map(|(stream, position)| (stream.clone(), Value::from(*position)))
            .collect();
        let mut object = BTreeMap::new();
        object.insert(KEY_POSITIONS.to_string(), Value::Object(positions));
        object.insert(KEY_STATE.to_string(), self.state.clone());
        object.insert(
            KEY_STATUS.to_string(),
            Value::from(self.status.as_str()),
        );
        Value::Object(object)
    }

    /// Read the stored form back
    ///
    /// Missing keys fall back to defaults; wrong types are `MalformedRecord`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::malformed("projection data is not an object"))?;

        let status = match object.get(KEY_STATUS) {
            None => ProjectionStatus::Idle,
            Some(status) => status
                .as_str()
                .ok_or_else(|| Error::malformed("projection status is not a string"))?
                .parse()
                .map_err(Error::MalformedRecord)?,
        };

        let mut positions = StreamPositions::new();
        if let Some(stored) = object.get(KEY_POSITIONS) {
            let stored = stored
                .as_object()
                .ok_or_else(|| Error::malformed("projection positions are not an object"))?;
            for (stream, position) in stored {
                let position = position
                    .as_int()
                    .and_then(|p| u64::try_from(p).ok())
                    .ok_or_else(|| {
                        Error::malformed(format!("invalid position for stream \"{}\"", stream))
                    })?;
                positions.insert(stream.clone(), position);
            }
        }

        Ok(Self {
            status,
            positions,
            state: object.get(KEY_STATE).cloned().unwrap_or_else(Value::object),
        })
    }

    /// Status stored in a projection's persisted data, if readable
    pub fn stored_status(value: &Value) -> Option<ProjectionStatus> {
        value.get(KEY_STATUS)?.as_str()?.parse().ok()
    }
}
