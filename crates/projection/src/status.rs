//! Projection status

use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a projection
///
/// Persisted as its lowercase text form, e.g. `"running"` or
/// `"deleting incl emitted events"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProjectionStatus {
    /// Not running
    #[default]
    Idle,
    /// Processing events
    Running,
    /// Asked to stop at the next check
    Stopping,
    /// Asked to reset at the next check
    Resetting,
    /// Asked to delete itself at the next check
    Deleting,
    /// Asked to delete itself and its emitted events at the next check
    DeletingInclEmittedEvents,
}

impl ProjectionStatus {
    /// Persisted text form
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionStatus::Idle => "idle",
            ProjectionStatus::Running => "running",
            ProjectionStatus::Stopping => "stopping",
            ProjectionStatus::Resetting => "resetting",
            ProjectionStatus::Deleting => "deleting",
            ProjectionStatus::DeletingInclEmittedEvents => "deleting incl emitted events",
        }
    }
}

impl fmt::Display for ProjectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(ProjectionStatus::Idle),
            "running" => Ok(ProjectionStatus::Running),
            "stopping" => Ok(ProjectionStatus::Stopping),
            "resetting" => Ok(ProjectionStatus::Resetting),
            "deleting" => Ok(ProjectionStatus::Deleting),
            "deleting incl emitted events" => Ok(ProjectionStatus::DeletingInclEmittedEvents),
            other => Err(format!("unknown projection status \"{}\"", other)),
        }
    }
}
