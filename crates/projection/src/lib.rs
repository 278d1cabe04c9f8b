//! Projections over an eventfile store
//!
//! - [`Query`]: folds messages into a state, nothing persisted
//! - [`Projector`]: named, persisted projection that can emit messages
//! - [`ReadModelProjector`]: named, persisted projection feeding a [`ReadModel`]
//! - [`InMemoryProjectionManager`]: creates the above and reports on the
//!   projectors it created

#![warn(missing_docs)]
#![warn(clippy::all)]

mod engine;
pub mod manager;
pub mod options;
pub mod progress;
pub mod projector;
pub mod query;
pub mod read_model;
pub mod status;

pub use engine::StopHandle;
pub use manager::InMemoryProjectionManager;
pub use options::{
    ProjectionOptions, QueryOptions, ReadModelProjectionOptions, DEFAULT_CACHE_SIZE,
    DEFAULT_PERSIST_BLOCK_SIZE, DEFAULT_SLEEP_MICROS,
};
pub use progress::{ProjectionProgress, SharedProgress, StreamPositions};
pub use projector::{Projector, ProjectorContext, ProjectorHandler};
pub use query::{Query, QueryContext, QueryHandler};
pub use read_model::{ReadModel, ReadModelContext, ReadModelHandler, ReadModelProjector};
pub use status::ProjectionStatus;
