//! In-memory stream store for eventfile
//!
//! Holds streams, their metadata and the opaque projections map in process
//! memory. It is the engine the file-backed store wraps: every read and write
//! of `FileEventStore` lands here, and transactions are implemented by taking
//! and restoring whole [`StoreSnapshot`]s through the explicit
//! `export_snapshot` / `import_snapshot` accessors.
//!
//! The store is not transactional by itself and never touches the disk.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod snapshot;
pub mod store;

pub use snapshot::StoreSnapshot;
pub use store::InMemoryEventStore;
