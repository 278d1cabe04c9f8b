//! Storage engine for eventfile
//!
//! This crate ties the lower layers together:
//! - FileEventStore: in-memory streams written through to one JSON file
//! - Transaction coordination: explicit `Idle` / `InTransaction` state
//! - Configuration: `eventfile.toml` and a fluent builder
//!
//! The engine is the only component that knows about:
//! - When the backing file is read (open) and written (commit)
//! - Rollback snapshots

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod database;

pub use coordinator::{TransactionCoordinator, TransactionMetrics, TransactionState};
pub use database::{FileEventStore, FileStoreBuilder, FileStoreConfig, CONFIG_FILE_NAME};
