//! End-to-end tests for the file-backed event store
//!
//! - persistence: round-trip across reopen, the file format
//! - transactions: atomic commits, rollback, auto-wrapping
//! - enumeration: stream and category listings, matchers
//! - projections: the manager and projectors over a file store

#[path = "../common/mod.rs"]
mod common;

mod enumeration;
mod persistence;
mod projections;
mod transactions;
