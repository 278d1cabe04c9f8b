//! Shared test utilities for the integration test suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]

use eventfile::{FileEventStore, FileStoreConfig, Message, Metadata, Timestamp, Value};
use std::path::PathBuf;
use std::sync::Once;
use tempfile::TempDir;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (shown for failing tests)
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// TestStore - file store in a scratch directory
// ============================================================================

/// File store whose backing file lives in its own temp directory
pub struct TestStore {
    pub store: FileEventStore,
    pub dir: TempDir,
}

impl TestStore {
    /// Open a fresh store
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileEventStore::open(FileStoreConfig::new(dir.path().join("store.json")))
            .expect("Failed to open store");
        TestStore { store, dir }
    }

    /// Backing file path
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("store.json")
    }

    /// Drop the store and open a new one against the same file
    pub fn reopen(self) -> Self {
        let TestStore { store, dir } = self;
        drop(store);
        let store = FileEventStore::open(FileStoreConfig::new(dir.path().join("store.json")))
            .expect("Failed to reopen store");
        TestStore { store, dir }
    }

    /// Raw backing file content
    pub fn file_bytes(&self) -> Vec<u8> {
        std::fs::read(self.path()).expect("Failed to read backing file")
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Message with one payload field and a fixed timestamp
pub fn event(name: &str, key: &str, value: impl Into<Value>, micros: u64) -> Message {
    let mut payload = Metadata::new();
    payload.insert(key.to_string(), value.into());
    Message::new(name, payload).with_created_at(Timestamp::from_micros(micros))
}

/// Metadata from key/value pairs
pub fn metadata<const N: usize>(pairs: [(&str, Value); N]) -> Metadata {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
