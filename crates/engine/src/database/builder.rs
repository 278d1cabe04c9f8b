//! File store builder for fluent configuration

use super::config::FileStoreConfig;
use super::FileEventStore;
use eventfile_core::{Error, Result};
use eventfile_durability::{EncodeOptions, EventRegistry, GenericMessageFactory, MessageFactory};
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// File Store Builder
// ============================================================================

/// Builder for [`FileEventStore`]
///
/// # Two Ways to Open a Store
///
/// ```ignore
/// use eventfile_engine::{FileEventStore, FileStoreConfig};
///
/// // 1. From a config (e.g. loaded from eventfile.toml)
/// let store = FileEventStore::open(FileStoreConfig::from_file(path)?)?;
///
/// // 2. Builder
/// let store = FileEventStore::builder()
///     .path("/data/events.json")
///     .pretty_print(true)
///     .registry(EventRegistry::new().register_event::<UserRegistered>())
///     .open()?;
/// ```
///
/// Without a factory, every message name is accepted on load.
#[derive(Clone)]
pub struct FileStoreBuilder {
    path: Option<PathBuf>,
    encoding: EncodeOptions,
    factory: Arc<dyn MessageFactory>,
}

impl std::fmt::Debug for FileStoreBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStoreBuilder")
            .field("path", &self.path)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl FileStoreBuilder {
    /// Create new builder with defaults
    pub fn new() -> Self {
        Self {
            path: None,
            encoding: EncodeOptions::default(),
            factory: Arc::new(GenericMessageFactory),
        }
    }

    /// Start from an existing config
    pub fn from_config(config: FileStoreConfig) -> Self {
        Self {
            path: Some(config.path),
            encoding: config.encoding,
            ..Self::new()
        }
    }

    /// Set the backing file (required)
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Replace all encoding options
    pub fn encoding(mut self, encoding: EncodeOptions) -> Self {
        self.encoding = encoding;
        self
    }

    /// Indent the backing file
    pub fn pretty_print(mut self, on: bool) -> Self {
        self.encoding.pretty_print = on;
        self
    }

    /// Write non-ASCII characters as `\uXXXX`
    pub fn escape_unicode(mut self, on: bool) -> Self {
        self.encoding.escape_unicode = on;
        self
    }

    /// Write `/` as `\/`
    pub fn escape_slashes(mut self, on: bool) -> Self {
        self.encoding.escape_slashes = on;
        self
    }

    /// Rebuild loaded messages through `factory`
    pub fn message_factory(mut self, factory: Arc<dyn MessageFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Only accept the message names registered in `registry`
    pub fn registry(self, registry: EventRegistry) -> Self {
        self.message_factory(Arc::new(registry))
    }

    /// Open the store
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if no path was configured
    /// - Any error of [`FileEventStore::open_with_factory`]
    pub fn open(self) -> Result<FileEventStore> {
        let path = self.path.ok_or_else(|| {
            Error::InvalidArgument("FileStoreBuilder::open() requires a path".to_string())
        })?;
        let config = FileStoreConfig::new(path).with_encoding(self.encoding);
        FileEventStore::open_with_factory(config, self.factory)
    }
}

impl Default for FileStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
