//! File store configuration via `eventfile.toml`
//!
//! Only `path` is required. The `[encoding]` table changes the byte layout
//! of the backing file, never its meaning.

use eventfile_core::{Error, Result};
use eventfile_durability::EncodeOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "eventfile.toml";

/// File store configuration
///
/// # Example
///
/// ```toml
/// # Backing file, relative paths resolve against this file's directory
/// path = "events.json"
///
/// [encoding]
/// pretty_print = true
/// escape_unicode = false
/// escape_slashes = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Backing file
    pub path: PathBuf,
    /// Byte-layout options for the backing file
    #[serde(default)]
    pub encoding: EncodeOptions,
}

impl FileStoreConfig {
    /// Configuration with default encoding
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encoding: EncodeOptions::default(),
        }
    }

    /// Replace the encoding options
    pub fn with_encoding(mut self, encoding: EncodeOptions) -> Self {
        self.encoding = encoding;
        self
    }

    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the text is not valid TOML, `path` is missing, or
    /// a key has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: FileStoreConfig = toml::from_str(text)
            .map_err(|e| Error::InvalidArgument(format!("Failed to parse config: {}", e)))?;
        if config.path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument(
                "Config key \"path\" must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Read and parse a config file
    ///
    /// A relative `path` is resolved against the directory of `file`.
    pub fn from_file(file: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(file)
            .map_err(|e| Error::persistence(file, format!("Failed to read config file: {}", e)))?;
        let mut config = Self::from_toml_str(&text).map_err(|e| match e {
            Error::InvalidArgument(reason) => {
                Error::InvalidArgument(format!("{} ({})", reason, file.display()))
            }
            other => other,
        })?;
        if config.path.is_relative() {
            if let Some(dir) = file.parent() {
                config.path = dir.join(&config.path);
            }
        }
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidArgument(format!("Failed to serialize config: {}", e)))
    }

    /// Write this config as TOML to `file`
    pub fn write_to_file(&self, file: &Path) -> Result<()> {
        let content = self.to_toml_string()?;
        std::fs::write(file, content)
            .map_err(|e| Error::persistence(file, format!("Failed to write config file: {}", e)))
    }
}
