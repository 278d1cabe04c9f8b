//! Backing file I/O
//!
//! This module handles:
//! - Reading the backing file, creating it empty if it does not exist yet
//! - Atomic write (temp file + fsync + rename)
//!
//! A commit either replaces the whole file or leaves it byte-identical.

use eventfile_core::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffix of the sibling file a commit is staged in
pub const TEMP_SUFFIX: &str = ".tmp";

/// Path of the staging file for `path` (`store.json` → `store.json.tmp`)
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Result of a completed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteInfo {
    /// File that was replaced
    pub path: PathBuf,
    /// Bytes written
    pub size_bytes: u64,
}

// ============================================================================
// Snapshot Reader
// ============================================================================

/// Reads the backing file
pub struct SnapshotReader;

impl SnapshotReader {
    /// Read the whole file, creating it empty first if it is missing
    ///
    /// The parent directory must already exist.
    pub fn read_or_create(path: &Path) -> Result<Vec<u8>> {
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(path)
                    .map_err(|e| Error::persistence(path, format!("Touch file failed: {}", e)))?;
                debug!(target: "eventfile::store", path = %path.display(), "Created empty backing file");
                Ok(Vec::new())
            }
            Err(e) => Err(Error::persistence(path, format!("read failed: {}", e))),
        }
    }
}

// ============================================================================
// Snapshot Writer
// ============================================================================

/// Writes the backing file atomically using temp file + rename
#[derive(Debug, Default)]
pub struct SnapshotWriter;

impl SnapshotWriter {
    /// Create a new writer
    pub fn new() -> Self {
        SnapshotWriter
    }

    fn write(&self, bytes: &[u8], path: &Path) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    /// Replace `path` with `bytes`
    ///
    /// 1. Write to `<path>.tmp`
    /// 2. Sync the temp file
    /// 3. Rename it over `path` (atomic on POSIX)
    ///
    /// If any step fails the temp file is removed and `path` is untouched.
    pub fn write_atomic(&self, bytes: &[u8], path: &Path) -> Result<WriteInfo> {
        let temp_path = temp_path(path);

        debug!(
            target: "eventfile::store",
            final_path = %path.display(),
            temp_path = %temp_path.display(),
            "Starting atomic write"
        );

        if temp_path.exists() {
            warn!(target: "eventfile::store", path = %temp_path.display(), "Removing stale temp file");
            let _ = fs::remove_file(&temp_path);
        }

        if let Err(e) = self.write(bytes, &temp_path) {
            warn!(
                target: "eventfile::store",
                temp_path = %temp_path.display(),
                error = %e,
                "Write failed, cleaning up temp file"
            );
            let _ = fs::remove_file(&temp_path);
            return Err(Error::persistence(path, format!("write failed: {}", e)));
        }

        if let Err(e) = fs::rename(&temp_path, path) {
            warn!(
                target: "eventfile::store",
                temp_path = %temp_path.display(),
                error = %e,
                "Rename failed, cleaning up temp file"
            );
            let _ = fs::remove_file(&temp_path);
            return Err(Error::persistence(path, format!("rename failed: {}", e)));
        }

        debug!(target: "eventfile::store", path = %path.display(), "Atomic rename completed");
        Ok(WriteInfo {
            path: path.to_path_buf(),
            size_bytes: bytes.len() as u64,
        })
    }
}
