//! Test fixtures.
//!
//! Temporary files that clean up after themselves, plus random payloads.

use bufchan_storage::{FileBackend, StorageResult};
use rand::Rng;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A file inside a temporary directory, removed with the fixture.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TempFile {
    /// Creates a fixture whose file does not exist yet.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("channel.log");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Creates a fixture whose file already holds `contents`.
    pub fn with_contents(contents: &[u8]) -> Self {
        let fixture = Self::new();
        std::fs::write(&fixture.path, contents).expect("Failed to seed temp file");
        fixture
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh backend over the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn backend(&self) -> StorageResult<FileBackend> {
        FileBackend::open(&self.path)
    }

    /// Reads the file straight from disk, bypassing any backend.
    pub fn contents(&self) -> Vec<u8> {
        std::fs::read(&self.path).unwrap_or_default()
    }
}

impl Default for TempFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns `len` random bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen()).collect()
}
