//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A file-based storage backend.
///
/// This backend provides persistent storage using OS file APIs.
/// Data survives process restarts.
///
/// # Durability
///
/// - `flush()` calls `File::flush()` to push data to the OS
/// - `sync()` calls `File::sync_all()` to ensure data is on disk
///
/// # Atomic appends
///
/// If writing an appended block fails part-way, the file is cut back to
/// its previous length before the error is returned, so a failed append
/// never leaves a torn tail behind.
///
/// # Example
///
/// ```no_run
/// use bufchan_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("data.bin")).unwrap();
/// let offset = backend.append(b"persistent data").unwrap();
/// backend.sync().unwrap();  // Ensure data is durable
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<Option<File>>,
    size: RwLock<u64>,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// If the file exists, it is opened for reading and appending and its
    /// current length becomes the backend size.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(Some(file)),
            size: RwLock::new(size),
        })
    }

    /// Opens or creates a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or file cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Opens a file backend and takes an advisory exclusive lock on it.
    ///
    /// The lock is released when the backend is closed or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another handle holds the lock,
    /// or an I/O error if the file cannot be opened.
    pub fn open_exclusive(path: &Path) -> StorageResult<Self> {
        let backend = Self::open(path)?;
        {
            let guard = backend.file.read();
            if let Some(file) = guard.as_ref() {
                if FileExt::try_lock_exclusive(file).is_err() {
                    return Err(StorageError::Locked {
                        path: path.to_path_buf(),
                    });
                }
            }
        }
        Ok(backend)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut guard = self.file.write();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;

        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);
        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut guard = self.file.write();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;
        let mut size = self.size.write();

        let offset = *size;
        if data.is_empty() {
            return Ok(offset);
        }

        let written = file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| file.write_all(data));
        if let Err(err) = written {
            // Cut any partial write so the file length matches `size` again.
            if let Err(rollback) = file.set_len(offset) {
                warn!(
                    path = %self.path.display(),
                    offset,
                    error = %rollback,
                    "could not cut torn append, next append overwrites it"
                );
            }
            return Err(err.into());
        }
        *size += data.len() as u64;

        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        let mut guard = self.file.write();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;
        file.flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        if self.file.read().is_none() {
            return Err(StorageError::Closed);
        }
        Ok(*self.size.read())
    }

    fn sync(&mut self) -> StorageResult<()> {
        let guard = self.file.write();
        let file = guard.as_ref().ok_or(StorageError::Closed)?;
        file.sync_all()?;
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        let mut guard = self.file.write();
        if let Some(mut file) = guard.take() {
            file.flush()?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.file.read().is_none()
    }
}
