//! Stat command implementation.

use bufchan_storage::{FileBackend, StorageBackend};
use std::path::Path;

/// Returns the size of the file at `path`.
pub fn file_size(path: &Path) -> Result<u64, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No file found at {}", path.display()).into());
    }
    Ok(FileBackend::open(path)?.size()?)
}

/// Runs the stat command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let size = file_size(path)?;
    println!("Path: {}", path.display());
    println!("Size: {size} bytes");
    Ok(())
}
