//! Append command implementation.

use bufchan_core::{BufferedChannel, ChannelConfig};
use bufchan_storage::FileBackend;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Channel settings for an append run.
#[derive(Debug, Clone)]
pub struct AppendOptions {
    /// Write buffer capacity.
    pub capacity: usize,
    /// Unpersisted-bytes bound.
    pub bound: u64,
    /// Sync when the bound triggers.
    pub sync_on_bound: bool,
    /// Sync once at the end.
    pub sync: bool,
}

/// Summary of an append run.
#[derive(Debug, PartialEq, Eq)]
pub struct AppendResult {
    /// Bytes taken from the input.
    pub accepted: u64,
    /// File length afterwards.
    pub position: u64,
}

/// Runs the append command.
pub fn run<R: Read>(
    path: &Path,
    options: &AppendOptions,
    input: R,
) -> Result<AppendResult, Box<dyn std::error::Error>> {
    let backend = FileBackend::open_exclusive(path)?;
    let config = ChannelConfig::new()
        .capacity(options.capacity)
        .unpersisted_bytes_bound(options.bound)
        .sync_on_bound(options.sync_on_bound);
    let mut channel = BufferedChannel::with_config(backend, config)?;

    let start = channel.position();
    let accepted = channel.write_from(input)?;
    let position = if options.sync {
        channel.sync()?
    } else {
        channel.flush()?;
        channel.position()
    };
    channel.close()?;

    info!(path = %path.display(), start, accepted, position, "append complete");
    println!("appended {accepted} bytes, file is now {position} bytes");

    Ok(AppendResult { accepted, position })
}
