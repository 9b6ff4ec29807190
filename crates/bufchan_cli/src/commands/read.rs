//! Read command implementation.

use bufchan_core::{BufferedChannel, ChannelConfig};
use bufchan_storage::FileBackend;
use std::io::Write;
use std::path::Path;

/// Reads `length` bytes at `offset` from the file at `path`.
pub fn read_range(
    path: &Path,
    offset: u64,
    length: usize,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No file found at {}", path.display()).into());
    }
    let channel = BufferedChannel::with_config(FileBackend::open(path)?, ChannelConfig::default())?;
    Ok(channel.read_to_vec(offset, length)?)
}

/// Formats bytes as space-separated hex, 16 per line.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .map(|line| {
            line.iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs the read command.
pub fn run(
    path: &Path,
    offset: u64,
    length: usize,
    hex: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_range(path, offset, length)?;

    if hex {
        println!("{}", to_hex(&bytes));
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        stdout.flush()?;
    }

    Ok(())
}
