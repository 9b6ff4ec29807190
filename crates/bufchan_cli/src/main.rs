//! bufchan CLI
//!
//! Command-line tools for files written through a buffered channel.
//!
//! # Commands
//!
//! - `append` - Stream stdin into a file through a buffered channel
//! - `read` - Print a byte range of a file
//! - `stat` - Display file size

mod commands;

use bufchan_core::DEFAULT_CAPACITY;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// bufchan command-line tools.
#[derive(Parser)]
#[command(name = "bufchan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream stdin into a file through a buffered channel
    Append {
        /// File to append to (created if missing)
        path: PathBuf,

        /// Write buffer capacity in bytes
        #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
        capacity: usize,

        /// Flush (and sync) once this many bytes are unpersisted; 0 disables
        #[arg(short, long, default_value_t = 0)]
        bound: u64,

        /// Do not sync when the bound triggers a flush
        #[arg(long)]
        no_sync_on_bound: bool,

        /// Sync the file to disk before exiting
        #[arg(short, long)]
        sync: bool,
    },

    /// Print a byte range of a file
    Read {
        /// File to read
        path: PathBuf,

        /// Start offset
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Number of bytes to read
        #[arg(short, long)]
        length: usize,

        /// Print bytes as hex instead of raw
        #[arg(long)]
        hex: bool,
    },

    /// Display file size
    Stat {
        /// File to inspect
        path: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Append {
            path,
            capacity,
            bound,
            no_sync_on_bound,
            sync,
        } => {
            let options = commands::append::AppendOptions {
                capacity,
                bound,
                sync_on_bound: !no_sync_on_bound,
                sync,
            };
            commands::append::run(&path, &options, std::io::stdin().lock())?;
        }
        Commands::Read {
            path,
            offset,
            length,
            hex,
        } => {
            commands::read::run(&path, offset, length, hex)?;
        }
        Commands::Stat { path } => {
            commands::stat::run(&path)?;
        }
        Commands::Version => {
            println!("bufchan CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("bufchan core v{}", bufchan_core::VERSION);
        }
    }

    Ok(())
}
