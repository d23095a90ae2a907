//! Configuration types for fsstat
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - The options the scan core consumes ([`ScanOptions`])
//! - Validated runtime configuration ([`ScanConfig`])

use crate::error::ConfigError;
use crate::model::DEFAULT_LARGE_FILE_THRESHOLD;
use clap::Parser;
use std::path::PathBuf;

/// Maximum limiter capacity
const MAX_CONCURRENCY: usize = 4096;

/// Batch size limits
const MIN_BATCH_SIZE: usize = 1;
const MAX_BATCH_SIZE: usize = 100_000;

/// Minimum producer queue depth
const MIN_QUEUE_DEPTH: usize = 1;

/// Default limiter capacity
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Default sink batch capacity
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Default producer-side queue depth in front of the sink
pub const DEFAULT_QUEUE_DEPTH: usize = 50;

/// Concurrent filesystem statistics scanner
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fsstat",
    version,
    about = "Aggregate file counts and size histograms for a directory tree into SQLite",
    long_about = "Walks a directory tree with bounded concurrency, computing per-directory totals \
                  and size-bucket histograms (S <= 512 KiB, M < 4 MiB, L < 50 MiB, XL <= 200 MiB, \
                  XXL > 200 MiB).\n\n\
                  Every directory is written to the database; files are written only when larger \
                  than the large-file threshold.",
    after_help = "EXAMPLES:\n    \
        fsstat /srv/data\n    \
        fsstat /home -o home.db -c 64 -b 1000\n    \
        fsstat . --force -q"
)]
pub struct CliArgs {
    /// Directory to scan
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Output SQLite database
    #[arg(short = 'o', long = "db", default_value = "fs_stats.db", value_name = "FILE")]
    pub db: PathBuf,

    /// Records per database transaction
    #[arg(short = 'b', long = "buffer", default_value_t = DEFAULT_BATCH_SIZE, value_name = "NUM")]
    pub buffer: usize,

    /// Maximum number of concurrent filesystem operations
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY, value_name = "NUM")]
    pub concurrency: usize,

    /// Records that may wait in front of the database writer
    #[arg(long, default_value_t = DEFAULT_QUEUE_DEPTH, value_name = "NUM")]
    pub queue_depth: usize,

    /// Files strictly larger than this many bytes are stored individually
    #[arg(long, default_value_t = DEFAULT_LARGE_FILE_THRESHOLD, value_name = "BYTES")]
    pub large_file_threshold: u64,

    /// Async runtime worker threads
    #[arg(long, default_value_t = default_threads(), value_name = "NUM")]
    pub threads: usize,

    /// Overwrite the database if it already exists
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_threads() -> usize {
    num_cpus::get()
}

/// Settings consumed by the scan core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Limiter capacity `K`
    pub concurrency: usize,

    /// Sink batch capacity `B`
    pub batch_size: usize,

    /// Bounded queue depth for sink producers
    pub queue_depth: usize,

    /// Files strictly above this size are persisted
    pub large_file_threshold: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
        }
    }
}

impl ScanOptions {
    /// Check option ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::InvalidConcurrency {
                count: self.concurrency,
                max: MAX_CONCURRENCY,
            });
        }

        if self.batch_size < MIN_BATCH_SIZE || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize {
                size: self.batch_size,
                min: MIN_BATCH_SIZE,
                max: MAX_BATCH_SIZE,
            });
        }

        if self.queue_depth < MIN_QUEUE_DEPTH {
            return Err(ConfigError::InvalidQueueDepth {
                size: self.queue_depth,
                min: MIN_QUEUE_DEPTH,
            });
        }

        Ok(())
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Canonical scan root
    pub root: PathBuf,

    /// Output database path
    pub db_path: PathBuf,

    /// Core scan options
    pub options: ScanOptions,

    /// Runtime worker threads
    pub threads: usize,

    /// Replace an existing database
    pub force: bool,

    /// Show progress indicator
    pub show_progress: bool,
}

impl ScanConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let options = ScanOptions {
            concurrency: args.concurrency,
            batch_size: args.buffer,
            queue_depth: args.queue_depth,
            large_file_threshold: args.large_file_threshold,
        };
        options.validate()?;

        if args.threads == 0 {
            return Err(ConfigError::InvalidThreads { count: args.threads });
        }

        // Resolves symlinks in the root itself; a missing root fails here
        let root = std::fs::canonicalize(&args.root).map_err(|e| ConfigError::RootNotFound {
            path: args.root.clone(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = args.db.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConfigError::InvalidOutputPath {
                    path: args.db.clone(),
                    reason: format!("Parent directory '{}' does not exist", parent.display()),
                });
            }
        }

        if args.db.is_dir() {
            return Err(ConfigError::InvalidOutputPath {
                path: args.db.clone(),
                reason: "Path is a directory".to_string(),
            });
        }

        if args.db.exists() && !args.force {
            return Err(ConfigError::OutputExists { path: args.db });
        }

        Ok(Self {
            root,
            db_path: args.db,
            options,
            threads: args.threads,
            force: args.force,
            show_progress: !args.quiet,
        })
    }

    /// Remove an existing database (and its WAL side files) before a forced run
    pub fn clear_existing_db(&self) -> std::io::Result<()> {
        for suffix in ["", "-wal", "-shm"] {
            let mut name = self.db_path.as_os_str().to_owned();
            name.push(suffix);
            match std::fs::remove_file(PathBuf::from(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
