//! fsstat - Concurrent Filesystem Statistics Scanner
//!
//! Walks a directory tree, computes per-directory totals and size-bucket
//! histograms, and writes every directory (plus any very large file) to
//! SQLite, while bounding how many filesystem operations run at once.
//!
//! # Features
//!
//! - **Bounded Concurrency**: One async task per entry, with a counting
//!   limiter deciding how many of them touch the filesystem at a time.
//!
//! - **Size Histograms**: Five buckets (S/M/L/XL/XXL) per node, merged
//!   bottom-up so the root record covers the whole tree.
//!
//! - **Batched Output**: A single writer thread commits records in
//!   fixed-size transactions and drains fully on shutdown.
//!
//! # Example
//!
//! ```bash
//! # Scan a tree
//! fsstat /srv/data -o data.db
//!
//! # Largest directories
//! sqlite3 data.db "SELECT path, count FROM file_nodes WHERE is_dir ORDER BY count DESC LIMIT 10"
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod fs;
pub mod model;
pub mod progress;
pub mod walker;

pub use config::{CliArgs, ScanConfig, ScanOptions};
pub use error::{Result, ScanError};
pub use model::{BucketTally, FsNodeRecord, SizeBucket};
pub use walker::{ScanReport, ScanStats, Scanner};
