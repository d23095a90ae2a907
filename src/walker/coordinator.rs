//! Scan coordinator - wires the pieces of one scan together
//!
//! Starts the sink, builds the shared walk context (id allocator, limiter,
//! sink handle) and runs the root task. Once the root record is back, every
//! push that contributed to it has been accepted by the sink, so stopping the
//! sink at that point loses nothing.

use crate::config::ScanOptions;
use crate::db::sink::BatchedSink;
use crate::db::store::BatchStore;
use crate::error::{DbError, Result, ScanError};
use crate::model::FsNodeRecord;
use crate::walker::aggregate::{visit_root, ScanCounters, WalkContext};
use crate::walker::ids::IdAllocator;
use crate::walker::limiter::Limiter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Totals for a finished scan
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub dirs: u64,
    pub files: u64,
    pub bytes: u64,
    pub skipped: u64,
    /// Rows committed by the sink
    pub records_written: u64,
    /// Transactions committed by the sink
    pub batches_committed: u64,
    /// Highest number of limiter slots held at once
    pub peak_slots: usize,
    pub duration: Duration,
}

/// Result of a completed scan
pub struct ScanReport<S> {
    /// Fully merged root record
    pub root: FsNodeRecord,
    pub stats: ScanStats,
    /// The store, handed back after the final flush
    pub store: S,
}

/// Runs one scan over a directory tree
pub struct Scanner {
    root: PathBuf,
    options: ScanOptions,
    limiter: Limiter,
    counters: Arc<ScanCounters>,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, options: ScanOptions) -> Self {
        Self {
            root: root.into(),
            limiter: Limiter::new(options.concurrency),
            options,
            counters: Arc::new(ScanCounters::default()),
        }
    }

    /// The limiter shared by every task of the scan
    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    /// Live counters, for progress reporting while `run` is in flight
    pub fn counters(&self) -> Arc<ScanCounters> {
        Arc::clone(&self.counters)
    }

    /// Walk the tree, persisting directories and large files into `store`
    pub async fn run<S: BatchStore>(&self, store: S) -> Result<ScanReport<S>> {
        let start = Instant::now();

        info!(
            root = %self.root.display(),
            concurrency = self.options.concurrency,
            batch_size = self.options.batch_size,
            "Starting scan"
        );

        let sink = BatchedSink::spawn(store, self.options.batch_size, self.options.queue_depth)?;
        let sink_stats = sink.stats();

        let ctx = Arc::new(WalkContext {
            root: self.root.clone(),
            ids: IdAllocator::new(),
            limiter: self.limiter.clone(),
            sink: sink.handle(),
            large_file_threshold: self.options.large_file_threshold,
            counters: Arc::clone(&self.counters),
        });

        let walked = visit_root(ctx).await;
        let finished = sink.finish().await;

        let (root, store) = match (walked, finished) {
            (Ok(root), Ok(store)) => (root, store),
            // A dead sink shows up in the walk as a closed channel; report why it died
            (Err(ScanError::Database(DbError::ChannelClosed)), Err(sink_err)) => {
                error!(error = %sink_err, "Sink failed");
                return Err(sink_err.into());
            }
            (Err(walk_err), _) => {
                error!(error = %walk_err, "Scan aborted");
                return Err(walk_err);
            }
            (Ok(_), Err(sink_err)) => {
                error!(error = %sink_err, "Sink failed");
                return Err(sink_err.into());
            }
        };

        let stats = ScanStats {
            dirs: self.counters.dirs(),
            files: self.counters.files(),
            bytes: self.counters.bytes(),
            skipped: self.counters.skipped(),
            records_written: sink_stats.records_written(),
            batches_committed: sink_stats.batches_committed(),
            peak_slots: self.limiter.peak(),
            duration: start.elapsed(),
        };

        info!(
            dirs = stats.dirs,
            files = stats.files,
            rows = stats.records_written,
            elapsed_ms = stats.duration.as_millis() as u64,
            "Scan complete"
        );

        Ok(ScanReport { root, stats, store })
    }
}
