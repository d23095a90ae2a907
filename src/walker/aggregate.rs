//! Recursive aggregation walker
//!
//! One task per filesystem entry. Each task:
//!
//! ```text
//! acquire slot ─► stat ─┬─ file ──► build record ─► release ─► (sink if large) ─► return
//!                       │
//!                       ├─ dir ───► list children ─► build record ─► release
//!                       │             │
//!                       │             └─► spawn one task per child, merge each result
//!                       │                   │
//!                       │                   └─► re-acquire ─► sink ─► return
//!                       │
//!                       └─ other ─► warn, contribute nothing
//! ```
//!
//! A directory gives its slot back before fanning out and only takes one
//! again after its last child reported. Otherwise `K` directories could each
//! hold a slot while waiting on children that need a slot to start, and the
//! scan would stall. Spawning is unbounded; the limiter alone decides how
//! many tasks are doing filesystem work or producing results at once.

use crate::db::sink::SinkHandle;
use crate::error::{Result, ScanError};
use crate::fs::{self, EntryKind};
use crate::model::{node_path, FsNodeRecord};
use crate::walker::ids::IdAllocator;
use crate::walker::limiter::Limiter;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Live counters for progress display
#[derive(Debug, Default)]
pub struct ScanCounters {
    pub dirs: AtomicU64,
    pub files: AtomicU64,
    pub bytes: AtomicU64,
    pub skipped: AtomicU64,
}

impl ScanCounters {
    fn record_file(&self, size: u64) {
        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size, Ordering::Relaxed);
    }

    fn record_dir(&self) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
    }

    fn record_skips(&self, n: u64) {
        if n > 0 {
            self.skipped.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn dirs(&self) -> u64 {
        self.dirs.load(Ordering::Relaxed)
    }

    pub fn files(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

/// State shared by every task of one scan
pub struct WalkContext {
    pub root: PathBuf,
    pub ids: IdAllocator,
    pub limiter: Limiter,
    pub sink: SinkHandle,
    /// Files strictly larger than this are persisted individually
    pub large_file_threshold: u64,
    pub counters: Arc<ScanCounters>,
}

impl WalkContext {
    fn node_path(&self, path: &Path) -> String {
        node_path(&self.root, path)
    }
}

type VisitFuture = Pin<Box<dyn Future<Output = Result<Option<FsNodeRecord>>> + Send>>;

/// Visit `path` and everything below it.
///
/// Resolves to the fully merged record, or `None` for an entry type that is
/// not traversed. Any filesystem or sink failure aborts the walk; dropping a
/// directory's pending children cancels their subtrees.
pub fn visit(ctx: Arc<WalkContext>, path: PathBuf, parent_id: u32) -> VisitFuture {
    Box::pin(async move {
        let slot = ctx.limiter.acquire().await?;
        let stat = fs::stat(&path).await?;

        match stat.kind {
            EntryKind::File => {
                let record = FsNodeRecord::file(ctx.ids.next_id()?, parent_id, ctx.node_path(&path), stat.size);
                slot.release();
                ctx.counters.record_file(stat.size);

                if record.size > ctx.large_file_threshold {
                    debug!(path = %record.path, size = record.size, "Large file");
                    ctx.sink.push(record.clone()).await?;
                }

                Ok(Some(record))
            }

            EntryKind::Directory => {
                let listing = fs::list_children(&path).await?;
                let mut record =
                    FsNodeRecord::directory(ctx.ids.next_id()?, parent_id, ctx.node_path(&path), stat.size);
                slot.release();

                ctx.counters.record_skips(listing.skipped);

                let mut pending = JoinSet::new();
                for child in listing.children {
                    pending.spawn(visit(Arc::clone(&ctx), child.path, record.id));
                }

                while let Some(joined) = pending.join_next().await {
                    if let Some(child) = joined?? {
                        record.merge(&child);
                    }
                }

                let _slot = ctx.limiter.acquire().await?;
                ctx.counters.record_dir();
                ctx.sink.push(record.clone()).await?;

                Ok(Some(record))
            }

            kind => {
                warn!(path = %path.display(), kind = ?kind, "Unsupported file type, skipping");
                ctx.counters.record_skips(1);
                Ok(None)
            }
        }
    })
}

/// Visit the scan root; an unsupported root is an error rather than `None`
pub async fn visit_root(ctx: Arc<WalkContext>) -> Result<FsNodeRecord> {
    let root = ctx.root.clone();
    visit(ctx, root.clone(), 0)
        .await?
        .ok_or(ScanError::UnsupportedRoot { path: root })
}
