//! Batched sink: buffers records and persists them in fixed-size transactions
//!
//! Walker tasks are the producers. They hold [`SinkHandle`] clones and push
//! records into a bounded queue; a push completes only once the record has
//! been accepted by the queue. A single consumer runs on its own thread and
//! owns the store for the lifetime of the scan.
//!
//! The consumer waits on two sources at once, the record queue and a stop
//! signal, and sleeps when both are idle. On stop it drains whatever is
//! still queued, flushes the partial buffer and hands the store back.

use crate::db::store::BatchStore;
use crate::error::{DbError, DbResult};
use crate::model::FsNodeRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Statistics about sink activity
#[derive(Debug, Default)]
pub struct SinkStats {
    /// Records taken off the queue
    pub records_received: AtomicU64,

    /// Records committed to the store
    pub records_written: AtomicU64,

    /// Transactions committed
    pub batches_committed: AtomicU64,
}

impl SinkStats {
    pub fn records_received(&self) -> u64 {
        self.records_received.load(Ordering::Relaxed)
    }

    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    pub fn batches_committed(&self) -> u64 {
        self.batches_committed.load(Ordering::Relaxed)
    }
}

/// Producer side of the sink
#[derive(Clone)]
pub struct SinkHandle {
    sender: mpsc::Sender<FsNodeRecord>,
}

impl SinkHandle {
    /// Hand a record to the sink, waiting while the queue is full
    pub async fn push(&self, record: FsNodeRecord) -> DbResult<()> {
        self.sender
            .send(record)
            .await
            .map_err(|_| DbError::ChannelClosed)
    }
}

/// Batched writer running on a dedicated thread
pub struct BatchedSink<S: BatchStore> {
    /// Writer thread
    thread: Option<JoinHandle<()>>,

    /// Kept so handles can be cloned from the sink itself
    handle: SinkHandle,

    stop: oneshot::Sender<()>,

    /// Store and final status, sent once the consumer loop exits
    done: oneshot::Receiver<DbResult<S>>,

    stats: Arc<SinkStats>,
}

impl<S: BatchStore> BatchedSink<S> {
    /// Start the consumer thread
    ///
    /// `batch_size` is the buffer capacity flushed per transaction;
    /// `queue_depth` bounds how many pushed records may wait in the queue.
    pub fn spawn(store: S, batch_size: usize, queue_depth: usize) -> DbResult<Self> {
        let (sender, receiver) = mpsc::channel(queue_depth.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let stats = Arc::new(SinkStats::default());
        let batch_size = batch_size.max(1);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(DbError::Runtime)?;

        let thread_stats = Arc::clone(&stats);
        let thread = thread::Builder::new()
            .name("db-writer".into())
            .spawn(move || {
                let result = runtime.block_on(consume(store, receiver, stop_rx, batch_size, &thread_stats));
                let _ = done_tx.send(result);
            })
            .map_err(DbError::Runtime)?;

        Ok(Self {
            thread: Some(thread),
            handle: SinkHandle { sender },
            stop: stop_tx,
            done: done_rx,
            stats,
        })
    }

    /// Get a handle for pushing records
    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> Arc<SinkStats> {
        Arc::clone(&self.stats)
    }

    /// Signal stop, wait for the final flush and get the store back
    ///
    /// Every push that completed before this call is persisted (or the
    /// commit error that prevented it is returned).
    pub async fn finish(mut self) -> DbResult<S> {
        let _ = self.stop.send(());
        drop(self.handle);

        let result = self.done.await.map_err(|_| DbError::WriterPanicked)?;

        if let Some(thread) = self.thread.take() {
            // The loop has already returned; this only reaps the thread
            let _ = thread.join();
        }

        result
    }
}

/// Consumer loop
async fn consume<S: BatchStore>(
    mut store: S,
    mut receiver: mpsc::Receiver<FsNodeRecord>,
    mut stop: oneshot::Receiver<()>,
    batch_size: usize,
    stats: &SinkStats,
) -> DbResult<S> {
    let mut buffer: Vec<FsNodeRecord> = Vec::with_capacity(batch_size);

    loop {
        tokio::select! {
            biased;

            record = receiver.recv() => match record {
                Some(record) => {
                    accept(&mut store, &mut buffer, record, batch_size, stats)?;
                }
                // Every producer handle is gone
                None => break,
            },

            // Fires on stop, or if the owning sink was dropped
            _ = &mut stop => {
                receiver.close();
                while let Some(record) = receiver.recv().await {
                    accept(&mut store, &mut buffer, record, batch_size, stats)?;
                }
                break;
            }
        }
    }

    flush(&mut store, &mut buffer, stats)?;
    debug!(
        records = stats.records_written(),
        batches = stats.batches_committed(),
        "Sink drained"
    );

    Ok(store)
}

fn accept<S: BatchStore>(
    store: &mut S,
    buffer: &mut Vec<FsNodeRecord>,
    record: FsNodeRecord,
    batch_size: usize,
    stats: &SinkStats,
) -> DbResult<()> {
    stats.records_received.fetch_add(1, Ordering::Relaxed);
    buffer.push(record);

    if buffer.len() >= batch_size {
        flush(store, buffer, stats)?;
    }
    Ok(())
}

/// Persist the buffer as one transaction and reset it. Empty buffers are a no-op.
fn flush<S: BatchStore>(store: &mut S, buffer: &mut Vec<FsNodeRecord>, stats: &SinkStats) -> DbResult<()> {
    if buffer.is_empty() {
        return Ok(());
    }

    store.write_batch(buffer)?;

    stats.records_written.fetch_add(buffer.len() as u64, Ordering::Relaxed);
    stats.batches_committed.fetch_add(1, Ordering::Relaxed);
    debug!(batch = buffer.len(), "Committed batch");

    buffer.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryStore;

    fn record(id: u32) -> FsNodeRecord {
        FsNodeRecord::directory(id, 0, format!("/d{}", id), 4096)
    }

    /// Store whose commits fail after a number of successful batches
    struct FailingStore {
        remaining: usize,
    }

    impl BatchStore for FailingStore {
        fn write_batch(&mut self, _batch: &[FsNodeRecord]) -> DbResult<()> {
            if self.remaining == 0 {
                return Err(DbError::Sqlite(rusqlite::Error::ExecuteReturnedResults));
            }
            self.remaining -= 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_full_batches_then_partial_flush() {
        let sink = BatchedSink::spawn(MemoryStore::new(), 4, 2).unwrap();
        let handle = sink.handle();

        for id in 1..=10 {
            handle.push(record(id)).await.unwrap();
        }
        drop(handle);

        let stats = sink.stats();
        let store = sink.finish().await.unwrap();

        let sizes: Vec<_> = store.batches().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(stats.records_received(), 10);
        assert_eq!(stats.records_written(), 10);
        assert_eq!(stats.batches_committed(), 3);

        let ids: Vec<_> = store.records().map(|r| r.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_finish_without_records() {
        let sink = BatchedSink::spawn(MemoryStore::new(), 8, 4).unwrap();
        let store = sink.finish().await.unwrap();
        assert!(store.is_empty());
        assert!(store.batches().is_empty());
    }

    #[tokio::test]
    async fn test_finish_while_handles_outstanding() {
        let sink = BatchedSink::spawn(MemoryStore::new(), 100, 16).unwrap();
        let handle = sink.handle();
        for id in 1..=5 {
            handle.push(record(id)).await.unwrap();
        }

        // Stop arrives while a producer handle is still alive
        let store = sink.finish().await.unwrap();
        assert_eq!(store.len(), 5);

        assert!(matches!(handle.push(record(6)).await, Err(DbError::ChannelClosed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_producers() {
        let sink = BatchedSink::spawn(MemoryStore::new(), 7, 3).unwrap();
        let mut producers = tokio::task::JoinSet::new();

        for p in 0..8u32 {
            let handle = sink.handle();
            producers.spawn(async move {
                for i in 0..50u32 {
                    handle.push(record(p * 1000 + i + 1)).await.unwrap();
                }
            });
        }
        while let Some(joined) = producers.join_next().await {
            joined.unwrap();
        }

        let store = sink.finish().await.unwrap();
        assert_eq!(store.len(), 400);
        assert!(store.batches().iter().all(|b| b.len() <= 7));
    }

    #[tokio::test]
    async fn test_commit_failure_is_fatal() {
        let sink = BatchedSink::spawn(FailingStore { remaining: 1 }, 2, 1).unwrap();
        let handle = sink.handle();

        let mut push_failed = false;
        for id in 1..=20 {
            if handle.push(record(id)).await.is_err() {
                push_failed = true;
                break;
            }
        }
        drop(handle);

        assert!(push_failed);
        assert!(matches!(sink.finish().await, Err(DbError::Sqlite(_))));
    }
}
