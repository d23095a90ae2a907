//! Database module: schema, stores and the batched sink
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Walker tasks (many)                    │
//! │  - push records via SinkHandle (bounded queue)      │
//! └─────────────────────┬───────────────────────────────┘
//!                       │ FsNodeRecord
//!                       ▼
//! ┌─────────────────────────────────────────────────────┐
//! │         BatchedSink thread ("db-writer")            │
//! │  - waits on records or stop                         │
//! │  - buffers up to B records                          │
//! │  - one transaction per full buffer                  │
//! └─────────────────────┬───────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────────────┐
//! │              BatchStore (SQLite)                    │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod schema;
pub mod sink;
pub mod store;

pub use schema::{create_database, create_indexes, keys, optimize_for_reads};
pub use sink::{BatchedSink, SinkHandle, SinkStats};
pub use store::{BatchStore, MemoryStore, SqliteStore, WalkStatus};
