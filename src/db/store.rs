//! Persistent stores the sink flushes into
//!
//! A store accepts whole batches. Each batch is one all-or-nothing
//! transaction: begin, one insert per record, commit. Any failure rolls the
//! batch back and is returned to the sink, which treats it as fatal.

use crate::db::schema::{self, keys};
use crate::error::{DbError, DbResult};
use crate::model::{FsNodeRecord, SizeBucket};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// Destination for batches of records
pub trait BatchStore: Send + 'static {
    /// Persist `batch` atomically
    fn write_batch(&mut self, batch: &[FsNodeRecord]) -> DbResult<()>;
}

/// Scan status recorded in `walk_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    Running,
    Completed,
    Failed,
}

impl WalkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalkStatus::Running => "running",
            WalkStatus::Completed => "completed",
            WalkStatus::Failed => "failed",
        }
    }
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Create a new database at `path` and mark the walk as running
    pub fn create(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::CreateFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init()?;
        Ok(store)
    }

    /// Open an existing database without touching its schema
    pub fn open(path: &Path) -> DbResult<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory database, mainly for tests
    pub fn in_memory() -> DbResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> DbResult<()> {
        schema::create_database(&self.conn)?;
        schema::set_walk_info(&self.conn, keys::SCHEMA_VERSION, &schema::SCHEMA_VERSION.to_string())?;
        schema::set_walk_info(&self.conn, keys::TOOL_VERSION, env!("CARGO_PKG_VERSION"))?;
        self.set_status(WalkStatus::Running)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_status(&self, status: WalkStatus) -> DbResult<()> {
        schema::set_walk_info(&self.conn, keys::STATUS, status.as_str())
    }

    pub fn set_info(&self, key: &str, value: &str) -> DbResult<()> {
        schema::set_walk_info(&self.conn, key, value)
    }

    /// Build indexes, mark the walk completed and switch to read settings
    pub fn finalize(&self) -> DbResult<()> {
        schema::create_indexes(&self.conn)?;
        self.set_status(WalkStatus::Completed)?;
        schema::optimize_for_reads(&self.conn)?;
        Ok(())
    }

    /// Number of rows in `file_nodes`
    pub fn row_count(&self) -> DbResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_nodes", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl BatchStore for SqliteStore {
    fn write_batch(&mut self, batch: &[FsNodeRecord]) -> DbResult<()> {
        // Dropping the transaction on an early return rolls it back
        let tx = self.conn.transaction()?;

        {
            let mut stmt = tx.prepare_cached(schema::INSERT_FILE_NODE)?;

            for record in batch {
                let s = record.bucket(SizeBucket::S);
                let m = record.bucket(SizeBucket::M);
                let l = record.bucket(SizeBucket::L);
                let xl = record.bucket(SizeBucket::Xl);
                let xxl = record.bucket(SizeBucket::Xxl);

                stmt.execute(params![
                    record.id,
                    record.parent_id,
                    record.path,
                    record.is_dir,
                    record.size as i64,
                    record.count,
                    s.count,
                    s.size as i64,
                    m.count,
                    m.size as i64,
                    l.count,
                    l.size as i64,
                    xl.count,
                    xl.size as i64,
                    xxl.count,
                    xxl.size as i64,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

/// Keeps every committed batch in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    batches: Vec<Vec<FsNodeRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[Vec<FsNodeRecord>] {
        &self.batches
    }

    pub fn records(&self) -> impl Iterator<Item = &FsNodeRecord> {
        self.batches.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BatchStore for MemoryStore {
    fn write_batch(&mut self, batch: &[FsNodeRecord]) -> DbResult<()> {
        self.batches.push(batch.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MIB;
    use tempfile::tempdir;

    fn sample_records() -> Vec<FsNodeRecord> {
        let mut root = FsNodeRecord::directory(1, 0, "/".into(), 4096);
        let big = FsNodeRecord::file(2, 1, "/big.iso".into(), 300 * MIB);
        root.merge(&big);
        vec![root, big]
    }

    #[test]
    fn test_sqlite_write_batch() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.write_batch(&sample_records()).unwrap();
        assert_eq!(store.row_count().unwrap(), 2);

        let (is_dir, count, xxl_count, xxl_size): (bool, u32, u32, i64) = store
            .connection()
            .query_row(
                "SELECT is_dir, count, xxl_file_count, xxl_file_size FROM file_nodes WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert!(is_dir);
        assert_eq!(count, 1);
        assert_eq!(xxl_count, 1);
        assert_eq!(xxl_size, (300 * MIB) as i64);
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.write_batch(&sample_records()).unwrap();

        // Duplicate primary key halfway through the batch
        let fresh = FsNodeRecord::file(3, 1, "/c".into(), 10);
        let duplicate = FsNodeRecord::file(1, 1, "/dup".into(), 10);
        assert!(store.write_batch(&[fresh, duplicate]).is_err());

        assert_eq!(store.row_count().unwrap(), 2);
    }

    #[test]
    fn test_create_and_finalize() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.db");

        let mut store = SqliteStore::create(&path).unwrap();
        store.write_batch(&sample_records()).unwrap();
        store.finalize().unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).unwrap();
        let status = schema::get_walk_info(reopened.connection(), keys::STATUS).unwrap();
        assert_eq!(status.as_deref(), Some("completed"));
        assert_eq!(reopened.row_count().unwrap(), 2);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());
        store.write_batch(&sample_records()).unwrap();
        store.write_batch(&[]).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.batches().len(), 2);
    }
}
