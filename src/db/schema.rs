//! Database schema definitions and creation
//!
//! One row per persisted [`FsNodeRecord`](crate::model::FsNodeRecord) in
//! `file_nodes`, plus a small `walk_info` key/value table describing the run.

use crate::error::DbResult;
use rusqlite::Connection;

/// Current schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// SQL to create the node table. Ids come from the scan, not from SQLite.
const CREATE_FILE_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS file_nodes (
    id INTEGER PRIMARY KEY,
    parent_id INTEGER NOT NULL,
    path TEXT NOT NULL,
    is_dir BOOLEAN NOT NULL,
    size INTEGER NOT NULL,
    count INTEGER NOT NULL,
    s_file_count INTEGER NOT NULL,
    s_file_size INTEGER NOT NULL,
    m_file_count INTEGER NOT NULL,
    m_file_size INTEGER NOT NULL,
    l_file_count INTEGER NOT NULL,
    l_file_size INTEGER NOT NULL,
    xl_file_count INTEGER NOT NULL,
    xl_file_size INTEGER NOT NULL,
    xxl_file_count INTEGER NOT NULL,
    xxl_file_size INTEGER NOT NULL
)
"#;

/// SQL to create walk metadata table
const CREATE_WALK_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS walk_info (
    key TEXT PRIMARY KEY,
    value TEXT
)
"#;

/// Insert statement used by the sink, one execution per record
pub const INSERT_FILE_NODE: &str = r#"
INSERT INTO file_nodes (
    id, parent_id, path, is_dir, size, count,
    s_file_count, s_file_size,
    m_file_count, m_file_size,
    l_file_count, l_file_size,
    xl_file_count, xl_file_size,
    xxl_file_count, xxl_file_size
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
"#;

/// Indexes for common queries, created after the scan
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_file_nodes_parent ON file_nodes(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_file_nodes_path ON file_nodes(path)",
    "CREATE INDEX IF NOT EXISTS idx_file_nodes_size ON file_nodes(size)",
];

/// SQLite pragmas for write throughput during the scan
const WRITE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -64000;      -- 64MB cache
PRAGMA temp_store = MEMORY;
PRAGMA page_size = 4096;
"#;

/// SQLite pragmas for read-optimized queries (applied after the scan)
const READ_PRAGMAS: &str = r#"
PRAGMA synchronous = FULL;
"#;

/// Create and configure a new database for writing
pub fn create_database(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(WRITE_PRAGMAS)?;

    conn.execute(CREATE_FILE_NODES_TABLE, [])?;
    conn.execute(CREATE_WALK_INFO_TABLE, [])?;

    Ok(())
}

/// Create indexes (called after the scan for better insert performance)
pub fn create_indexes(conn: &Connection) -> DbResult<()> {
    for sql in CREATE_INDEXES {
        conn.execute(sql, [])?;
    }
    Ok(())
}

/// Apply read-optimized settings
pub fn optimize_for_reads(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(READ_PRAGMAS)?;
    conn.execute("ANALYZE", [])?;
    Ok(())
}

/// Store walk metadata
pub fn set_walk_info(conn: &Connection, key: &str, value: &str) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO walk_info (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

/// Get walk metadata
pub fn get_walk_info(conn: &Connection, key: &str) -> DbResult<Option<String>> {
    let result = conn.query_row(
        "SELECT value FROM walk_info WHERE key = ?1",
        [key],
        |row| row.get(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Metadata keys written to `walk_info`
pub mod keys {
    /// Absolute path of the scan root
    pub const ROOT_PATH: &str = "root_path";

    /// Timestamp when the scan started (RFC 3339)
    pub const START_TIME: &str = "start_time";

    /// Timestamp when the scan finished (RFC 3339)
    pub const END_TIME: &str = "end_time";

    /// Total duration in seconds
    pub const DURATION_SECS: &str = "duration_secs";

    /// Limiter capacity used
    pub const CONCURRENCY: &str = "concurrency";

    /// Sink batch capacity used
    pub const BATCH_SIZE: &str = "batch_size";

    /// Byte threshold above which files were persisted
    pub const LARGE_FILE_THRESHOLD: &str = "large_file_threshold";

    /// Directories visited
    pub const TOTAL_DIRS: &str = "total_dirs";

    /// Files visited
    pub const TOTAL_FILES: &str = "total_files";

    /// Sum of file sizes
    pub const TOTAL_BYTES: &str = "total_bytes";

    /// Entries skipped as unsupported
    pub const SKIPPED: &str = "skipped";

    /// Rows written to file_nodes
    pub const ROWS_WRITTEN: &str = "rows_written";

    /// Schema version
    pub const SCHEMA_VERSION: &str = "schema_version";

    /// Tool version
    pub const TOOL_VERSION: &str = "tool_version";

    /// Scan status: "running", "completed", "failed"
    pub const STATUS: &str = "status";
}
