//! Integration tests for fsstat
//!
//! Each test builds a small tree under a temp dir, scans it into a real
//! SQLite file and checks the rows and the returned root record.

use fsstat::config::ScanOptions;
use fsstat::db::{keys, schema, SqliteStore};
use fsstat::model::{SizeBucket, MIB};
use fsstat::walker::Scanner;
use fsstat::ScanError;
use rusqlite::Connection;
use std::path::Path;
use tempfile::tempdir;

fn write_file(path: &Path, len: usize) {
    std::fs::write(path, vec![7u8; len]).unwrap();
}

fn row_paths(conn: &Connection) -> Vec<String> {
    conn.prepare("SELECT path FROM file_nodes ORDER BY id")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reference_tree_to_sqlite() {
    let tree = tempdir().unwrap();
    write_file(&tree.path().join("a.txt"), 100);
    std::fs::create_dir(tree.path().join("sub")).unwrap();
    write_file(&tree.path().join("sub").join("b.bin"), 1024 * 1024);

    let out = tempdir().unwrap();
    let db_path = out.path().join("scan.db");
    let store = SqliteStore::create(&db_path).unwrap();

    let report = Scanner::new(tree.path(), ScanOptions::default())
        .run(store)
        .await
        .unwrap();
    report.store.finalize().unwrap();

    let root = &report.root;
    assert_eq!(root.count, 2);
    assert_eq!(root.bucket(SizeBucket::S).count, 1);
    assert_eq!(root.bucket(SizeBucket::S).size, 100);
    assert_eq!(root.bucket(SizeBucket::M).count, 1);
    assert_eq!(root.bucket(SizeBucket::M).size, 1_048_576);
    drop(report);

    let conn = Connection::open(&db_path).unwrap();
    let mut paths = row_paths(&conn);
    paths.sort();
    assert_eq!(paths, vec!["/".to_string(), "/sub".to_string()]);

    let (parent_id, s_count, m_count, m_size): (i64, i64, i64, i64) = conn
        .query_row(
            "SELECT parent_id, s_file_count, m_file_count, m_file_size FROM file_nodes WHERE path = '/'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap();
    assert_eq!(parent_id, 0);
    assert_eq!(s_count, 1);
    assert_eq!(m_count, 1);
    assert_eq!(m_size, 1_048_576);

    let status = schema::get_walk_info(&conn, keys::STATUS).unwrap();
    assert_eq!(status.as_deref(), Some("completed"));
}

#[tokio::test]
async fn test_empty_directory_single_row() {
    let tree = tempdir().unwrap();
    let report = Scanner::new(tree.path(), ScanOptions::default())
        .run(SqliteStore::in_memory().unwrap())
        .await
        .unwrap();

    assert_eq!(report.root.count, 0);
    assert_eq!(report.root.bucket_count_total(), 0);
    assert_eq!(report.store.row_count().unwrap(), 1);
}

#[tokio::test]
async fn test_boundary_sizes() {
    let tree = tempdir().unwrap();
    write_file(&tree.path().join("exact_s"), 512 * 1024);
    write_file(&tree.path().join("just_m"), 512 * 1024 + 1);
    let xl_edge = std::fs::File::create(tree.path().join("xl_edge")).unwrap();
    xl_edge.set_len(200 * MIB).unwrap();
    let xxl = std::fs::File::create(tree.path().join("xxl")).unwrap();
    xxl.set_len(200 * MIB + 1).unwrap();

    let report = Scanner::new(tree.path(), ScanOptions::default())
        .run(SqliteStore::in_memory().unwrap())
        .await
        .unwrap();

    let root = &report.root;
    assert_eq!(root.count, 4);
    assert_eq!(root.bucket_count_total(), 4);
    assert_eq!(root.bucket(SizeBucket::S).count, 1);
    assert_eq!(root.bucket(SizeBucket::M).count, 1);
    assert_eq!(root.bucket(SizeBucket::Xl).count, 1);
    assert_eq!(root.bucket(SizeBucket::Xxl).count, 1);

    // Root directory plus the one file above the threshold
    let paths = row_paths(report.store.connection());
    assert_eq!(paths.len(), 2);
    assert!(paths.contains(&"/xxl".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_wide_and_deep_tree_with_small_limiter() {
    let tree = tempdir().unwrap();

    // Wide: more children than slots
    let wide = tree.path().join("wide");
    std::fs::create_dir(&wide).unwrap();
    for i in 0..25 {
        write_file(&wide.join(format!("w{}", i)), 1);
    }

    // Deep: more levels than slots
    let mut deep = tree.path().join("deep");
    std::fs::create_dir(&deep).unwrap();
    for level in 0..8 {
        deep.push(format!("l{}", level));
        std::fs::create_dir(&deep).unwrap();
    }
    write_file(&deep.join("bottom"), 10);

    let options = ScanOptions {
        concurrency: 2,
        batch_size: 3,
        ..ScanOptions::default()
    };
    let report = Scanner::new(tree.path(), options)
        .run(SqliteStore::in_memory().unwrap())
        .await
        .unwrap();

    assert_eq!(report.root.count, 26);
    assert_eq!(report.root.file_bytes(), 35);
    assert!(report.stats.peak_slots <= 2);
    // root, wide, deep, l0..l7
    assert_eq!(report.store.row_count().unwrap(), 11);
    assert_eq!(report.stats.records_written, 11);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinks_excluded_from_totals() {
    let tree = tempdir().unwrap();
    write_file(&tree.path().join("real"), 50);
    std::os::unix::fs::symlink(tree.path().join("real"), tree.path().join("alias")).unwrap();
    std::os::unix::fs::symlink(tree.path(), tree.path().join("loop")).unwrap();

    let report = Scanner::new(tree.path(), ScanOptions::default())
        .run(SqliteStore::in_memory().unwrap())
        .await
        .unwrap();

    assert_eq!(report.root.count, 1);
    assert_eq!(report.root.file_bytes(), 50);
    assert_eq!(report.stats.skipped, 2);
    assert_eq!(report.store.row_count().unwrap(), 1);
}

#[tokio::test]
async fn test_missing_root_aborts() {
    let tree = tempdir().unwrap();
    let result = Scanner::new(tree.path().join("absent"), ScanOptions::default())
        .run(SqliteStore::in_memory().unwrap())
        .await;

    assert!(matches!(result, Err(ScanError::Fs(_))));
}
