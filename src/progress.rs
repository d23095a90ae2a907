//! Progress reporting and the final report
//!
//! Spinner while the scan runs (indicatif), then a styled summary and the
//! root record's bucket histogram.

use crate::model::{FsNodeRecord, SizeBucket};
use crate::walker::{ScanCounters, ScanStats};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter that displays scan status
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(spinner) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the display from live counters
    pub fn update(&self, counters: &ScanCounters, elapsed: Duration) {
        let files = counters.files();
        let dirs = counters.dirs();
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { (files + dirs) as f64 / secs } else { 0.0 };

        self.bar.set_message(format!(
            "Dirs: {} | Files: {} | Size: {} | Skipped: {} | Rate: {:.0}/s",
            format_number(dirs),
            format_number(files),
            format_size(counters.bytes(), BINARY),
            format_number(counters.skipped()),
            rate,
        ));
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the scan
pub fn print_header(root: &str, concurrency: usize, output: &str) {
    println!();
    println!("{} {}", style("fsstat").cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Root:").bold(), root);
    println!("  {} {}", style("Concurrency:").bold(), concurrency);
    println!("  {} {}", style("Output:").bold(), output);
    println!();
}

/// Print run totals
pub fn print_summary(stats: &ScanStats, db_path: &str, db_size: Option<u64>) {
    let secs = stats.duration.as_secs_f64();
    let rate = if secs > 0.0 {
        (stats.files + stats.dirs) as f64 / secs
    } else {
        0.0
    };

    println!();
    println!("{}", style("Scan Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Directories:").bold(), format_number(stats.dirs));
    println!("  {} {}", style("Files:").bold(), format_number(stats.files));
    println!("  {} {}", style("File Bytes:").bold(), format_size(stats.bytes, BINARY));
    if stats.skipped > 0 {
        println!("  {} {}", style("Skipped:").yellow().bold(), format_number(stats.skipped));
    }
    println!(
        "  {} {} in {} batches",
        style("Rows Written:").bold(),
        format_number(stats.records_written),
        format_number(stats.batches_committed)
    );
    println!("  {} {:.1}s ({:.0} entries/sec)", style("Duration:").bold(), secs, rate);
    match db_size {
        Some(size) => println!("  {} {} ({})", style("Database:").bold(), db_path, format_size(size, BINARY)),
        None => println!("  {} {}", style("Database:").bold(), db_path),
    }
    println!();
}

/// Render the root record as report lines
pub fn format_record(record: &FsNodeRecord) -> Vec<String> {
    let mut lines = vec![
        format!("Id: {}", record.id),
        format!("ParentId: {}", record.parent_id),
        format!("Path: {}", record.path),
        format!("IsDir: {}", record.is_dir),
        format!("Count: {}", format_number(record.count as u64)),
        format!("Size: {}", format_size(record.size, BINARY)),
    ];

    for bucket in SizeBucket::ALL {
        let tally = record.bucket(bucket);
        lines.push(format!(
            "{:<4}({:<16}) {:>12} files  {:>12}",
            bucket.label(),
            bucket.range(),
            format_number(tally.count as u64),
            format_size(tally.size, BINARY),
        ));
    }

    lines
}

/// Print the root record
pub fn print_record(record: &FsNodeRecord) {
    println!("{}", style("Root Record").cyan().bold());
    println!("{}", style("─".repeat(50)).dim());
    for line in format_record(record) {
        println!("  {}", line);
    }
    println!();
}
