//! fsstat - Concurrent Filesystem Statistics Scanner
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use fsstat::config::{CliArgs, ScanConfig};
use fsstat::db::{keys, SqliteStore, WalkStatus};
use fsstat::progress::{print_header, print_record, print_summary, ProgressReporter};
use fsstat::walker::{ScanReport, Scanner};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let config = ScanConfig::from_args(args).context("Invalid configuration")?;

    if config.force {
        config
            .clear_existing_db()
            .with_context(|| format!("Failed to remove {}", config.db_path.display()))?;
    }

    if config.show_progress {
        print_header(
            &config.root.display().to_string(),
            config.options.concurrency,
            &config.db_path.display().to_string(),
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.threads)
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    runtime.block_on(run_scan(config))
}

async fn run_scan(config: ScanConfig) -> Result<()> {
    let started_at: DateTime<Utc> = Utc::now();

    let store = SqliteStore::create(&config.db_path).context("Failed to create database")?;
    store.set_info(keys::ROOT_PATH, &config.root.display().to_string())?;
    store.set_info(keys::START_TIME, &started_at.to_rfc3339())?;
    store.set_info(keys::CONCURRENCY, &config.options.concurrency.to_string())?;
    store.set_info(keys::BATCH_SIZE, &config.options.batch_size.to_string())?;
    store.set_info(
        keys::LARGE_FILE_THRESHOLD,
        &config.options.large_file_threshold.to_string(),
    )?;

    let scanner = Scanner::new(config.root.clone(), config.options.clone());

    let progress = config.show_progress.then(ProgressReporter::new);
    let ticker = progress.clone().map(|bar| {
        let counters = scanner.counters();
        let start = Instant::now();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(250));
            loop {
                interval.tick().await;
                bar.update(&counters, start.elapsed());
            }
        })
    });

    let result = scanner.run(store).await;
    if let Some(ticker) = ticker {
        ticker.abort();
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let Some(bar) = &progress {
                bar.finish("Scan failed");
            }
            mark_failed(&config);
            return Err(e).context("Scan failed");
        }
    };

    if let Some(bar) = &progress {
        bar.finish("Scan completed");
    }

    finalize(&report).context("Failed to finalize database")?;

    let db_size = std::fs::metadata(&config.db_path).ok().map(|m| m.len());
    if config.show_progress {
        print_summary(&report.stats, &config.db_path.display().to_string(), db_size);
    }
    print_record(&report.root);

    Ok(())
}

fn finalize(report: &ScanReport<SqliteStore>) -> Result<()> {
    let store = &report.store;
    let stats = &report.stats;

    store.set_info(keys::END_TIME, &Utc::now().to_rfc3339())?;
    store.set_info(keys::DURATION_SECS, &format!("{:.3}", stats.duration.as_secs_f64()))?;
    store.set_info(keys::TOTAL_DIRS, &stats.dirs.to_string())?;
    store.set_info(keys::TOTAL_FILES, &stats.files.to_string())?;
    store.set_info(keys::TOTAL_BYTES, &stats.bytes.to_string())?;
    store.set_info(keys::SKIPPED, &stats.skipped.to_string())?;
    store.set_info(keys::ROWS_WRITTEN, &stats.records_written.to_string())?;

    info!("Finalizing database...");
    store.finalize()?;
    Ok(())
}

/// Best-effort: record the failure in the database the scan was writing
fn mark_failed(config: &ScanConfig) {
    let marked = SqliteStore::open(&config.db_path).and_then(|store| store.set_status(WalkStatus::Failed));
    if let Err(e) = marked {
        warn!(error = %e, "Could not mark database as failed");
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("fsstat=debug,warn")
    } else {
        EnvFilter::new("fsstat=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
