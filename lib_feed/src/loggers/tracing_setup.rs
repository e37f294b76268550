//! # Tracing Setup
//!
//! One call wires the process-wide subscriber: an `EnvFilter` (where `RUST_LOG`
//! wins over the configured level), a console layer, and a daily-rolling file
//! layer behind a non-blocking writer. Old log files are pruned first so a
//! long-lived host does not accumulate them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Failed to prepare log directory {path}: {source}")]
    Directory { path: PathBuf, source: io::Error },
    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Installs the global subscriber and returns the appender guard.
///
/// The guard flushes buffered file output when dropped, so the binary must keep
/// it alive for the whole process lifetime.
///
/// # Arguments
/// * `app_name` - Prefix of the rolling log files (`<app_name>.YYYY-MM-DD`).
/// * `log_dir` - Directory for log files, created if missing.
/// * `log_level` - Fallback filter directive when `RUST_LOG` is unset.
/// * `json` - Write the file layer as JSON lines instead of plain text.
pub fn setup_logging(
    app_name: &str,
    log_dir: &Path,
    log_level: &str,
    json: bool,
) -> Result<WorkerGuard, LoggerError> {
    fs::create_dir_all(log_dir).map_err(|source| LoggerError::Directory {
        path: log_dir.to_path_buf(),
        source,
    })?;

    // Keep the newest file only; today's appender reopens it if it is current.
    if let Err(e) = cleanup_old_logs(log_dir, app_name, 1) {
        eprintln!("Failed to prune old log files in {}: {}", log_dir.display(), e);
    }

    let appender = tracing_appender::rolling::daily(log_dir, app_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let file_plain = (!json).then(|| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(file_writer.clone())
    });
    let file_json = json.then(|| fmt::layer().json().with_writer(file_writer));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_plain)
        .with(file_json)
        .try_init()
        .map_err(|e| LoggerError::Init(e.to_string()))?;

    Ok(guard)
}

/// Deletes all but the newest `keep` log files starting with `prefix`.
///
/// Rolling file names end in a date, so lexical order is chronological order.
/// Returns the number of files removed.
pub fn cleanup_old_logs(log_dir: &Path, prefix: &str, keep: usize) -> io::Result<usize> {
    let mut files: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect();

    // Newest first
    files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut removed = 0;
    for old in files.iter().skip(keep) {
        match fs::remove_file(old) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Failed to delete old log file {}: {}", old.display(), e),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_newest_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        for day in ["2026-01-01", "2026-01-02", "2026-01-03"] {
            fs::write(dir.path().join(format!("feed_worker.{day}")), b"x").unwrap();
        }
        fs::write(dir.path().join("unrelated.log"), b"x").unwrap();

        let removed = cleanup_old_logs(dir.path(), "feed_worker", 1).unwrap();
        assert_eq!(removed, 2);
        assert!(dir.path().join("feed_worker.2026-01-03").exists());
        assert!(!dir.path().join("feed_worker.2026-01-01").exists());
        assert!(dir.path().join("unrelated.log").exists());
    }
}
