use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt::{self, format::FmtSpan}};

use crate::hsi_pipeline::common::{CallError, HsiError};

/// Log file created inside the configured log directory.
pub const LOG_FILE_NAME: &str = "snapscan_capture.log";

/// Call name reported when logging cannot be set up.
pub const INITIALIZE_LOGGER_CALL: &str = "InitializeLogger";

/// Installs the global subscriber: console output filtered by `RUST_LOG`
/// (default `info`) and a plain-text log file receiving `min_level` and above.
///
/// A log directory that cannot be created is a `FileSystemError`, a log file
/// that cannot be opened is a `FileIoError`.
pub fn init(log_dir: &Path, min_level: Level) -> Result<(), CallError> {
    let log_file = open_log_file(log_dir).map_err(|source| CallError {
        call: INITIALIZE_LOGGER_CALL,
        source,
    })?;

    install(log_file, min_level).map_err(|e| {
        eprintln!("{e:#}");
        CallError {
            call: INITIALIZE_LOGGER_CALL,
            source: HsiError::InternalError,
        }
    })
}

fn open_log_file(log_dir: &Path) -> Result<File, HsiError> {
    std::fs::create_dir_all(log_dir).map_err(|_| HsiError::FileSystemError)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE_NAME))
        .map_err(|_| HsiError::FileIoError)
}

fn install(log_file: File, min_level: Level) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let is_debug = env_filter.to_string().contains("debug") ||
                   std::env::var("RUST_LOG").unwrap_or_default().contains("debug");

    let console_layer = fmt::layer()
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_span_events(if is_debug {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .with_filter(env_filter);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .with_filter(LevelFilter::from_level(min_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("installing the tracing subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hsi_pipeline::common::{AcquisitionError, Stage};

    #[test]
    fn test_creates_log_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        init(&log_dir, Level::WARN).unwrap();
        tracing::warn!("logger test warning");

        let contents = std::fs::read_to_string(log_dir.join(LOG_FILE_NAME)).unwrap();
        assert!(contents.contains("logger test warning"));
    }

    #[test]
    fn test_log_directory_blocked_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("logs");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let error = init(&blocker, Level::WARN).unwrap_err();

        assert_eq!(error.call, "InitializeLogger");
        assert_eq!(error.source, HsiError::FileSystemError);
        let failure = AcquisitionError {
            stage: Stage::Init,
            error,
        };
        assert_eq!(
            failure.to_string(),
            format!(
                "Init failed: Error calling InitializeLogger: {}",
                HsiError::FileSystemError
            )
        );
    }

    #[test]
    fn test_log_file_path_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(LOG_FILE_NAME)).unwrap();

        let error = init(dir.path(), Level::WARN).unwrap_err();

        assert_eq!(error.call, "InitializeLogger");
        assert_eq!(error.source, HsiError::FileIoError);
    }
}
