use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::EngineConfig;

const LOG_FILE_PREFIX: &str = "adaptive-engine.log";

/// Flushes the file writer on drop.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Installs the global subscriber: stdout always, plus a daily rolling file
/// when `config.log_dir` is set. A second call is a no-op.
pub fn init_tracing(config: &EngineConfig) -> Option<FileLogGuard> {
    let env_filter = build_filter(&config.log_level);
    let stdout_layer = fmt::layer().with_target(true);

    let Some(log_dir) = config.log_dir.as_deref() else {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .try_init();
        return None;
    };

    match file_writer(log_dir) {
        Ok((writer, guard)) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .try_init();
            Some(FileLogGuard { _guard: guard })
        }
        Err(err) => {
            eprintln!("failed to create log directory {}: {err}", log_dir.display());
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .try_init();
            None
        }
    }
}

pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_writer(
    log_dir: &Path,
) -> std::io::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(log_dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_level() {
        assert_eq!(build_filter("debug").to_string(), "debug");
    }

    #[test]
    fn test_file_writer_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("engine");
        let (_writer, _guard) = file_writer(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
