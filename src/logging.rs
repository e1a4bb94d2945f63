use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create rolling file appender in {dir}: {source}")]
    Appender {
        dir: String,
        #[source]
        source: tracing_appender::rolling::InitError,
    },
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global subscriber. A subscriber that is already installed
/// (tests, repeated calls) is left in place.
///
/// The returned guard flushes the JSON file writer and must be held for the
/// life of the process.
pub fn init_tracing(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let stdout_layer = fmt::layer().with_target(true).with_thread_ids(false);
    let registry = Registry::default().with(env_filter).with(stdout_layer);

    if config.enable_file_logs {
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("word-refresher")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&config.log_dir)
            .map_err(|source| LoggingError::Appender {
                dir: config.log_dir.clone(),
                source,
            })?;
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        let file_layer = fmt::layer().with_writer(writer).with_ansi(false).json();
        tolerate_existing(registry.with(file_layer).try_init())?;
        Ok(Some(guard))
    } else {
        tolerate_existing(registry.try_init())?;
        Ok(None)
    }
}

fn tolerate_existing(
    result: Result<(), tracing_subscriber::util::TryInitError>,
) -> Result<(), LoggingError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("already been set") => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let cfg = LogConfig::default();
        assert!(init_tracing(&cfg).is_ok());
        assert!(init_tracing(&cfg).is_ok());
    }
}
