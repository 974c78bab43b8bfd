use std::{fs::create_dir_all, io, path::PathBuf};

use thiserror::Error;
use tracing::{Level, subscriber::set_global_default};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{layer::SubscriberExt, registry};

/// How the global logger should be set up for one invocation.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// The most verbose level that is emitted.
    pub level: Level,

    /// Directory for daily rolling log files, `None` disables file logging.
    pub directory: Option<PathBuf>,

    /// Emit ANSI colors on stderr.
    pub ansi: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            directory: None,
            ansi: true,
        }
    }
}

/// Create and set the global loggers.
///
/// Logs go to stderr so that stdout only carries command output. The
/// returned guards must be held until the program exits.
pub fn init_logger(config: &LoggerConfig) -> Result<Vec<WorkerGuard>, LoggerError> {
    let filter = tracing_subscriber::filter::Targets::new().with_default(config.level);

    let mut guards = Vec::with_capacity(2);

    // File layer
    let file_layer = match &config.directory {
        Some(directory) => {
            create_dir_all(directory).map_err(LoggerError::CreateDirectory)?;

            let appender = RollingFileAppender::builder()
                .filename_prefix("pg-backup-auditor")
                .filename_suffix("log")
                .rotation(Rotation::DAILY)
                .max_log_files(30)
                .build(directory)?;

            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);

            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);

            Some(layer)
        }
        None => None,
    };

    // Std layer
    let std_layer = {
        let (writer, guard) = tracing_appender::non_blocking(io::stderr());
        guards.push(guard);

        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(config.ansi)
            .with_target(false)
    };

    // Create registry
    let registry = registry().with(file_layer).with(std_layer).with(filter);

    // Set global subscriber
    set_global_default(registry)?;

    Ok(guards)
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Failed to create rolling appender:\n{0}")]
    CreateRollingAppender(#[from] tracing_appender::rolling::InitError),

    #[error("Failed to create log directory:\n{0}")]
    CreateDirectory(#[source] io::Error),

    #[error("Failed to set the global logger:\n{0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}
