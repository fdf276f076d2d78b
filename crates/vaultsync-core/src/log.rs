//! Logging system for vaultsync.
//!
//! `RUST_LOG` takes precedence over the configured level. Output goes to
//! stderr unless a log file is configured, in which case a non-blocking
//! writer is used and its guard must be kept alive by the caller.

use vaultsync_types::{LogConfig, LogFormat, Result, SyncError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Initialize the logging system with default configuration.
pub fn init_default() -> Result<Option<WorkerGuard>> {
    init(&LogConfig::default())
}

/// Initialize logging from configuration.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vaultsync={0},vaultsync_engine={0},vaultsync_services={0},vaultsync_core={0}", config.level)));

    let (writer, guard, ansi) = match &config.file {
        Some(path) => {
            let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| SyncError::Config(format!("Invalid log file path: {}", path.display())))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), None, true),
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_ansi(ansi).with_target(false).with_writer(writer).boxed(),
        LogFormat::Pretty => fmt::layer().with_ansi(ansi).with_target(false).with_writer(writer).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| SyncError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}
