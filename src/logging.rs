//! Tracing setup for the host binary.

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Error, Debug)]
#[error("Failed to initialize logging: {0}")]
pub struct LoggingError(String);

/// Verbosity maps 0=error, 1=warn, 2=info, 3=debug, 4+=trace. `RUST_LOG`
/// takes precedence when set.
pub fn init_logging(verbosity: u8, format: LogFormat) -> Result<(), LoggingError> {
    let level = match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("paneport={level},tower_http={level}")));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(verbosity >= 3)
                    .with_line_number(verbosity >= 3),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| LoggingError(e.to_string()))
}

/// For tests; a second install is silently ignored.
pub fn init_test_logging() {
    let _ = init_logging(1, LogFormat::Text);
}
