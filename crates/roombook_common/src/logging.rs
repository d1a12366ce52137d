//! Logging utilities for the room booking broker.
//!
//! Every binary and test in the workspace initialises tracing through this
//! module so output looks the same everywhere: timestamps, level, target and
//! file/line, filtered by `RUST_LOG` plus a `roombook=<level>` directive.

use roombook_config::LoggingConfig;
use std::str::FromStr;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber from the logging configuration.
///
/// When `config.directory` is set, a daily rolling file is written there in
/// addition to stdout. The returned guard flushes that file on drop, so the
/// caller must keep it alive for the lifetime of the process.
///
/// # Examples
///
/// ```
/// use roombook_common::logging;
/// use roombook_config::LoggingConfig;
///
/// let _guard = logging::init(&LoggingConfig::default());
/// ```
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let level = config
        .level
        .as_deref()
        .and_then(|lvl| Level::from_str(lvl).ok())
        .unwrap_or(Level::INFO);

    let (file_layer, guard) = match config.directory.as_deref() {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "roombook.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(file_layer)
        .with(env_filter(level))
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
    guard
}

fn env_filter(level: Level) -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match format!("roombook={}", level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}
