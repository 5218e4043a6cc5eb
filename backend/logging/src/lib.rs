//! Structured logging for Dustline.
//!
//! Wraps `tracing` to provide console output plus an optional rolling NDJSON
//! file log, with environment-based level control.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global logger.
///
/// `level` is the fallback filter when `RUST_LOG` is unset. When `log_dir`
/// is given, NDJSON lines are additionally written to
/// `<log_dir>/dustline.log.YYYY-MM-DD` with daily rotation.
pub fn init_logger<P: AsRef<Path>>(level: &str, log_dir: Option<P>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    match log_dir {
        Some(dir) => {
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "dustline.log");
            let file_layer = fmt::layer()
                .json()
                .with_writer(file_appender)
                .with_ansi(false);
            let _ = registry.with(file_layer).try_init();
        }
        None => {
            let _ = registry.try_init();
        }
    }
}
