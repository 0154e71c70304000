//! Diagnostic logging
//!
//! stdin and stdout belong to the serial bridge, so diagnostics only ever go
//! to a daily log file. Set `ESPTERM_LOG` (an `EnvFilter` directive such as
//! `debug` or `espterm_app=trace`) to change verbosity.

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable controlling the log filter
pub const LOG_ENV_VAR: &str = "ESPTERM_LOG";

const DEFAULT_FILTER: &str = "espterm=info,warn";
const LOG_FILE_PREFIX: &str = "espterm.log";

/// Install the global subscriber writing to [`log_directory`]
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(RollingFileAppender::new(
                    Rotation::DAILY,
                    &log_dir,
                    LOG_FILE_PREFIX,
                ))
                .with_ansi(false)
                .with_thread_names(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!(
        "espterm {} logging to {}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );
    Ok(())
}

/// `<local data dir>/espterm/logs`, or `./espterm/logs` when the platform has
/// no local data directory
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("espterm")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_is_namespaced() {
        assert!(log_directory().ends_with("espterm/logs"));
    }
}
