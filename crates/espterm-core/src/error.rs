//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Unsupported baudrate: {baud}")]
    UnsupportedBaudRate { baud: u32 },

    // ─────────────────────────────────────────────────────────────
    // Device/Terminal Setup Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to open serial port {port}: {reason}")]
    DeviceOpen { port: String, reason: String },

    #[error("Failed to change terminal mode: {0}")]
    TerminalMode(String),

    #[error("Terminal error: {message}")]
    Terminal { message: String },

    // ─────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Dump log error on {}: {source}", path.display())]
    DumpLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn device_open(port: impl Into<String>, reason: impl ToString) -> Self {
        Self::DeviceOpen {
            port: port.into(),
            reason: reason.to_string(),
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Terminal {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Wrap an I/O failure on the dump log (or one of its rotated copies).
    pub fn dump_log(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DumpLog {
            path: path.into(),
            source,
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors abort a single operation (a capture attempt) while
    /// the bridge itself keeps running.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DumpLog { .. })
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedBaudRate { .. }
                | Error::DeviceOpen { .. }
                | Error::TerminalMode(_)
                | Error::Transport { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display_messages() {
        let err = Error::UnsupportedBaudRate { baud: 1234 };
        assert_eq!(err.to_string(), "Unsupported baudrate: 1234");

        let err = Error::transport("device vanished");
        assert_eq!(err.to_string(), "Transport error: device vanished");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_dump_log_error_mentions_path() {
        let err = Error::dump_log(
            "/tmp/dump.log",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("/tmp/dump.log"));
        assert!(text.contains("denied"));
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::UnsupportedBaudRate { baud: 42 }.is_fatal());
        assert!(Error::device_open("/dev/ttyUSB0", "busy").is_fatal());
        assert!(Error::transport("read failed").is_fatal());
        assert!(!Error::dump_log("dump.log", io::Error::other("disk full")).is_fatal());
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::dump_log("dump.log", io::Error::other("disk full")).is_recoverable());
        assert!(!Error::transport("read failed").is_recoverable());
        assert!(!Error::UnsupportedBaudRate { baud: 1 }.is_recoverable());
    }

    #[test]
    fn test_result_ext_keeps_error() {
        let res: std::result::Result<(), io::Error> = Err(io::Error::other("boom"));
        let err = res.context("while testing").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
