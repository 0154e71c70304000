//! Capture session: toggle state machine between passthrough and dump capture
//!
//! A [`Session`] owns everything the device-read side mutates: the marker
//! scanner, the logging state (and with it the open dump log), and the
//! terminal writer. It is created once per run and handed to the transport
//! loop by mutable reference; the input relay never sees it.

use std::io::Write;
use std::path::PathBuf;

use espterm_core::escape::write_escaped;
use espterm_core::prelude::*;
use espterm_core::scanner::{PatternScanner, ScanResult};

use crate::sink::{DumpLog, DumpLogSink, DEFAULT_DUMP_FILE};

/// Banner printed when a capture starts
pub const START_BANNER: &str = "Pattern detected. Starting to log...";
/// Banner printed when a capture stops
pub const STOP_BANNER: &str = "Pattern detected again. Stopping log.";

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Dump capture options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Scan for the marker and capture dumps at all
    pub enabled: bool,
    /// Dump log path; earlier captures are preserved next to it
    pub dump_file: PathBuf,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            dump_file: PathBuf::from(DEFAULT_DUMP_FILE),
        }
    }
}

/// Logging state. The dump log handle only exists while capturing.
#[derive(Debug)]
pub enum LoggingState {
    Idle,
    Capturing(DumpLog),
}

impl LoggingState {
    pub fn is_capturing(&self) -> bool {
        matches!(self, LoggingState::Capturing(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

pub struct Session<W: Write> {
    scanner: PatternScanner,
    sink: DumpLogSink,
    state: LoggingState,
    capture_enabled: bool,
    terminal: W,
    matches_seen: u64,
    captures_started: u64,
}

impl<W: Write> Session<W> {
    pub fn new(options: CaptureOptions, terminal: W) -> Self {
        Self {
            scanner: PatternScanner::new(),
            sink: DumpLogSink::new(options.dump_file),
            state: LoggingState::Idle,
            capture_enabled: options.enabled,
            terminal,
            matches_seen: 0,
            captures_started: 0,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.state.is_capturing()
    }

    /// Number of completed markers seen while capture was enabled
    pub fn matches_seen(&self) -> u64 {
        self.matches_seen
    }

    /// Number of captures that successfully opened a dump log
    pub fn captures_started(&self) -> u64 {
        self.captures_started
    }

    pub fn marker_len(&self) -> usize {
        self.scanner.pattern().len()
    }

    pub fn terminal(&self) -> &W {
        &self.terminal
    }

    /// Run the scanner over `chunk`. With capture disabled nothing is
    /// scanned and the chunk is always a [`ScanResult::NoMatch`].
    pub fn scan(&mut self, chunk: &[u8]) -> ScanResult {
        if !self.capture_enabled {
            return ScanResult::NoMatch;
        }
        self.scanner.feed(chunk)
    }

    /// Steady-state path: log the bytes when capturing, echo them unmodified.
    pub fn forward(&mut self, bytes: &[u8]) -> Result<()> {
        self.log_bytes(bytes)?;
        self.terminal
            .write_all(bytes)
            .map_err(|e| Error::transport(format!("Error writing to terminal: {}", e)))
    }

    /// Post-marker path: log the bytes when capturing, echo them with
    /// non-printable bytes rendered as `[XX]`.
    pub fn forward_remainder(&mut self, bytes: &[u8]) -> Result<()> {
        self.log_bytes(bytes)?;
        write_escaped(&mut self.terminal, bytes)
            .map_err(|e| Error::transport(format!("Error writing to terminal: {}", e)))
    }

    pub fn flush_terminal(&mut self) -> Result<()> {
        self.terminal
            .flush()
            .map_err(|e| Error::transport(format!("Error flushing terminal: {}", e)))
    }

    /// Handle one completed marker: start a capture when idle, stop it when
    /// capturing.
    ///
    /// Dump log failures abort the capture and leave the session idle; only
    /// terminal write failures are returned.
    pub fn toggle(&mut self) -> Result<()> {
        self.matches_seen += 1;
        match std::mem::replace(&mut self.state, LoggingState::Idle) {
            LoggingState::Idle => self.start_capture(),
            LoggingState::Capturing(log) => self.stop_capture(log),
        }
    }

    /// Close an open capture at the end of the session
    pub fn finish(&mut self) -> Result<()> {
        if let LoggingState::Capturing(log) = std::mem::replace(&mut self.state, LoggingState::Idle)
        {
            info!(
                "Session ending with capture open, closing {} ({} bytes)",
                log.path().display(),
                log.bytes_written()
            );
            let closed = log.close();
            let flushed = self.flush_terminal();
            return closed.and(flushed);
        }
        self.flush_terminal()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    fn start_capture(&mut self) -> Result<()> {
        self.announce(START_BANNER)?;

        let rotated = match self.sink.rotate_if_exists() {
            Ok(rotated) => rotated,
            Err(e) => return self.abort_capture(e),
        };
        if let Some(path) = rotated {
            self.announce(&format!("Existing log file copied to {}", path.display()))?;
        }

        match self.sink.open_for_write() {
            Ok(log) => {
                info!("Dump capture started: {}", log.path().display());
                self.announce(&format!("Logging to file: {}", log.path().display()))?;
                self.captures_started += 1;
                self.state = LoggingState::Capturing(log);
                Ok(())
            }
            Err(e) => self.abort_capture(e),
        }
    }

    fn stop_capture(&mut self, log: DumpLog) -> Result<()> {
        self.announce(STOP_BANNER)?;
        info!(
            "Dump capture stopped: {} ({} bytes)",
            log.path().display(),
            log.bytes_written()
        );
        match log.close() {
            Ok(()) => Ok(()),
            Err(e) => self.abort_capture(e),
        }
    }

    /// Drop any open capture and report `err` on the terminal
    fn abort_capture(&mut self, err: Error) -> Result<()> {
        error!("Dump capture aborted: {}", err);
        self.state = LoggingState::Idle;
        self.announce(&format!("Dump capture aborted: {}", err))
    }

    fn log_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let failure = match &mut self.state {
            LoggingState::Capturing(log) => log.append(bytes).err(),
            LoggingState::Idle => None,
        };
        match failure {
            Some(e) if e.is_recoverable() => self.abort_capture(e),
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn announce(&mut self, line: &str) -> Result<()> {
        writeln!(self.terminal, "{}", line)
            .map_err(|e| Error::transport(format!("Error writing to terminal: {}", e)))
    }
}
