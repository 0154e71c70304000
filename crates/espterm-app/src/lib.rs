//! espterm-app - Capture session and duplex transport for espterm
//!
//! This crate owns the streaming logic of the bridge: the capture session
//! and its toggle state machine, the dump log sink with rotation, the duplex
//! transport loop, configuration loading and the session runner.

pub mod config;
pub mod runner;
pub mod session;
pub mod signals;
pub mod sink;
pub mod transport;

// Re-export primary types
pub use config::{load_settings, Overrides, Settings};
pub use runner::{run_monitor, MonitorConfig, COMPLETION_NOTICE};
pub use session::{CaptureOptions, LoggingState, Session};
pub use sink::{DumpLog, DumpLogSink, DEFAULT_DUMP_FILE};
pub use transport::{dispatch_chunk, Endpoints, InboundExit, OutboundExit, RunSummary};
