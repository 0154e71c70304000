//! espterm Library
//!
//! Serial terminal bridge that captures ESP exception dumps. All logic lives
//! in the workspace crates; this crate re-exports them for the binary and the
//! integration tests.

pub use espterm_app as app;
pub use espterm_core as common;
pub use espterm_device as device;

// Re-export main entry points
pub use espterm_app::{run_monitor, MonitorConfig};
